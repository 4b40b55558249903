use std::time::Duration;

/// Inclusive `[min, max]` bounds for a minutes value entered by chat admins,
/// plus the value used when none (or an unparseable one) is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinutesRange {
    min: u32,
    max: u32,
    default: u32,
}

impl MinutesRange {
    /// Returns `None` when `min > max`. The default is pulled into range.
    pub fn new(min: u32, max: u32, default: u32) -> Option<Self> {
        if min > max {
            return None;
        }
        Some(Self {
            min,
            max,
            default: default.clamp(min, max),
        })
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn default_minutes(&self) -> u32 {
        self.default
    }

    pub fn clamp(&self, minutes: i64) -> u32 {
        let clamped = minutes.clamp(i64::from(self.min), i64::from(self.max));
        u32::try_from(clamped).unwrap_or(self.max)
    }

    pub fn clamp_or_default(&self, minutes: Option<i64>) -> u32 {
        minutes.map_or(self.default, |m| self.clamp(m))
    }
}

pub fn minutes(value: u32) -> Duration {
    Duration::from_secs(u64::from(value) * 60)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberRole {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Banned,
}

impl MemberRole {
    pub fn is_admin(&self) -> bool {
        matches!(self, MemberRole::Creator | MemberRole::Administrator)
    }
}
