use std::time::Duration;

use super::types::minutes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaPolicy {
    pub enabled: bool,
    pub delay_minutes: u32,
}

impl MediaPolicy {
    pub fn delay(&self) -> Duration {
        minutes(self.delay_minutes)
    }
}
