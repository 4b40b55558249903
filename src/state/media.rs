use std::collections::HashMap;

use parking_lot::Mutex;
use teloxide::types::ChatId;

use crate::domain::{MediaPolicy, MinutesRange};

/// Per-chat media auto-delete settings. Disabling keeps the record so the
/// delay survives a later re-enable.
pub struct MediaPolicyRegistry {
    limits: MinutesRange,
    policies: Mutex<HashMap<ChatId, MediaPolicy>>,
}

impl MediaPolicyRegistry {
    pub fn new(limits: MinutesRange) -> Self {
        Self {
            limits,
            policies: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_policy(&self, chat_id: ChatId, enabled: bool, delay_minutes: i64) -> MediaPolicy {
        let policy = MediaPolicy {
            enabled,
            delay_minutes: self.limits.clamp(delay_minutes),
        };
        self.policies.lock().insert(chat_id, policy);
        policy
    }

    /// Enables the policy, keeping the remembered delay when `delay_minutes`
    /// is `None`.
    pub fn enable(&self, chat_id: ChatId, delay_minutes: Option<i64>) -> MediaPolicy {
        let minutes = delay_minutes.unwrap_or_else(|| {
            self.get(chat_id)
                .map(|policy| i64::from(policy.delay_minutes))
                .unwrap_or_else(|| i64::from(self.limits.default_minutes()))
        });
        self.set_policy(chat_id, true, minutes)
    }

    pub fn disable(&self, chat_id: ChatId) -> Option<MediaPolicy> {
        let mut policies = self.policies.lock();
        let policy = policies.get_mut(&chat_id)?;
        policy.enabled = false;
        Some(*policy)
    }

    pub fn get(&self, chat_id: ChatId) -> Option<MediaPolicy> {
        self.policies.lock().get(&chat_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> MediaPolicyRegistry {
        MediaPolicyRegistry::new(MinutesRange::new(1, 60, 5).unwrap())
    }

    #[test]
    fn set_policy_clamps_delay() {
        let registry = registry();
        assert_eq!(registry.set_policy(ChatId(-1), true, 0).delay_minutes, 1);
        assert_eq!(registry.set_policy(ChatId(-1), true, 999).delay_minutes, 60);
    }

    #[test]
    fn disable_keeps_delay_for_reenable() {
        let registry = registry();
        registry.set_policy(ChatId(-1), true, 12);

        let disabled = registry.disable(ChatId(-1)).unwrap();
        assert!(!disabled.enabled);
        assert_eq!(disabled.delay_minutes, 12);

        let enabled = registry.enable(ChatId(-1), None);
        assert!(enabled.enabled);
        assert_eq!(enabled.delay_minutes, 12);
    }

    #[test]
    fn disable_without_policy_creates_nothing() {
        let registry = registry();
        assert!(registry.disable(ChatId(-1)).is_none());
        assert!(registry.get(ChatId(-1)).is_none());
    }

    #[test]
    fn enable_without_history_uses_default() {
        let registry = registry();
        assert_eq!(registry.enable(ChatId(-2), None).delay_minutes, 5);
    }
}
