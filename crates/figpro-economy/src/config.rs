//! Typed plugin configuration
//!
//! The host platform hands the plugin a bag of JSON options; this module
//! pins the recognized ones down to a typed struct with defaults, read once
//! at startup instead of looked up per call.

use serde::{Deserialize, Serialize};

/// Configuration for the credit economy and the generation pipeline.
///
/// All fields have defaults matching an out-of-the-box install: per-user
/// limits on, everything else off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Gate requests on the requesting user's balance
    pub enable_user_limit: bool,
    /// Gate requests on the group's shared balance
    pub enable_group_limit: bool,
    /// Allow users to claim a daily check-in reward
    pub enable_checkin: bool,
    /// Credits granted per check-in when the reward is fixed
    pub checkin_fixed_reward: u64,
    /// Draw the check-in reward uniformly instead of using the fixed amount
    pub enable_random_checkin: bool,
    /// Upper bound (inclusive) of the random check-in reward
    pub checkin_random_reward_max: u64,
    /// User IDs that bypass cost checks entirely
    pub admins: Vec<String>,
    /// User IDs whose requests are silently ignored
    pub user_blacklist: Vec<String>,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            enable_user_limit: true,
            enable_group_limit: false,
            enable_checkin: false,
            checkin_fixed_reward: 3,
            enable_random_checkin: false,
            checkin_random_reward_max: 5,
            admins: Vec::new(),
            user_blacklist: Vec::new(),
        }
    }
}

impl EconomyConfig {
    /// Create the default configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from the host platform's JSON configuration value.
    ///
    /// Unrecognized options are ignored; missing options take their
    /// defaults.
    ///
    /// # Errors
    /// Returns the underlying deserialization error when a recognized
    /// option has the wrong shape (e.g. a string where a number belongs).
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// With both balance gates set.
    #[inline]
    #[must_use]
    pub fn with_limits(mut self, user: bool, group: bool) -> Self {
        self.enable_user_limit = user;
        self.enable_group_limit = group;
        self
    }

    /// With check-in enabled and a fixed reward.
    #[inline]
    #[must_use]
    pub fn with_fixed_checkin(mut self, reward: u64) -> Self {
        self.enable_checkin = true;
        self.enable_random_checkin = false;
        self.checkin_fixed_reward = reward;
        self
    }

    /// With check-in enabled and a random reward in `[1, max]`.
    #[inline]
    #[must_use]
    pub fn with_random_checkin(mut self, max: u64) -> Self {
        self.enable_checkin = true;
        self.enable_random_checkin = true;
        self.checkin_random_reward_max = max;
        self
    }

    /// Effective upper bound of the random reward.
    ///
    /// A configured bound of zero still draws from `[1, 1]`.
    #[inline]
    #[must_use]
    pub fn effective_random_max(&self) -> u64 {
        self.checkin_random_reward_max.max(1)
    }

    /// Whether the given user bypasses cost checks.
    #[inline]
    #[must_use]
    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admins.iter().any(|a| a == user_id)
    }

    /// Whether the given user's requests are ignored.
    #[inline]
    #[must_use]
    pub fn is_blacklisted(&self, user_id: &str) -> bool {
        self.user_blacklist.iter().any(|b| b == user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_stock_install() {
        let config = EconomyConfig::default();
        assert!(config.enable_user_limit);
        assert!(!config.enable_group_limit);
        assert!(!config.enable_checkin);
        assert_eq!(config.checkin_fixed_reward, 3);
        assert!(!config.enable_random_checkin);
        assert_eq!(config.checkin_random_reward_max, 5);
        assert!(config.admins.is_empty());
        assert!(config.user_blacklist.is_empty());
    }

    #[test]
    fn from_value_fills_missing_with_defaults() {
        let config = EconomyConfig::from_value(json!({
            "enable_group_limit": true,
            "checkin_fixed_reward": 10,
        }))
        .unwrap();

        assert!(config.enable_user_limit);
        assert!(config.enable_group_limit);
        assert_eq!(config.checkin_fixed_reward, 10);
    }

    #[test]
    fn from_value_ignores_unknown_options() {
        let config = EconomyConfig::from_value(json!({
            "enable_checkin": true,
            "proxy_url": "http://localhost:7890",
            "preset_table_quality": "hd",
        }))
        .unwrap();

        assert!(config.enable_checkin);
    }

    #[test]
    fn from_value_rejects_wrong_shape() {
        let result = EconomyConfig::from_value(json!({
            "checkin_fixed_reward": "three",
        }));
        assert!(result.is_err());
    }

    #[test]
    fn effective_random_max_never_below_one() {
        let config = EconomyConfig::default().with_random_checkin(0);
        assert_eq!(config.effective_random_max(), 1);

        let config = EconomyConfig::default().with_random_checkin(5);
        assert_eq!(config.effective_random_max(), 5);
    }

    #[test]
    fn admin_and_blacklist_lookups() {
        let mut config = EconomyConfig::default();
        config.admins.push("100".to_string());
        config.user_blacklist.push("200".to_string());

        assert!(config.is_admin("100"));
        assert!(!config.is_admin("101"));
        assert!(config.is_blacklisted("200"));
        assert!(!config.is_blacklisted("100"));
    }
}
