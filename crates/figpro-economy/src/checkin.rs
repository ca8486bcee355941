//! Daily check-in tracking and reward policy
//!
//! Each user may claim one reward per calendar day (local timezone). The
//! tracker stores the last check-in date per user; the reward policy decides
//! how many credits a claim is worth.

use std::collections::BTreeMap;
use std::path::PathBuf;

use figpro_store::JsonStore;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::EconomyConfig;

/// Result of a check-in attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum CheckinOutcome {
    /// Check-in is turned off in configuration
    Disabled,
    /// The user already claimed today's reward
    AlreadyCheckedIn {
        /// Current user balance, unchanged
        balance: u64,
    },
    /// Reward granted and credited
    Granted {
        /// Credits added by this claim
        reward: u64,
        /// User balance after the credit
        balance: u64,
    },
}

/// Today's date in the ledger's local timezone, as `YYYY-MM-DD`.
#[must_use]
pub fn today_string() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// Persistent map from user ID to last check-in date.
#[derive(Debug)]
pub struct CheckinTracker {
    store: JsonStore<String>,
    dates: Mutex<BTreeMap<String, String>>,
}

impl CheckinTracker {
    /// Open a tracker backed by the given file, loading any existing dates.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let store = JsonStore::new(path);
        let dates = store.load().await;
        Self {
            store,
            dates: Mutex::new(dates),
        }
    }

    /// Last recorded check-in date for a user, if any.
    pub async fn last_checkin(&self, user_id: &str) -> Option<String> {
        self.dates.lock().await.get(user_id).cloned()
    }

    /// Whether the user has already checked in on `date`.
    ///
    /// Never-checked-in users always report false.
    pub async fn is_checked_in(&self, user_id: &str, date: &str) -> bool {
        self.dates.lock().await.get(user_id).map(String::as_str) == Some(date)
    }

    /// Record `date` as the user's last check-in and persist.
    pub async fn record(&self, user_id: &str, date: &str) {
        let mut dates = self.dates.lock().await;
        dates.insert(user_id.to_string(), date.to_string());
        if let Err(e) = self.store.save(&dates).await {
            tracing::error!(error = %e, "check-in persist failed, serving from memory");
        }
    }
}

/// Computes the credit value of a check-in claim.
#[derive(Debug, Clone, Copy)]
pub struct RewardPolicy {
    fixed: u64,
    random: bool,
    random_max: u64,
}

impl RewardPolicy {
    /// Build the policy from configuration.
    ///
    /// The random bound is clamped to at least 1 so a misconfigured zero
    /// still produces a valid draw range.
    #[inline]
    #[must_use]
    pub fn from_config(config: &EconomyConfig) -> Self {
        Self {
            fixed: config.checkin_fixed_reward,
            random: config.enable_random_checkin,
            random_max: config.effective_random_max(),
        }
    }

    /// Draw the reward for one claim.
    ///
    /// Fixed mode returns the configured amount; random mode draws
    /// uniformly from `[1, random_max]`.
    #[must_use]
    pub fn draw(&self) -> u64 {
        if self.random {
            rand::thread_rng().gen_range(1..=self.random_max)
        } else {
            self.fixed
        }
    }
}
