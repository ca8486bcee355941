//! Economy manager
//!
//! Owns the two balance ledgers, the check-in tracker, and the reward
//! policy, and is their only writer. The dispatch layer talks to this type
//! exclusively; reads are safe from anywhere, mutations all funnel through
//! here.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::admission::{AdmissionController, AdmissionDecision, DebitSource};
use crate::checkin::{today_string, CheckinOutcome, CheckinTracker, RewardPolicy};
use crate::config::EconomyConfig;
use crate::ledger::BalanceLedger;

/// Credits one admitted request consumes.
pub const REQUEST_COST: u64 = 1;

/// Backing file for per-user balances.
pub const USER_COUNTS_FILE: &str = "user_counts.json";
/// Backing file for per-group balances.
pub const GROUP_COUNTS_FILE: &str = "group_counts.json";
/// Backing file for last check-in dates.
pub const USER_CHECKIN_FILE: &str = "user_checkin.json";

/// The credit economy facade.
#[derive(Debug)]
pub struct EconomyManager {
    config: EconomyConfig,
    users: Arc<BalanceLedger>,
    groups: Arc<BalanceLedger>,
    checkins: CheckinTracker,
    admission: AdmissionController,
    rewards: RewardPolicy,
    /// Serializes whole check-in claims so the daily-grant check and the
    /// date record cannot interleave between two tasks for the same user.
    checkin_gate: Mutex<()>,
}

impl EconomyManager {
    /// Open the economy state stored under `data_dir`.
    ///
    /// Missing files start as empty state; the directory is created on the
    /// first persisted mutation.
    pub async fn open(data_dir: impl AsRef<Path>, config: EconomyConfig) -> Self {
        let data_dir = data_dir.as_ref();
        let users = Arc::new(BalanceLedger::open("user", data_dir.join(USER_COUNTS_FILE)).await);
        let groups = Arc::new(BalanceLedger::open("group", data_dir.join(GROUP_COUNTS_FILE)).await);
        let checkins = CheckinTracker::open(data_dir.join(USER_CHECKIN_FILE)).await;
        let admission = AdmissionController::new(
            Arc::clone(&users),
            Arc::clone(&groups),
            config.enable_user_limit,
            config.enable_group_limit,
        );
        let rewards = RewardPolicy::from_config(&config);

        tracing::info!(
            data_dir = %data_dir.display(),
            user_limit = config.enable_user_limit,
            group_limit = config.enable_group_limit,
            checkin = config.enable_checkin,
            "economy opened"
        );

        Self {
            config,
            users,
            groups,
            checkins,
            admission,
            rewards,
            checkin_gate: Mutex::new(()),
        }
    }

    /// Decide admission for a request and debit the covering ledger.
    pub async fn is_request_admitted(
        &self,
        user_id: &str,
        group_id: Option<&str>,
        cost: u64,
    ) -> AdmissionDecision {
        self.admission.admit(user_id, group_id, cost).await
    }

    /// Credit back a previously admitted debit.
    ///
    /// `source` must be the source reported by the matching admission;
    /// callers invoke this exactly once, on downstream failure only.
    pub async fn refund(
        &self,
        user_id: &str,
        group_id: Option<&str>,
        amount: u64,
        source: DebitSource,
    ) {
        self.admission.refund(user_id, group_id, amount, source).await;
    }

    /// Claim the daily check-in reward.
    ///
    /// At most one reward is granted per user per local calendar day. On a
    /// grant the user ledger is credited first and the date recorded
    /// second; a crash between the two persists may re-allow the claim
    /// after restart (accepted limitation, not retried).
    pub async fn checkin(&self, user_id: &str) -> CheckinOutcome {
        if !self.config.enable_checkin {
            return CheckinOutcome::Disabled;
        }

        let _claim = self.checkin_gate.lock().await;
        let today = today_string();

        if self.checkins.is_checked_in(user_id, &today).await {
            let balance = self.users.get(user_id).await;
            return CheckinOutcome::AlreadyCheckedIn { balance };
        }

        let reward = self.rewards.draw();
        let balance = self.users.credit(user_id, reward).await;
        self.checkins.record(user_id, &today).await;
        tracing::info!(user_id, reward, balance, "daily check-in granted");

        CheckinOutcome::Granted { reward, balance }
    }

    /// Current balance of a user, 0 if never seen.
    pub async fn get_user_balance(&self, user_id: &str) -> u64 {
        self.users.get(user_id).await
    }

    /// Current balance of a group, 0 if never seen.
    pub async fn get_group_balance(&self, group_id: &str) -> u64 {
        self.groups.get(group_id).await
    }

    /// Administratively credit a subject and return its new balance.
    pub async fn admin_credit(&self, subject_id: &str, amount: u64, is_group: bool) -> u64 {
        let balance = if is_group {
            self.groups.credit(subject_id, amount).await
        } else {
            self.users.credit(subject_id, amount).await
        };
        tracing::info!(subject_id, amount, balance, is_group, "admin credit applied");
        balance
    }

    /// Active configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EconomyConfig {
        &self.config
    }
}
