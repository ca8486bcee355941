//! Request admission and refund protocol
//!
//! Decides, for each inbound request, whether it may proceed and which
//! ledger pays for it:
//! - With no gates enabled, everything is admitted for free
//! - A group that cannot cover the cost vetoes the request outright
//! - Otherwise the user's balance pays, falling back to the group's
//!
//! Rejection is a reported outcome with a human-readable reason, never an
//! error. The inverse `refund` operation credits back whichever ledger an
//! admission debited; pairing each debit with exactly one terminal outcome
//! is the caller's responsibility.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ledger::{BalanceLedger, InsufficientBalance};

/// Which ledger covered an admitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebitSource {
    /// The requesting user's own balance
    User,
    /// The group's shared balance
    Group,
    /// No debit was performed
    None,
}

/// Outcome of an admission check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionDecision {
    /// Whether the request may proceed
    pub admitted: bool,
    /// Ledger debited for an admitted request
    pub source: DebitSource,
    /// Human-readable explanation, forwarded verbatim on rejection
    pub reason: String,
}

impl AdmissionDecision {
    fn granted(source: DebitSource, reason: impl Into<String>) -> Self {
        Self {
            admitted: true,
            source,
            reason: reason.into(),
        }
    }

    fn rejected(reason: impl Into<String>) -> Self {
        Self {
            admitted: false,
            source: DebitSource::None,
            reason: reason.into(),
        }
    }
}

/// Decides admission and performs the corresponding debit or refund.
///
/// Holds shared references to both ledgers; the two gate flags are fixed at
/// construction so a decision and its later refund see the same policy.
#[derive(Debug)]
pub struct AdmissionController {
    users: Arc<BalanceLedger>,
    groups: Arc<BalanceLedger>,
    enable_user_limit: bool,
    enable_group_limit: bool,
}

impl AdmissionController {
    /// Create a controller over the two ledgers with the given gates.
    #[inline]
    #[must_use]
    pub fn new(
        users: Arc<BalanceLedger>,
        groups: Arc<BalanceLedger>,
        enable_user_limit: bool,
        enable_group_limit: bool,
    ) -> Self {
        Self {
            users,
            groups,
            enable_user_limit,
            enable_group_limit,
        }
    }

    /// Decide admission for a request and debit the covering ledger.
    ///
    /// `cost` must be positive. The debit itself is the authoritative
    /// sufficiency check: ledgers reject-and-report atomically, so two
    /// concurrent requests can never both spend the same credit.
    pub async fn admit(
        &self,
        user_id: &str,
        group_id: Option<&str>,
        cost: u64,
    ) -> AdmissionDecision {
        if !self.enable_user_limit && !self.enable_group_limit {
            return AdmissionDecision::granted(DebitSource::None, "unrestricted");
        }

        // Group deficiency is a hard veto, checked before any user-side
        // logic: when the fallback path could never succeed, reject now
        // even if the user balance alone would cover the cost.
        if self.enable_group_limit {
            if let Some(gid) = group_id {
                let group_balance = self.groups.get(gid).await;
                if group_balance < cost {
                    tracing::debug!(group_id = gid, group_balance, cost, "admission vetoed by group balance");
                    return AdmissionDecision::rejected(format!(
                        "group balance insufficient ({group_balance} remaining)"
                    ));
                }
            }
        }

        if self.enable_user_limit {
            let user_current = match self.users.debit(user_id, cost).await {
                Ok(remaining) => {
                    tracing::debug!(user_id, cost, remaining, "admission debited user balance");
                    return AdmissionDecision::granted(DebitSource::User, "success");
                }
                Err(InsufficientBalance { current }) => current,
            };

            // User balance exhausted; the group covers as a fallback when
            // its gate is on and the request has group context.
            if self.enable_group_limit {
                if let Some(gid) = group_id {
                    return match self.groups.debit(gid, cost).await {
                        Ok(remaining) => {
                            tracing::debug!(user_id, group_id = gid, cost, remaining, "admission fell back to group balance");
                            AdmissionDecision::granted(DebitSource::Group, "success")
                        }
                        Err(InsufficientBalance { current }) => {
                            AdmissionDecision::rejected(format!(
                                "user balance insufficient ({user_current} remaining), group balance insufficient ({current} remaining)"
                            ))
                        }
                    };
                }
            }

            return AdmissionDecision::rejected(format!(
                "user balance insufficient ({user_current} remaining)"
            ));
        }

        if self.enable_group_limit {
            if let Some(gid) = group_id {
                return match self.groups.debit(gid, cost).await {
                    Ok(remaining) => {
                        tracing::debug!(group_id = gid, cost, remaining, "admission debited group balance");
                        AdmissionDecision::granted(DebitSource::Group, "success")
                    }
                    Err(InsufficientBalance { current }) => AdmissionDecision::rejected(format!(
                        "group balance insufficient ({current} remaining)"
                    )),
                };
            }
        }

        // Only the group gate is on and the request carries no group
        // context (e.g. a direct message), so there is nothing to debit.
        AdmissionDecision::granted(DebitSource::None, "unrestricted")
    }

    /// Credit back a previously admitted debit.
    ///
    /// The caller supplies the `(amount, source)` pair reported by the
    /// matching admission. Double refunds are not detected here.
    pub async fn refund(
        &self,
        user_id: &str,
        group_id: Option<&str>,
        amount: u64,
        source: DebitSource,
    ) {
        match source {
            DebitSource::User => {
                let balance = self.users.credit(user_id, amount).await;
                tracing::info!(user_id, amount, balance, "refunded user balance");
            }
            DebitSource::Group => {
                if let Some(gid) = group_id {
                    let balance = self.groups.credit(gid, amount).await;
                    tracing::info!(group_id = gid, amount, balance, "refunded group balance");
                } else {
                    tracing::warn!(user_id, amount, "group refund dropped: no group id supplied");
                }
            }
            DebitSource::None => {
                tracing::debug!(user_id, "refund skipped: admission performed no debit");
            }
        }
    }
}
