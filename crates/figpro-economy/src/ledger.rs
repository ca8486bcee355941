//! Balance ledgers
//!
//! One `BalanceLedger` per subject namespace (users, groups):
//! - `get` never fails; an absent subject has balance 0
//! - `credit` always succeeds and has no upper bound
//! - `debit` is an atomic check-and-subtract; balances never go negative
//!
//! The in-memory map is the source of truth for the process lifetime. Every
//! mutation writes the whole namespace back through its store while the
//! ledger lock is held, so per-subject updates apply in issue order and
//! concurrent readers only ever see committed state.

use std::collections::BTreeMap;
use std::path::PathBuf;

use figpro_store::JsonStore;
use tokio::sync::Mutex;

/// A debit was attempted against a balance below the requested amount.
///
/// This is a reported outcome of the debit protocol, not a fault; the
/// balance is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("insufficient balance: {current} remaining")]
pub struct InsufficientBalance {
    /// Balance at the time the debit was rejected
    pub current: u64,
}

/// A persistent map from subject ID to usage-credit count.
#[derive(Debug)]
pub struct BalanceLedger {
    /// Namespace label for logs ("user" / "group")
    name: &'static str,
    store: JsonStore<u64>,
    counts: Mutex<BTreeMap<String, u64>>,
}

impl BalanceLedger {
    /// Open a ledger backed by the given file, loading any existing counts.
    pub async fn open(name: &'static str, path: impl Into<PathBuf>) -> Self {
        let store = JsonStore::new(path);
        let counts = store.load().await;
        tracing::debug!(ledger = name, subjects = counts.len(), "ledger loaded");
        Self {
            name,
            store,
            counts: Mutex::new(counts),
        }
    }

    /// Current balance for a subject, 0 if never seen.
    pub async fn get(&self, id: &str) -> u64 {
        self.counts.lock().await.get(id).copied().unwrap_or(0)
    }

    /// Add `amount` credits to a subject and persist.
    ///
    /// Returns the new balance. Subjects are created on first credit.
    pub async fn credit(&self, id: &str, amount: u64) -> u64 {
        let mut counts = self.counts.lock().await;
        let balance = counts.entry(id.to_string()).or_insert(0);
        *balance = balance.saturating_add(amount);
        let new_balance = *balance;
        self.persist(&counts).await;
        new_balance
    }

    /// Subtract `amount` credits from a subject and persist.
    ///
    /// The check and the subtraction happen under one lock, so two
    /// concurrent debits can never both pass the sufficiency check.
    ///
    /// # Errors
    /// `InsufficientBalance` when the stored count is below `amount`; the
    /// balance is left unchanged.
    pub async fn debit(&self, id: &str, amount: u64) -> Result<u64, InsufficientBalance> {
        let mut counts = self.counts.lock().await;
        let current = counts.get(id).copied().unwrap_or(0);
        if current < amount {
            return Err(InsufficientBalance { current });
        }
        let new_balance = current - amount;
        counts.insert(id.to_string(), new_balance);
        self.persist(&counts).await;
        Ok(new_balance)
    }

    /// Number of subjects with a stored balance.
    pub async fn subject_count(&self) -> usize {
        self.counts.lock().await.len()
    }

    /// Write the full namespace back to its store.
    ///
    /// A failed write is logged and the in-memory mutation stands; the
    /// update is at risk only across a process restart.
    async fn persist(&self, counts: &BTreeMap<String, u64>) {
        if let Err(e) = self.store.save(counts).await {
            tracing::error!(ledger = self.name, error = %e, "ledger persist failed, serving from memory");
        }
    }
}
