//! FigPro credit economy core
//!
//! The usage-credit subsystem behind the image-transformation plugin:
//! - Per-user and per-group balance ledgers with write-through persistence
//! - Admission control with user-to-group fallback and refunds
//! - Daily check-in rewards, fixed or randomized
//!
//! The chat dispatch layer and the image-generation client live outside
//! this crate; they consume [`EconomyManager`] and pair every admitted
//! debit with exactly one terminal outcome (keep on success, refund on
//! failure).

pub mod admission;
pub mod checkin;
pub mod config;
pub mod economy;
pub mod ledger;

pub use admission::{AdmissionController, AdmissionDecision, DebitSource};
pub use checkin::{CheckinOutcome, CheckinTracker, RewardPolicy};
pub use config::EconomyConfig;
pub use economy::{EconomyManager, REQUEST_COST};
pub use ledger::{BalanceLedger, InsufficientBalance};
