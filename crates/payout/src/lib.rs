//! Payout reconciliation engine for a staking-pool operator.
//!
//! The pipeline, leaf first:
//!
//! ```text
//! RewardSource (remote REST API, read-only)
//!      │
//!      ▼
//! EpochGate ── decides whether a cycle runs at all
//!      │
//!      ▼
//! PayoutReconciler ── per-delegator eligibility, reward lookup,
//!      │               payout calculation, report emission
//!      ▼
//! StakeLedger ── last processed epoch + stake snapshots, advanced
//!                exactly once per completed cycle
//! ```
//!
//! All external collaborators sit behind object-safe traits
//! ([`source::RewardSource`], [`notify::Notifier`], the ledger trait in
//! `pool-ledger`) with mock implementations exported for tests.

pub mod calculator;
pub mod gate;
pub mod notify;
pub mod reconciler;
pub mod report;
pub mod source;

pub use calculator::PayoutPolicy;
pub use gate::{decide, GateDecision};
pub use notify::{ConsoleNotifier, MockNotifier, Notifier, NotifyError, TelegramNotifier};
pub use reconciler::{CycleOutcome, PayoutReconciler, ReconcileError};
pub use report::{payment_link, PayoutReport};
pub use source::{
    DelegatorRecord, EpochDetail, HttpRewardSource, IdentitySnapshot, IdentityState,
    MiningRewardSummary, MockRewardSource, PoolInfo, RewardSource, SourceError, Transaction,
    ValidationSummary,
};
