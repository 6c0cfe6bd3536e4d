//! PayoutReconciler — the payout cycle orchestrator.
//!
//! ```text
//! RewardSource::last_epoch()
//!      │
//!      ▼ (1) Gate
//! gate::decide(current, last_processed, force)
//!      │
//!      ▼ (2) Iterate delegators (API order, strictly sequential)
//! per delegator: identity → rewards → validation → calculate → report
//!      │
//!      ▼ (3) Notify each report (fire-and-forget)
//!      │
//!      ▼ (4) Advance LastProcessedEpoch exactly once
//! ```
//!
//! The reconciler is a glue layer. It does not retry, does not batch
//! remote calls, and holds no state beyond its injected collaborators.
//! A remote fault aborts the whole run; the two defined per-delegator
//! conditions (ineligible identity, reward-history epoch mismatch)
//! produce report entries and never abort the cycle.

use std::sync::Arc;

use tracing::{info, warn};

use pool_ledger::{LedgerError, StakeLedger};

use crate::calculator::{reward_payout, stake_delta_payout, PayoutPolicy};
use crate::gate::{decide, GateDecision};
use crate::notify::Notifier;
use crate::report::{payment_link, PayoutReport};
use crate::source::{
    DelegatorRecord, RewardSource, SourceError, Transaction, ValidationSummary,
};

const REPLENISH_TX_TYPE: &str = "ReplenishStakeTx";

// ─── Error ──────────────────────────────────────────────────────────────

/// Errors that abort a payout cycle.
#[derive(Debug)]
pub enum ReconcileError {
    /// A remote call failed; the run stops where it was.
    Source(SourceError),
    /// The local ledger failed.
    Ledger(LedgerError),
    /// No last-processed epoch recorded; `init` must run first.
    NotInitialized,
    /// The current epoch was already processed. Benign, nothing to do.
    NothingToDo { epoch: u64 },
    /// The current epoch is behind the recorded one.
    EpochWentBackwards { current: u64, last: u64 },
}

impl std::fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcileError::Source(e) => write!(f, "remote data fault: {}", e),
            ReconcileError::Ledger(e) => write!(f, "stake ledger fault: {}", e),
            ReconcileError::NotInitialized => {
                write!(f, "no last processed epoch recorded; run 'init' first")
            }
            ReconcileError::NothingToDo { epoch } => {
                write!(f, "epoch {} already processed; nothing to do", epoch)
            }
            ReconcileError::EpochWentBackwards { current, last } => write!(
                f,
                "current epoch {} is behind last processed epoch {}; refusing to run",
                current, last
            ),
        }
    }
}

impl std::error::Error for ReconcileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReconcileError::Source(e) => Some(e),
            ReconcileError::Ledger(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SourceError> for ReconcileError {
    fn from(e: SourceError) -> Self {
        ReconcileError::Source(e)
    }
}

impl From<LedgerError> for ReconcileError {
    fn from(e: LedgerError) -> Self {
        ReconcileError::Ledger(e)
    }
}

// ─── Outcome ────────────────────────────────────────────────────────────

/// Result of a completed cycle.
#[derive(Debug)]
pub struct CycleOutcome {
    /// The epoch the gate ran against.
    pub current_epoch: u64,
    /// The epoch rewards were attributed to (`current_epoch - 1`).
    pub source_epoch: u64,
    /// One report per delegator, in API order.
    pub reports: Vec<PayoutReport>,
    /// Whether stake snapshots were persisted (stake-delta mode).
    pub committed: bool,
}

impl CycleOutcome {
    /// Sum of all payouts. Skips and faults contribute zero.
    pub fn total_payout(&self) -> f64 {
        self.reports.iter().map(|r| r.payout_amount()).sum()
    }
}

// ─── Reconciler ─────────────────────────────────────────────────────────

/// Orchestrates payout cycles over injected collaborators.
///
/// Single logical thread of control: remote fetches are issued
/// strictly sequentially per delegator, so latency scales linearly
/// with delegator count.
pub struct PayoutReconciler {
    source: Arc<dyn RewardSource>,
    ledger: Arc<dyn StakeLedger>,
    notifier: Arc<dyn Notifier>,
    pool_address: String,
    policy: PayoutPolicy,
}

impl PayoutReconciler {
    pub fn new(
        source: Arc<dyn RewardSource>,
        ledger: Arc<dyn StakeLedger>,
        notifier: Arc<dyn Notifier>,
        pool_address: impl Into<String>,
        policy: PayoutPolicy,
    ) -> Self {
        PayoutReconciler {
            source,
            ledger,
            notifier,
            pool_address: pool_address.into(),
            policy,
        }
    }

    /// Initialization step: records the current epoch as the last
    /// processed one, establishing the baseline `payout` requires.
    pub async fn init(&self) -> Result<u64, ReconcileError> {
        let current = self.source.last_epoch().await?.epoch;
        self.ledger.set_last_epoch(current)?;
        info!("last processed epoch initialized to {}", current);
        Ok(current)
    }

    /// Records every delegator's current stake in the ledger (the
    /// `log` operation). Returns how many entries were written.
    pub async fn record_stakes(&self) -> Result<usize, ReconcileError> {
        let delegators = self.source.pool_delegators(&self.pool_address).await?;
        for delegator in &delegators {
            self.ledger
                .set_delegator_stake(&delegator.address, delegator.stake)?;
        }
        info!("recorded stake for {} delegators", delegators.len());
        Ok(delegators.len())
    }

    /// Runs the reward-based payout cycle.
    ///
    /// After every delegator has been visited, skips and faults
    /// included, the last processed epoch advances to the current
    /// epoch. Partial per-delegator failure never blocks that write.
    pub async fn run_reward_cycle(&self, force: bool) -> Result<CycleOutcome, ReconcileError> {
        let current = self.source.last_epoch().await?.epoch;
        self.check_gate(current, force)?;
        let source_epoch = current.saturating_sub(1);

        let delegators = self.source.pool_delegators(&self.pool_address).await?;
        info!(
            "reward cycle for epoch {} ({} delegators)",
            source_epoch,
            delegators.len()
        );

        let mut reports = Vec::with_capacity(delegators.len());
        for delegator in &delegators {
            let report = self.reconcile_reward(delegator, source_epoch).await?;
            self.send(&report).await;
            reports.push(report);
        }

        // Exactly one epoch write per completed cycle.
        self.ledger.set_last_epoch(current)?;

        Ok(CycleOutcome {
            current_epoch: current,
            source_epoch,
            reports,
            committed: false,
        })
    }

    /// Runs the stake-delta payout cycle.
    ///
    /// Computation is decoupled from persistence: new stake snapshots
    /// (and the epoch advance) are written only when `commit` is set.
    pub async fn run_stake_delta_cycle(
        &self,
        force: bool,
        commit: bool,
    ) -> Result<CycleOutcome, ReconcileError> {
        let current = self.source.last_epoch().await?.epoch;
        self.check_gate(current, force)?;
        let source_epoch = current.saturating_sub(1);

        let validation_time = self.source.epoch(source_epoch).await?.validation_time;
        let delegators = self.source.pool_delegators(&self.pool_address).await?;
        info!(
            "stake-delta cycle against epoch {} ({} delegators)",
            source_epoch,
            delegators.len()
        );

        let mut reports = Vec::with_capacity(delegators.len());
        for delegator in &delegators {
            let report = self
                .reconcile_stake_delta(delegator, validation_time.as_deref())
                .await?;
            self.send(&report).await;
            reports.push(report);
        }

        if commit {
            for delegator in &delegators {
                self.ledger
                    .set_delegator_stake(&delegator.address, delegator.stake)?;
            }
            self.ledger.set_last_epoch(current)?;
            info!("stake snapshots committed for {} delegators", delegators.len());
        } else {
            info!("dry run, stake snapshots not recorded");
        }

        Ok(CycleOutcome {
            current_epoch: current,
            source_epoch,
            reports,
            committed: commit,
        })
    }

    fn check_gate(&self, current: u64, force: bool) -> Result<(), ReconcileError> {
        let last = self.ledger.last_epoch()?;
        match decide(current, last, force) {
            GateDecision::Run => Ok(()),
            GateDecision::NotInitialized => Err(ReconcileError::NotInitialized),
            GateDecision::AlreadyProcessed => {
                Err(ReconcileError::NothingToDo { epoch: current })
            }
            GateDecision::Inconsistent => Err(ReconcileError::EpochWentBackwards {
                current,
                // decide() only returns Inconsistent when last exists
                last: last.unwrap_or(current),
            }),
        }
    }

    async fn reconcile_reward(
        &self,
        delegator: &DelegatorRecord,
        source_epoch: u64,
    ) -> Result<PayoutReport, ReconcileError> {
        let identity = self
            .source
            .identity(source_epoch, &delegator.address)
            .await?;
        if !identity.prev_state.is_eligible() {
            return Ok(PayoutReport::Skipped {
                address: delegator.address.clone(),
                state: identity.prev_state,
            });
        }

        let summaries = self
            .source
            .mining_reward_summaries(&delegator.address)
            .await?;
        let matched = match summaries.iter().find(|s| s.epoch == source_epoch) {
            Some(entry) => entry,
            None => {
                return Ok(PayoutReport::EpochMismatch {
                    address: delegator.address.clone(),
                    expected_epoch: source_epoch,
                    returned_epochs: summaries.iter().map(|s| s.epoch).collect(),
                })
            }
        };

        // A delegator that did not validate has no summary at all; the
        // validation component defaults to zero rather than aborting
        // the run.
        let validation = match self
            .source
            .validation_summary(source_epoch, &delegator.address)
            .await
        {
            Ok(summary) => summary,
            Err(SourceError::MissingResult(_)) => ValidationSummary::default(),
            Err(e) => return Err(e.into()),
        };
        let validation_component = validation.delegatee_reward.unwrap_or(0.0);
        let mining_component = reward_payout(matched.amount, self.policy.commission_rate());
        let total = mining_component + validation_component;

        Ok(PayoutReport::Paid {
            address: delegator.address.clone(),
            mining_component,
            validation_component,
            total,
            source_epoch,
            payment_link: payment_link(&delegator.address, total, &self.pool_address),
        })
    }

    async fn reconcile_stake_delta(
        &self,
        delegator: &DelegatorRecord,
        validation_time: Option<&str>,
    ) -> Result<PayoutReport, ReconcileError> {
        let snapshot = match self.ledger.delegator_stake(&delegator.address)? {
            Some(snapshot) => snapshot,
            None => {
                return Ok(PayoutReport::NoSnapshot {
                    address: delegator.address.clone(),
                    current_stake: delegator.stake,
                })
            }
        };

        let txs = self.source.txs_for_address(&delegator.address).await?;
        let replenish_amount = find_replenish(&txs, validation_time);

        let payout = stake_delta_payout(
            snapshot.stake,
            delegator.stake,
            replenish_amount,
            self.policy.commission_rate(),
        );

        Ok(PayoutReport::Delta {
            address: delegator.address.clone(),
            previous_stake: snapshot.stake,
            current_stake: delegator.stake,
            replenish_amount,
            payout,
            payment_link: payment_link(&delegator.address, payout, &self.pool_address),
        })
    }

    async fn send(&self, report: &PayoutReport) {
        if let Err(e) = self.notifier.notify(&report.render()).await {
            warn!("notification failed: {}", e);
        }
    }
}

/// First stake replenishment after the prior epoch's validation time.
/// Timestamps are RFC3339 UTC strings, so `>` on the raw strings is a
/// correct ordering. With no validation time available there is
/// nothing to compare against and the plain delta applies.
fn find_replenish(txs: &[Transaction], validation_time: Option<&str>) -> Option<f64> {
    let validation_time = validation_time?;
    txs.iter()
        .find(|tx| tx.tx_type == REPLENISH_TX_TYPE && tx.timestamp.as_str() > validation_time)
        .and_then(|tx| tx.amount)
}
