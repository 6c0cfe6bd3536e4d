//! Epoch gate: the sole guard against duplicate payout cycles.
//!
//! Evaluated exactly once per invocation, before any per-delegator
//! work begins.

/// Outcome of the epoch gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// A payout cycle may run.
    Run,
    /// The current epoch was already processed and the run was not
    /// forced. Benign, nothing to do.
    AlreadyProcessed,
    /// No last-processed epoch is recorded; the operator must run the
    /// explicit initialization step first.
    NotInitialized,
    /// The current epoch is behind the recorded one. Clock or data
    /// went backwards; fatal, never silently ignored.
    Inconsistent,
}

/// Decides whether a payout cycle should execute.
///
/// An uninitialized ledger wins over everything, including `force`:
/// there is no baseline to pay out against.
pub fn decide(current_epoch: u64, last_processed: Option<u64>, force: bool) -> GateDecision {
    let last = match last_processed {
        Some(last) => last,
        None => return GateDecision::NotInitialized,
    };
    if force {
        return GateDecision::Run;
    }
    if current_epoch > last {
        GateDecision::Run
    } else if current_epoch == last {
        GateDecision::AlreadyProcessed
    } else {
        GateDecision::Inconsistent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_epoch_unforced_is_already_processed() {
        assert_eq!(decide(5, Some(5), false), GateDecision::AlreadyProcessed);
    }

    #[test]
    fn newer_epoch_runs() {
        assert_eq!(decide(6, Some(5), false), GateDecision::Run);
    }

    #[test]
    fn force_overrides_already_processed() {
        assert_eq!(decide(5, Some(5), true), GateDecision::Run);
    }

    #[test]
    fn older_epoch_is_inconsistent() {
        assert_eq!(decide(4, Some(5), false), GateDecision::Inconsistent);
    }

    #[test]
    fn uninitialized_wins_regardless_of_epoch_or_force() {
        assert_eq!(decide(0, None, false), GateDecision::NotInitialized);
        assert_eq!(decide(99, None, false), GateDecision::NotInitialized);
        assert_eq!(decide(99, None, true), GateDecision::NotInitialized);
    }
}
