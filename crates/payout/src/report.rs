//! Per-delegator report records, emitted for display and notification
//! only. Never persisted. Rounding to 2 decimals happens here, at
//! format time, not inside the calculator.

use pool_common::amount::round2;

use crate::source::IdentityState;

const PAY_URL_BASE: &str = "https://app.idena.io/dna/send";

/// Pre-filled payment link for manual execution. The amount is
/// rounded to 2 decimals to match the displayed total.
pub fn payment_link(address: &str, amount: f64, pool_address: &str) -> String {
    format!(
        "{}?address={}&amount={}&comment=Delegator%20payout%20for%20{}",
        PAY_URL_BASE,
        address,
        round2(amount),
        pool_address
    )
}

/// Outcome of one delegator's reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub enum PayoutReport {
    /// Reward-based payout: commission-adjusted mining component plus
    /// the epoch's delegatee reward.
    Paid {
        address: String,
        mining_component: f64,
        validation_component: f64,
        total: f64,
        source_epoch: u64,
        payment_link: String,
    },
    /// Stake-delta payout with the raw figures it was derived from.
    Delta {
        address: String,
        previous_stake: f64,
        current_stake: f64,
        replenish_amount: Option<f64>,
        payout: f64,
        payment_link: String,
    },
    /// Delegator has no recorded stake snapshot yet; nothing to
    /// compare against. The snapshot is created on commit.
    NoSnapshot { address: String, current_stake: f64 },
    /// Delegator was in an ineligible identity state for the source
    /// epoch. A defined skip, not an error.
    Skipped {
        address: String,
        state: IdentityState,
    },
    /// The reward history did not contain the expected epoch. A
    /// data-inconsistency fault addressed to the operator; the cycle
    /// continues with the next delegator.
    EpochMismatch {
        address: String,
        expected_epoch: u64,
        returned_epochs: Vec<u64>,
    },
}

impl PayoutReport {
    /// The payout this entry contributes to an aggregate total.
    /// Skips and faults contribute zero.
    pub fn payout_amount(&self) -> f64 {
        match self {
            PayoutReport::Paid { total, .. } => *total,
            PayoutReport::Delta { payout, .. } => *payout,
            _ => 0.0,
        }
    }

    /// Human-readable rendering, one block per delegator.
    pub fn render(&self) -> String {
        match self {
            PayoutReport::Paid {
                address,
                mining_component,
                validation_component,
                total,
                source_epoch,
                payment_link,
            } => {
                let flag = if *total < 0.0 { " (negative)" } else { "" };
                format!(
                    "{}: payout {}{} for epoch {} (mining {}, validation {})\nPay: {}",
                    address,
                    round2(*total),
                    flag,
                    source_epoch,
                    round2(*mining_component),
                    round2(*validation_component),
                    payment_link
                )
            }
            PayoutReport::Delta {
                address,
                previous_stake,
                current_stake,
                replenish_amount,
                payout,
                payment_link,
            } => {
                let diff = current_stake - previous_stake;
                let flag = if *payout < 0.0 { " (negative)" } else { "" };
                let replenish = match replenish_amount {
                    Some(r) => format!(", replenish {} excluded", round2(*r)),
                    None => String::new(),
                };
                format!(
                    "{}: stake {} -> {} (raw difference {}{})\nPayout: {}{}\nPay: {}",
                    address,
                    previous_stake,
                    current_stake,
                    round2(diff),
                    replenish,
                    round2(*payout),
                    flag,
                    payment_link
                )
            }
            PayoutReport::NoSnapshot {
                address,
                current_stake,
            } => format!(
                "{}: no recorded stake snapshot (current stake {}); run 'log' or commit to record it",
                address, current_stake
            ),
            PayoutReport::Skipped { address, state } => {
                format!("{}: skipped, ineligible state {}", address, state)
            }
            PayoutReport::EpochMismatch {
                address,
                expected_epoch,
                returned_epochs,
            } => format!(
                "{}: mining reward history has epochs {:?}, expected {}; check the indexer data",
                address, returned_epochs, expected_epoch
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_link_rounds_amount() {
        let link = payment_link("0xaa", 169.999, "0xpool");
        assert_eq!(
            link,
            "https://app.idena.io/dna/send?address=0xaa&amount=170&comment=Delegator%20payout%20for%200xpool"
        );
    }

    #[test]
    fn paid_report_rounds_and_names_epoch() {
        let report = PayoutReport::Paid {
            address: "0xaa".to_string(),
            mining_component: 160.0,
            validation_component: 10.0,
            total: 170.0,
            source_epoch: 120,
            payment_link: payment_link("0xaa", 170.0, "0xpool"),
        };
        let text = report.render();
        assert!(text.contains("payout 170"));
        assert!(text.contains("epoch 120"));
        assert!(!text.contains("negative"));
    }

    #[test]
    fn negative_payout_is_flagged() {
        let report = PayoutReport::Paid {
            address: "0xaa".to_string(),
            mining_component: -32.0,
            validation_component: 0.0,
            total: -32.0,
            source_epoch: 120,
            payment_link: payment_link("0xaa", -32.0, "0xpool"),
        };
        assert!(report.render().contains("(negative)"));
    }

    #[test]
    fn mismatch_report_names_both_sides() {
        let report = PayoutReport::EpochMismatch {
            address: "0xaa".to_string(),
            expected_epoch: 120,
            returned_epochs: vec![118, 119],
        };
        let text = report.render();
        assert!(text.contains("118"));
        assert!(text.contains("119"));
        assert!(text.contains("120"));
    }

    #[test]
    fn skip_and_fault_contribute_zero() {
        let skip = PayoutReport::Skipped {
            address: "0xaa".to_string(),
            state: IdentityState::Killed,
        };
        assert_eq!(skip.payout_amount(), 0.0);
        let mismatch = PayoutReport::EpochMismatch {
            address: "0xbb".to_string(),
            expected_epoch: 1,
            returned_epochs: vec![],
        };
        assert_eq!(mismatch.payout_amount(), 0.0);
    }
}
