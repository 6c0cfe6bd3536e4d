//! Pure payout arithmetic. No I/O, no rounding, no clamping.
//!
//! Two commission models coexist in operator practice and neither
//! supersedes the other, so both are exposed as selectable policies:
//!
//! - **Stake delta**: payout derived from the growth of a delegator's
//!   stake between runs, replenishments excluded, 15% commission.
//! - **Reward based**: payout derived from one epoch's mining reward,
//!   20% commission.
//!
//! Both scale the raw figure by the assumed total-to-component ratio
//! (the component is 20% of the total, so the remainder is 4x the raw
//! figure), then deduct the pool commission. Negative inputs propagate
//! algebraically; reporting flags negative payouts instead of erroring.

/// Commission model selected by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PayoutPolicy {
    /// Stake-delta payout with the given commission fraction.
    StakeDelta { commission_rate: f64 },
    /// Reward-based payout with the given commission fraction.
    RewardBased { commission_rate: f64 },
}

impl PayoutPolicy {
    pub const DEFAULT_STAKE_DELTA_COMMISSION: f64 = 0.15;
    pub const DEFAULT_REWARD_COMMISSION: f64 = 0.20;

    pub fn stake_delta_default() -> Self {
        PayoutPolicy::StakeDelta {
            commission_rate: Self::DEFAULT_STAKE_DELTA_COMMISSION,
        }
    }

    pub fn reward_based_default() -> Self {
        PayoutPolicy::RewardBased {
            commission_rate: Self::DEFAULT_REWARD_COMMISSION,
        }
    }

    pub fn commission_rate(&self) -> f64 {
        match *self {
            PayoutPolicy::StakeDelta { commission_rate } => commission_rate,
            PayoutPolicy::RewardBased { commission_rate } => commission_rate,
        }
    }
}

/// Stake-delta payout.
///
/// A replenishment is an in-epoch top-up and is excluded from the
/// delta before any scaling. The commission is charged on the full
/// scaled total and deducted from the pool-side balance.
pub fn stake_delta_payout(
    stake_start: f64,
    stake_end: f64,
    replenish_amount: Option<f64>,
    commission_rate: f64,
) -> f64 {
    let stake_diff = match replenish_amount {
        Some(replenish) => stake_end - stake_start - replenish,
        None => stake_end - stake_start,
    };
    let balance = (stake_diff * 100.0 / 20.0) - stake_diff;
    let total = balance + stake_diff;
    let commission = total * commission_rate;
    balance - commission
}

/// Reward-based payout for one epoch's mining reward.
///
/// The commission is charged on the scaled mining total, so at the
/// default 20% rate the payout is 3.2x the raw reward.
pub fn reward_payout(reward: f64, commission_rate: f64) -> f64 {
    let total_mining_reward = (reward * 100.0 / 20.0) - reward;
    let commission = total_mining_reward * commission_rate;
    total_mining_reward - commission
}

#[cfg(test)]
mod tests {
    use super::*;

    // f64 identity checks; inputs chosen so the arithmetic is exact.

    #[test]
    fn reward_payout_is_3_2x_at_default_commission() {
        assert_eq!(reward_payout(100.0, 0.20), 320.0);
        assert_eq!(reward_payout(50.0, 0.20), 160.0);
        assert_eq!(reward_payout(0.0, 0.20), 0.0);
    }

    #[test]
    fn reward_payout_negative_input_propagates() {
        assert_eq!(reward_payout(-100.0, 0.20), -320.0);
    }

    #[test]
    fn stake_delta_payout_is_3_25x_at_default_commission() {
        // stakeDiff = 100, balance = 400, total = 500,
        // commission = 75, payout = 325
        assert_eq!(stake_delta_payout(1000.0, 1100.0, None, 0.15), 325.0);
    }

    #[test]
    fn stake_delta_replenish_is_fully_absorbed() {
        // 1150 - 1000 - 50 = 100, same as the plain-delta case above
        assert_eq!(stake_delta_payout(1000.0, 1150.0, Some(50.0), 0.15), 325.0);
    }

    #[test]
    fn stake_delta_negative_diff_propagates() {
        // stake shrank; payout goes negative, not clamped
        assert_eq!(stake_delta_payout(1100.0, 1000.0, None, 0.15), -325.0);
    }

    #[test]
    fn zero_delta_pays_nothing() {
        assert_eq!(stake_delta_payout(500.0, 500.0, None, 0.15), 0.0);
    }

    #[test]
    fn policy_defaults() {
        assert_eq!(
            PayoutPolicy::stake_delta_default().commission_rate(),
            0.15
        );
        assert_eq!(PayoutPolicy::reward_based_default().commission_rate(), 0.20);
    }
}
