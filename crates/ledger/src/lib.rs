//! Local stake ledger.
//!
//! Persists the two pieces of state that survive between runs: each
//! delegator's last recorded stake and the last processed epoch. The
//! ledger is handed to callers explicitly; there is no process-wide
//! store.
//!
//! [`FileLedger`] is the durable backend, [`MemoryLedger`] backs tests.

use std::collections::BTreeMap;
use std::fmt;
use std::io;

pub mod fs;
pub mod memory;

pub use fs::FileLedger;
pub use memory::MemoryLedger;

/// A delegator's stake as last recorded by the operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StakeSnapshot {
    pub stake: f64,
}

/// Error type for ledger operations.
#[derive(Debug)]
pub enum LedgerError {
    /// File I/O failure (read, write, sync).
    Io(io::Error),
    /// The ledger file exists but could not be parsed.
    Corrupt(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::Io(e) => write!(f, "ledger I/O error: {}", e),
            LedgerError::Corrupt(msg) => write!(f, "ledger corrupt: {}", msg),
        }
    }
}

impl std::error::Error for LedgerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LedgerError::Io(e) => Some(e),
            LedgerError::Corrupt(_) => None,
        }
    }
}

impl From<io::Error> for LedgerError {
    fn from(e: io::Error) -> Self {
        LedgerError::Io(e)
    }
}

/// Persistent mapping from delegator address to last recorded stake,
/// plus the single last-processed-epoch scalar.
///
/// ## Contract
///
/// - Reads of absent entries return `Ok(None)`, never an error.
/// - `set_last_epoch` overwrites; callers enforce the forward-only
///   invariant before writing.
/// - Implementations must be safe to share behind `&self` across
///   sequential calls; no cross-call transaction is provided.
pub trait StakeLedger: Send + Sync {
    /// Last recorded stake for one delegator.
    fn delegator_stake(&self, address: &str) -> Result<Option<StakeSnapshot>, LedgerError>;

    /// Records (or overwrites) a delegator's stake.
    fn set_delegator_stake(&self, address: &str, stake: f64) -> Result<(), LedgerError>;

    /// All recorded delegator stakes, keyed by address.
    fn delegator_stakes(&self) -> Result<BTreeMap<String, StakeSnapshot>, LedgerError>;

    /// The most recent epoch for which a payout cycle completed, if any.
    fn last_epoch(&self) -> Result<Option<u64>, LedgerError>;

    /// Advances the last processed epoch.
    fn set_last_epoch(&self, epoch: u64) -> Result<(), LedgerError>;
}
