//! In-memory ledger for tests and dry runs.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::{LedgerError, StakeLedger, StakeSnapshot};

/// Volatile ledger. Same contract as [`crate::FileLedger`], nothing
/// survives the process.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    delegators: RwLock<BTreeMap<String, f64>>,
    last_epoch: RwLock<Option<u64>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for tests: pre-seeded stakes and epoch.
    pub fn seeded(stakes: &[(&str, f64)], last_epoch: Option<u64>) -> Self {
        let ledger = Self::new();
        {
            let mut map = ledger.delegators.write();
            for (addr, stake) in stakes {
                map.insert((*addr).to_string(), *stake);
            }
        }
        *ledger.last_epoch.write() = last_epoch;
        ledger
    }
}

impl StakeLedger for MemoryLedger {
    fn delegator_stake(&self, address: &str) -> Result<Option<StakeSnapshot>, LedgerError> {
        Ok(self
            .delegators
            .read()
            .get(address)
            .map(|&stake| StakeSnapshot { stake }))
    }

    fn set_delegator_stake(&self, address: &str, stake: f64) -> Result<(), LedgerError> {
        self.delegators.write().insert(address.to_string(), stake);
        Ok(())
    }

    fn delegator_stakes(&self) -> Result<BTreeMap<String, StakeSnapshot>, LedgerError> {
        Ok(self
            .delegators
            .read()
            .iter()
            .map(|(addr, &stake)| (addr.clone(), StakeSnapshot { stake }))
            .collect())
    }

    fn last_epoch(&self) -> Result<Option<u64>, LedgerError> {
        Ok(*self.last_epoch.read())
    }

    fn set_last_epoch(&self, epoch: u64) -> Result<(), LedgerError> {
        *self.last_epoch.write() = Some(epoch);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_ledger_exposes_entries() {
        let ledger = MemoryLedger::seeded(&[("0xaa", 100.0), ("0xbb", 200.0)], Some(5));
        assert_eq!(
            ledger.delegator_stake("0xbb").unwrap(),
            Some(StakeSnapshot { stake: 200.0 })
        );
        assert_eq!(ledger.last_epoch().unwrap(), Some(5));
        assert_eq!(ledger.delegator_stakes().unwrap().len(), 2);
    }

    #[test]
    fn epoch_overwrites() {
        let ledger = MemoryLedger::new();
        ledger.set_last_epoch(7).unwrap();
        ledger.set_last_epoch(8).unwrap();
        assert_eq!(ledger.last_epoch().unwrap(), Some(8));
    }
}
