//! Command parsing and dispatch for the operator binary.
//!
//! Commands:
//!
//! ```text
//! pool-payout init                 record current epoch as processed
//! pool-payout info                 pool summary
//! pool-payout delegators           delegators and their current stake
//! pool-payout log                  record delegator stakes locally
//! pool-payout payout [force] [commit]
//! pool-payout listTxs <address>    recent transactions for an address
//! pool-payout checkDB <address>    locally recorded stake for an address
//! ```

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use pool_common::config::{PolicyKind, PoolConfig};
use pool_ledger::{FileLedger, StakeLedger};
use pool_payout::{
    ConsoleNotifier, HttpRewardSource, Notifier, PayoutPolicy, PayoutReconciler, RewardSource,
    TelegramNotifier,
};

/// A parsed operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Init,
    Info,
    Delegators,
    Log,
    Payout { force: bool, commit: bool },
    ListTxs { address: String },
    CheckDb { address: String },
}

impl Command {
    /// Parses the arguments after the binary name.
    pub fn parse(args: &[String]) -> Result<Command, String> {
        let Some(command) = args.first() else {
            return Err("please provide a command".to_string());
        };
        match command.as_str() {
            "init" => Ok(Command::Init),
            "info" => Ok(Command::Info),
            "delegators" => Ok(Command::Delegators),
            "log" => Ok(Command::Log),
            "payout" => {
                let mut force = false;
                let mut commit = false;
                for flag in &args[1..] {
                    match flag.as_str() {
                        "force" => force = true,
                        "commit" => commit = true,
                        other => {
                            return Err(format!("unknown payout flag '{}'", other));
                        }
                    }
                }
                Ok(Command::Payout { force, commit })
            }
            "listTxs" => match args.get(1) {
                Some(address) => Ok(Command::ListTxs {
                    address: address.clone(),
                }),
                None => Err("listTxs requires an address".to_string()),
            },
            "checkDB" => match args.get(1) {
                Some(address) => Ok(Command::CheckDb {
                    address: address.clone(),
                }),
                None => Err("checkDB requires an address".to_string()),
            },
            other => Err(format!("unknown command '{}'", other)),
        }
    }
}

pub fn usage(bin: &str) -> String {
    format!(
        "Usage: {} <command>\n\
         \n\
         Commands:\n\
         \x20 init                 record the current epoch as processed (required before payout)\n\
         \x20 info                 show pool summary\n\
         \x20 delegators           list delegators and their current stake\n\
         \x20 log                  record delegator stakes in the local ledger\n\
         \x20 payout [force] [commit]\n\
         \x20                      run a payout cycle; 'force' ignores the epoch gate,\n\
         \x20                      'commit' persists new stake snapshots (stake-delta policy)\n\
         \x20 listTxs <address>    list recent transactions for an address\n\
         \x20 checkDB <address>    show the locally recorded stake for an address",
        bin
    )
}

fn build_policy(config: &PoolConfig) -> PayoutPolicy {
    match config.policy {
        PolicyKind::Reward => PayoutPolicy::RewardBased {
            commission_rate: config
                .commission_rate
                .unwrap_or(PayoutPolicy::DEFAULT_REWARD_COMMISSION),
        },
        PolicyKind::StakeDelta => PayoutPolicy::StakeDelta {
            commission_rate: config
                .commission_rate
                .unwrap_or(PayoutPolicy::DEFAULT_STAKE_DELTA_COMMISSION),
        },
    }
}

fn build_notifier(config: &PoolConfig) -> anyhow::Result<Arc<dyn Notifier>> {
    match &config.telegram {
        Some(telegram) => Ok(Arc::new(
            TelegramNotifier::new(telegram.bot_token.clone(), telegram.chat_id.clone())
                .context("building telegram notifier")?,
        )),
        None => Ok(Arc::new(ConsoleNotifier)),
    }
}

fn build_reconciler(
    config: &PoolConfig,
    source: HttpRewardSource,
) -> anyhow::Result<PayoutReconciler> {
    let ledger = FileLedger::open(&config.ledger_path)
        .with_context(|| format!("opening ledger at {}", config.ledger_path))?;
    Ok(PayoutReconciler::new(
        Arc::new(source),
        Arc::new(ledger),
        build_notifier(config)?,
        config.pool_address.clone(),
        build_policy(config),
    ))
}

/// Executes one command against the configured pool.
pub async fn run(command: Command, config: &PoolConfig) -> anyhow::Result<()> {
    let source =
        HttpRewardSource::new(config.api_base.clone()).context("building api client")?;

    match command {
        Command::Info => {
            let pool = source.pool(&config.pool_address).await?;
            println!(
                "Address: {}\nSize: {}\nTotal Stake: {}\nTotal Validated Stake: {}",
                pool.address, pool.size, pool.total_stake, pool.total_validated_stake
            );
        }

        Command::Delegators => {
            let delegators = source.pool_delegators(&config.pool_address).await?;
            println!("Delegators: {}", delegators.len());
            for delegator in &delegators {
                println!("\nAddress: {}\nStake: {}", delegator.address, delegator.stake);
            }
        }

        Command::ListTxs { address } => {
            let txs = source.txs_for_address(&address).await?;
            println!("Transactions for {}: {}", address, txs.len());
            for tx in &txs {
                println!(
                    "{}  {}  {}  amount {}",
                    tx.timestamp,
                    tx.tx_type,
                    tx.hash,
                    tx.amount.unwrap_or(0.0)
                );
            }
        }

        Command::CheckDb { address } => {
            let ledger = FileLedger::open(&config.ledger_path)
                .with_context(|| format!("opening ledger at {}", config.ledger_path))?;
            match ledger.delegator_stake(&address)? {
                Some(snapshot) => {
                    println!("{} has {} in the local ledger", address, snapshot.stake)
                }
                None => println!("{} is not recorded in the local ledger", address),
            }
        }

        Command::Init => {
            let reconciler = build_reconciler(config, source)?;
            let epoch = reconciler.init().await?;
            println!("Initialized: last processed epoch set to {}", epoch);
        }

        Command::Log => {
            let reconciler = build_reconciler(config, source)?;
            let count = reconciler.record_stakes().await?;
            println!("Delegator stake recorded ({} entries)", count);
        }

        Command::Payout { force, commit } => {
            let policy = config.policy;
            let reconciler = build_reconciler(config, source)?;
            let outcome = match policy {
                PolicyKind::Reward => reconciler.run_reward_cycle(force).await?,
                PolicyKind::StakeDelta => {
                    reconciler.run_stake_delta_cycle(force, commit).await?
                }
            };

            info!(
                "cycle complete: epoch {}, {} delegators, total payout {}",
                outcome.source_epoch,
                outcome.reports.len(),
                pool_common::amount::round2(outcome.total_payout())
            );
            if policy == PolicyKind::StakeDelta && !outcome.committed {
                println!("Stake snapshots not recorded; re-run with 'commit' to persist them");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_plain_commands() {
        assert_eq!(Command::parse(&args(&["init"])), Ok(Command::Init));
        assert_eq!(Command::parse(&args(&["info"])), Ok(Command::Info));
        assert_eq!(Command::parse(&args(&["log"])), Ok(Command::Log));
        assert_eq!(
            Command::parse(&args(&["delegators"])),
            Ok(Command::Delegators)
        );
    }

    #[test]
    fn parses_payout_flags_in_any_order() {
        assert_eq!(
            Command::parse(&args(&["payout"])),
            Ok(Command::Payout {
                force: false,
                commit: false
            })
        );
        assert_eq!(
            Command::parse(&args(&["payout", "force"])),
            Ok(Command::Payout {
                force: true,
                commit: false
            })
        );
        assert_eq!(
            Command::parse(&args(&["payout", "commit", "force"])),
            Ok(Command::Payout {
                force: true,
                commit: true
            })
        );
        assert!(Command::parse(&args(&["payout", "yes"])).is_err());
    }

    #[test]
    fn address_commands_require_an_address() {
        assert!(Command::parse(&args(&["listTxs"])).is_err());
        assert!(Command::parse(&args(&["checkDB"])).is_err());
        assert_eq!(
            Command::parse(&args(&["listTxs", "0xaa"])),
            Ok(Command::ListTxs {
                address: "0xaa".to_string()
            })
        );
    }

    #[test]
    fn unknown_and_missing_commands_fail() {
        assert!(Command::parse(&args(&[])).is_err());
        assert!(Command::parse(&args(&["frobnicate"])).is_err());
    }
}
