//! Environment-backed configuration for the payout tool.
//!
//! Configuration comes from environment variables, with an optional
//! `.env` file loaded first through `dotenvy`. Required settings fail
//! fast in `validate()` before any remote call is made.
//!
//! Variables:
//! - `POOL_ADDRESS` (required): the pool's address on chain.
//! - `API_BASE_URL`: indexer REST base, default `https://api.idena.io/api`.
//! - `LEDGER_PATH`: directory for the local stake ledger, default `./data`.
//! - `PAYOUT_POLICY`: `reward` (default) or `stake-delta`.
//! - `COMMISSION_RATE`: optional override of the policy's commission.
//! - `TELEGRAM_BOT_TOKEN` / `TELEGRAM_CHAT_ID`: optional chat delivery.

use std::env;
use std::fmt;

const DEFAULT_API_BASE: &str = "https://api.idena.io/api";
const DEFAULT_LEDGER_PATH: &str = "./data";

/// Which payout calculation the `payout` command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    /// Mining + validation reward based payout (bot-driven cycle).
    Reward,
    /// Stake delta based payout with replenish detection.
    StakeDelta,
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyKind::Reward => write!(f, "reward"),
            PolicyKind::StakeDelta => write!(f, "stake-delta"),
        }
    }
}

/// Optional Telegram delivery settings. Both fields must be present
/// for the channel to be enabled.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

/// Tool configuration parsed from the environment.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Pool address on chain.
    pub pool_address: String,
    /// Indexer REST API base URL, no trailing slash.
    pub api_base: String,
    /// Directory holding the local stake ledger file.
    pub ledger_path: String,
    /// Payout policy selected for the `payout` command.
    pub policy: PolicyKind,
    /// Commission override. `None` means the policy default applies.
    pub commission_rate: Option<f64>,
    /// Chat delivery, if configured.
    pub telegram: Option<TelegramConfig>,
}

impl PoolConfig {
    /// Reads configuration from environment variables.
    ///
    /// Call [`load_env_file`] first so a local `.env` is honored.
    pub fn from_env() -> Result<Self, String> {
        let pool_address = env::var("POOL_ADDRESS").unwrap_or_default();

        let api_base = env::var("API_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let api_base = api_base.trim_end_matches('/').to_string();

        let ledger_path = env::var("LEDGER_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LEDGER_PATH.to_string());

        let policy = match env::var("PAYOUT_POLICY").ok().as_deref() {
            None | Some("") | Some("reward") => PolicyKind::Reward,
            Some("stake-delta") => PolicyKind::StakeDelta,
            Some(other) => {
                return Err(format!(
                    "PAYOUT_POLICY must be 'reward' or 'stake-delta', got '{}'",
                    other
                ))
            }
        };

        let commission_rate = match env::var("COMMISSION_RATE") {
            Ok(v) if !v.trim().is_empty() => match v.trim().parse::<f64>() {
                Ok(r) => Some(r),
                Err(_) => return Err(format!("COMMISSION_RATE is not a number: '{}'", v)),
            },
            _ => None,
        };

        let telegram = match (env::var("TELEGRAM_BOT_TOKEN"), env::var("TELEGRAM_CHAT_ID")) {
            (Ok(bot_token), Ok(chat_id))
                if !bot_token.trim().is_empty() && !chat_id.trim().is_empty() =>
            {
                Some(TelegramConfig { bot_token, chat_id })
            }
            _ => None,
        };

        let config = PoolConfig {
            pool_address,
            api_base,
            ledger_path,
            policy,
            commission_rate,
            telegram,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates required settings. Returns a human-readable message
    /// suitable for printing before exit.
    pub fn validate(&self) -> Result<(), String> {
        if self.pool_address.trim().is_empty() {
            return Err(
                "POOL_ADDRESS is not set; add it to .env (see .env.example)".to_string(),
            );
        }
        if self.ledger_path.trim().is_empty() {
            return Err("LEDGER_PATH must not be empty".to_string());
        }
        if let Some(rate) = self.commission_rate {
            if !(0.0..=1.0).contains(&rate) {
                return Err(format!(
                    "COMMISSION_RATE must be within [0, 1], got {}",
                    rate
                ));
            }
        }
        Ok(())
    }
}

/// Loads a `.env` file if one exists. Missing file is fine; other
/// errors are reported to stderr since tracing is not initialized yet.
pub fn load_env_file() {
    let env_file = env::var("POOL_ENV_FILE").unwrap_or_else(|_| ".env".to_string());
    match dotenvy::from_filename(&env_file) {
        Ok(_) => {}
        Err(dotenvy::Error::Io(ref e)) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => eprintln!("warning: could not load {}: {}", env_file, e),
    }
}
