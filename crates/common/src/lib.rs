//! Shared pieces for the pool payout tool.
//!
//! ## Modules
//! - `config`: environment-backed configuration
//! - `amount`: serde helpers for API amounts (number-or-string)

pub mod amount;
pub mod config;

pub use config::{PolicyKind, PoolConfig, TelegramConfig};
