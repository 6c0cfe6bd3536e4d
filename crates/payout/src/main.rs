//! Operator entry point.
//!
//! Exit codes: 0 on success, 2 when the gate decided there is nothing
//! to do (already-processed epoch), 1 for every fault.

use std::process;

use tracing::{error, warn, Level};

use pool_common::config::{load_env_file, PoolConfig};
use pool_payout::ReconcileError;

mod cli;

#[tokio::main]
async fn main() {
    load_env_file();

    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let config = match PoolConfig::from_env() {
        Ok(config) => config,
        Err(msg) => {
            eprintln!("{}", msg);
            process::exit(1);
        }
    };

    let command = match cli::Command::parse(&args[1..]) {
        Ok(command) => command,
        Err(msg) => {
            eprintln!("{}\n\n{}", msg, cli::usage(&args[0]));
            process::exit(1);
        }
    };

    if let Err(e) = cli::run(command, &config).await {
        if matches!(
            e.downcast_ref::<ReconcileError>(),
            Some(ReconcileError::NothingToDo { .. })
        ) {
            warn!("{}", e);
            process::exit(2);
        }
        error!("{:#}", e);
        process::exit(1);
    }
}
