#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

use std::process;

mod command;
mod config;

use crate::config::Cli;

/// Tracing target for startup events.
pub const TRACING_TARGET_STARTUP: &str = "docr_cli::startup";

/// Tracing target for configuration events.
pub const TRACING_TARGET_CONFIG: &str = "docr_cli::config";

/// Tracing target for command events.
pub const TRACING_TARGET_COMMAND: &str = "docr_cli::command";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        if tracing::dispatcher::has_been_set() {
            tracing::error!(
                target: TRACING_TARGET_STARTUP,
                error = %error,
                "Command failed"
            );
        } else {
            eprintln!("Error: {error:#}");
        }

        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();
    cli.log.init_tracing();
    cli.validate()?;
    cli.log();

    command::dispatch(cli).await
}
