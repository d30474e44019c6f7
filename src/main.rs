//! netranger binary entry point.

use anyhow::Context;
use clap::Parser;
use netranger::cli::Cli;
use netranger::error::{exit_code, RunError};
use netranger::output;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(&cli) {
        output::print_warning(&format!("{:#}", e));
    }

    match run(&cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            let code = e
                .downcast_ref::<RunError>()
                .map_or(exit_code::FAILURE, RunError::exit_code);
            ExitCode::from(code)
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<u8> {
    let code = cli
        .run()
        .await
        .with_context(|| format!("sweep of {} failed", cli.scan.range))?;
    Ok(code)
}

/// Log to stderr so stdout carries only the host stream. `RUST_LOG` wins
/// over the verbosity flags.
fn init_tracing(cli: &Cli) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(cli.log_filter()).context("invalid log filter")?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {}", e))
}
