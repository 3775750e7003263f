//! Agent eval CLI
//!
//! Runs eval suites against an external agent command.
//!
//! # Commands
//!
//! - `agent-eval run` runs every enabled case under the configured test
//!   directory and exits non-zero unless all of them pass
//! - `agent-eval list` shows the cases that would run
//! - `agent-eval init` writes a starter config and an example case
//!
//! Set `RUST_LOG` to override the log filter.

mod args;
mod commands;
mod console;
mod router;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use args::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.is_verbose() { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let code = router::route(cli).await?;
    std::process::exit(code);
}
