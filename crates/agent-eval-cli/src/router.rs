//! Command routing logic for CLI

use anyhow::Result;

use crate::args::{Cli, Commands};
use crate::commands;

/// Route CLI commands to their handlers and return the process exit code
pub async fn route(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Run {
            categories,
            tags,
            ids,
            verbose,
            format,
            output,
        } => {
            commands::run::execute(commands::run::RunArgs {
                config_file: cli.config,
                categories,
                tags,
                ids,
                verbose,
                format,
                output,
            })
            .await
        }
        Commands::List { categories, tags } => {
            commands::list::execute(&cli.config, &categories, &tags).await?;
            Ok(0)
        }
        Commands::Init { force } => {
            commands::init::execute(&cli.config, force).await?;
            Ok(0)
        }
    }
}
