//! CLI argument definitions using clap
//!
//! - agent-eval run              # Run the suite
//! - agent-eval list             # List cases
//! - agent-eval init             # Scaffold a config and an example case

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default configuration file name used across all CLI commands.
pub const DEFAULT_CONFIG_FILE: &str = "agent-eval.yaml";

#[derive(Parser)]
#[command(name = "agent-eval")]
#[command(about = "Run eval suites against an AI agent")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE, env = "AGENT_EVAL_CONFIG")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Whether the selected command asked for verbose output
    pub fn is_verbose(&self) -> bool {
        matches!(self.command, Commands::Run { verbose: true, .. })
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run eval cases and print a report
    Run {
        /// Only run these categories (repeatable)
        #[arg(long = "category", short = 'c')]
        categories: Vec<String>,

        /// Only run cases carrying any of these tags (repeatable)
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,

        /// Only run these case ids (repeatable)
        #[arg(long = "id")]
        ids: Vec<String>,

        /// Enable verbose output
        #[arg(long, short)]
        verbose: bool,

        /// Report format: table, json or markdown
        #[arg(long, short, default_value = "table")]
        format: String,

        /// Directory for saved results (overrides config)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// List eval cases
    List {
        /// Only list these categories (repeatable)
        #[arg(long = "category", short = 'c')]
        categories: Vec<String>,

        /// Only list cases carrying any of these tags (repeatable)
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,
    },

    /// Create a starter config and example case
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from([
            "agent-eval",
            "run",
            "--category",
            "tool",
            "-c",
            "routing",
            "--tag",
            "smoke",
            "--verbose",
        ]);
        assert!(cli.is_verbose());
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
        match cli.command {
            Commands::Run {
                categories, tags, ..
            } => {
                assert_eq!(categories, vec!["tool", "routing"]);
                assert_eq!(tags, vec!["smoke"]);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["agent-eval", "list", "--config", "ci.toml"]);
        assert_eq!(cli.config, PathBuf::from("ci.toml"));
        assert!(!cli.is_verbose());
    }
}
