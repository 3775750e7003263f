//! `agent-eval init`

use std::path::Path;

use anyhow::{Context, Result};

use crate::console::CliConsole;

const STARTER_CONFIG: &str = r#"# Directory holding eval case files
testDir: evals

# Agent invoked once per prompt. It receives a JSON request on stdin and
# prints a JSON result on its last stdout line.
agent:
  command: ./my-agent
  args: []

timeout: 300000
maxRetries: 2
retryDelayMs: 1000
retryBackoffMultiplier: 2.0
parallel: false
maxConcurrency: 4
preserveWorkspaces: false
outputDir: eval-results
saveResults: true
"#;

const EXAMPLE_CASE: &str = r#"id: hello-world
name: Says hello
description: The agent greets the user
category: basic
prompt: Say hello to the world.
expectedPatterns:
  - "(?i)hello"
judges:
  - pattern-match
tags:
  - smoke
"#;

/// Write a starter config and an example case
pub async fn execute(config_file: &Path, force: bool) -> Result<()> {
    let console = CliConsole::new(true);

    write_file(&console, config_file, STARTER_CONFIG, force).await?;

    let case_path = config_file
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join("evals")
        .join("basic")
        .join("hello-world.yaml");
    write_file(&console, &case_path, EXAMPLE_CASE, force).await?;

    console.success("Initialized agent-eval. Edit the `agent` section, then run `agent-eval run`.");
    Ok(())
}

async fn write_file(console: &CliConsole, path: &Path, content: &str, force: bool) -> Result<()> {
    if path.exists() && !force {
        console.warn(&format!("{} already exists, skipping (use --force to overwrite)", path.display()));
        return Ok(());
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    console.info(&format!("Wrote {}", path.display()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_eval::RunConfig;
    use agent_eval::cases::load_cases_from_yaml;
    use tempfile::TempDir;

    #[test]
    fn test_templates_parse() {
        let config: RunConfig = serde_yaml::from_str(STARTER_CONFIG).unwrap();
        assert_eq!(config.agent.unwrap().command, "./my-agent");
        assert_eq!(config.timeout_ms, 300_000);

        let cases = load_cases_from_yaml(EXAMPLE_CASE).unwrap();
        assert_eq!(cases.len(), 1);
        assert!(cases[0].validate().is_ok());
    }

    #[tokio::test]
    async fn test_init_respects_force() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("agent-eval.yaml");
        std::fs::write(&config_path, "custom: true\n").unwrap();

        execute(&config_path, false).await.unwrap();
        assert_eq!(std::fs::read_to_string(&config_path).unwrap(), "custom: true\n");
        assert!(dir.path().join("evals/basic/hello-world.yaml").exists());

        execute(&config_path, true).await.unwrap();
        assert!(std::fs::read_to_string(&config_path).unwrap().contains("testDir"));
    }
}
