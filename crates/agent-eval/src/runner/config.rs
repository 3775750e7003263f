//! Run configuration
//!
//! Every field has a default so partial config files are valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::hooks::HooksConfig;
use super::retry::RetryPolicy;
use crate::agent::AgentCommand;
use crate::error::{EvalError, EvalResult};
use crate::harness::HarnessConfig;

/// Configuration for eval runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    /// Directory holding case files
    #[serde(default = "default_test_dir")]
    pub test_dir: PathBuf,

    /// Default agent timeout per invocation, in milliseconds
    #[serde(default = "default_timeout_ms", alias = "timeout")]
    pub timeout_ms: u64,

    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry, in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Growth factor of the retry delay
    #[serde(default = "default_backoff_multiplier")]
    pub retry_backoff_multiplier: f64,

    /// Run cases in concurrent batches
    #[serde(default)]
    pub parallel: bool,

    /// Batch size when running in parallel
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Keep workspaces on disk after each case
    #[serde(default)]
    pub preserve_workspaces: bool,

    /// Template copied into each workspace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_template: Option<PathBuf>,

    #[serde(default)]
    pub verbose: bool,

    /// Where results are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Whether to save results after a run
    #[serde(default = "default_save_results")]
    pub save_results: bool,

    /// External agent command
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentCommand>,

    /// External rubric grader command
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grader: Option<AgentCommand>,

    /// Lifecycle command hooks
    #[serde(default, skip_serializing_if = "HooksConfig::is_empty")]
    pub hooks: HooksConfig,
}

fn default_test_dir() -> PathBuf {
    PathBuf::from("evals")
}

fn default_timeout_ms() -> u64 {
    300_000
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    1_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_concurrency() -> usize {
    4
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("eval-results")
}

fn default_save_results() -> bool {
    true
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            test_dir: default_test_dir(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            retry_backoff_multiplier: default_backoff_multiplier(),
            parallel: false,
            max_concurrency: default_max_concurrency(),
            preserve_workspaces: false,
            workspace_template: None,
            verbose: false,
            output_dir: default_output_dir(),
            save_results: default_save_results(),
            agent: None,
            grader: None,
            hooks: HooksConfig::default(),
        }
    }
}

impl RunConfig {
    /// Load from a `.json`, `.yaml`/`.yml` or `.toml` file
    pub fn load(path: impl AsRef<Path>) -> EvalResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            EvalError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();

        let parsed = match ext.as_str() {
            "json" => serde_json::from_str(&content).map_err(|e| e.to_string()),
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(|e| e.to_string()),
            "toml" => toml::from_str(&content).map_err(|e| e.to_string()),
            other => {
                return Err(EvalError::config(format!(
                    "Unsupported config format '{}' for {}",
                    other,
                    path.display()
                )));
            }
        };

        parsed.map_err(|e| EvalError::config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Set the test directory
    pub fn with_test_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.test_dir = dir.into();
        self
    }

    /// Set the default timeout
    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    /// Set retry count and schedule
    pub fn with_retries(mut self, max_retries: u32, delay_ms: u64, multiplier: f64) -> Self {
        self.max_retries = max_retries;
        self.retry_delay_ms = delay_ms;
        self.retry_backoff_multiplier = multiplier;
        self
    }

    /// Run in parallel batches of `max_concurrency`
    pub fn with_parallel(mut self, max_concurrency: usize) -> Self {
        self.parallel = true;
        self.max_concurrency = max_concurrency;
        self
    }

    /// Keep workspaces after each case
    pub fn with_preserve_workspaces(mut self, preserve: bool) -> Self {
        self.preserve_workspaces = preserve;
        self
    }

    /// Set the workspace template
    pub fn with_workspace_template(mut self, template: impl Into<PathBuf>) -> Self {
        self.workspace_template = Some(template.into());
        self
    }

    /// Set the output directory
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Enable or disable result saving
    pub fn with_save_results(mut self, save: bool) -> Self {
        self.save_results = save;
        self
    }

    /// Enable verbose mode
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Batch size, never below one
    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }

    /// Retry policy derived from this config
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            self.retry_delay_ms,
            self.retry_backoff_multiplier,
        )
    }

    /// Harness settings derived from this config
    pub fn harness_config(&self) -> HarnessConfig {
        HarnessConfig {
            default_timeout_ms: self.timeout_ms,
            preserve_workspaces: self.preserve_workspaces,
            workspace_template: self.workspace_template.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = RunConfig::default();
        assert_eq!(config.test_dir, PathBuf::from("evals"));
        assert_eq!(config.timeout_ms, 300_000);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.retry_delay_ms, 1_000);
        assert_eq!(config.retry_backoff_multiplier, 2.0);
        assert!(!config.parallel);
        assert_eq!(config.max_concurrency, 4);
        assert!(config.save_results);
    }

    #[test]
    fn test_config_builder() {
        let config = RunConfig::default()
            .with_timeout_ms(600)
            .with_parallel(0)
            .with_retries(1, 10, 3.0)
            .verbose();

        assert_eq!(config.timeout_ms, 600);
        assert!(config.parallel);
        assert_eq!(config.effective_concurrency(), 1);
        assert_eq!(config.retry_policy().max_attempts(), 2);
        assert!(config.verbose);
    }

    #[test]
    fn test_load_formats() {
        let dir = TempDir::new().unwrap();

        let yaml = dir.path().join("agent-eval.yaml");
        std::fs::write(
            &yaml,
            r#"
timeout: 1000
parallel: true
agent:
  command: python3
  args: [agent.py]
hooks:
  setup:
    command: ./seed.sh
"#,
        )
        .unwrap();
        let config = RunConfig::load(&yaml).unwrap();
        assert_eq!(config.timeout_ms, 1000);
        assert!(config.parallel);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.agent.unwrap().args, vec!["agent.py"]);
        assert_eq!(config.hooks.setup.unwrap().timeout_secs, 60);

        let json = dir.path().join("c.json");
        std::fs::write(&json, r#"{"maxRetries": 0, "testDir": "cases"}"#).unwrap();
        let config = RunConfig::load(&json).unwrap();
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.test_dir, PathBuf::from("cases"));

        let toml_path = dir.path().join("c.toml");
        std::fs::write(&toml_path, "maxConcurrency = 8\nsaveResults = false\n").unwrap();
        let config = RunConfig::load(&toml_path).unwrap();
        assert_eq!(config.max_concurrency, 8);
        assert!(!config.save_results);

        let ini = dir.path().join("c.ini");
        std::fs::write(&ini, "").unwrap();
        assert!(matches!(RunConfig::load(&ini), Err(EvalError::Config(_))));
    }
}
