//! Error types for the evaluation engine

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for evaluation operations
pub type EvalResult<T> = Result<T, EvalError>;

/// Main error type for the evaluation engine
#[derive(Error, Debug)]
pub enum EvalError {
    /// The agent did not return within the resolved timeout
    #[error("Agent timed out after {ms} ms")]
    Timeout { ms: u64 },

    /// The agent function itself failed
    #[error("Agent error: {0}")]
    Agent(String),

    /// A judge failed while scoring
    #[error("Judge '{judge_id}' failed: {message}")]
    Judge { judge_id: String, message: String },

    /// Workspace could not be provisioned at all
    #[error("Workspace error: {0}")]
    Workspace(String),

    /// A lifecycle hook failed
    #[error("{phase} hook failed: {message}")]
    Hook { phase: String, message: String },

    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A case file could not be read or parsed
    #[error("Failed to load eval case from {}: {message}", path.display())]
    CaseLoad { path: PathBuf, message: String },

    /// A case definition violates an invariant
    #[error("Invalid eval case '{id}': {message}")]
    InvalidCase { id: String, message: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl EvalError {
    /// Create a new agent error
    pub fn agent(message: impl Into<String>) -> Self {
        Self::Agent(message.into())
    }

    /// Create a new judge error
    pub fn judge(judge_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Judge {
            judge_id: judge_id.into(),
            message: message.into(),
        }
    }

    /// Create a new workspace error
    pub fn workspace(message: impl Into<String>) -> Self {
        Self::Workspace(message.into())
    }

    /// Create a new hook error
    pub fn hook(phase: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Hook {
            phase: phase.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a new invalid case error
    pub fn invalid_case(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidCase {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Whether this error is an agent timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message() {
        let err = EvalError::Timeout { ms: 250 };
        assert_eq!(err.to_string(), "Agent timed out after 250 ms");
        assert!(err.is_timeout());
    }

    #[test]
    fn test_hook_message() {
        let err = EvalError::hook("setup", "exit code 2");
        assert_eq!(err.to_string(), "setup hook failed: exit code 2");
        assert!(!err.is_timeout());
    }
}
