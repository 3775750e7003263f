//! Isolated workspaces for eval cases
//!
//! Every case runs in its own directory under the manager's base directory.
//! The manager is the only component that creates or deletes them.

mod template;

pub use template::InstallCommand;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{EvalError, EvalResult};

const CLEANUP_ATTEMPTS: u32 = 3;
const CLEANUP_PAUSE_MS: u64 = 100;

/// A provisioned workspace directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: String,
    pub created_at: DateTime<Utc>,
    /// Absolute path
    pub path: PathBuf,
}

/// Creates, tracks and removes workspaces
pub struct WorkspaceManager {
    base_dir: PathBuf,
    install: Option<InstallCommand>,
    active: Mutex<HashMap<String, Workspace>>,
}

impl WorkspaceManager {
    /// Manager rooted at `./eval-results/workspaces`, or the system temp
    /// directory when that is not writable
    pub fn new() -> Self {
        Self::with_base_dir(Self::resolve_base_dir())
    }

    /// Manager rooted at an explicit directory
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            install: Some(InstallCommand::default()),
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the dependency install step; `None` disables it
    pub fn with_install(mut self, install: Option<InstallCommand>) -> Self {
        self.install = install;
        self
    }

    fn resolve_base_dir() -> PathBuf {
        let preferred = PathBuf::from("eval-results").join("workspaces");
        if Self::is_writable(&preferred) {
            return std::path::absolute(&preferred).unwrap_or(preferred);
        }

        let fallback = std::env::temp_dir().join("agent-eval-workspaces");
        tracing::warn!(
            preferred = %preferred.display(),
            fallback = %fallback.display(),
            "Workspace directory not writable, using temp directory"
        );
        fallback
    }

    fn is_writable(dir: &Path) -> bool {
        if std::fs::create_dir_all(dir).is_err() {
            return false;
        }
        let marker = dir.join(format!(".write-check-{}", uuid::Uuid::new_v4()));
        let ok = std::fs::write(&marker, b"").is_ok();
        let _ = std::fs::remove_file(&marker);
        ok
    }

    /// Base directory holding all workspaces
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Create a workspace, optionally seeded from a template
    ///
    /// Without a template the directory is left empty. Template or install
    /// failures degrade to a minimal workspace; only a failure to create even
    /// that is an error.
    pub async fn create_workspace(&self, template: Option<&Path>) -> EvalResult<Workspace> {
        let id = uuid::Uuid::new_v4().to_string();
        let path = self.base_dir.join(format!("ws-{}", id));

        fs::create_dir_all(&path).await.map_err(|e| {
            EvalError::workspace(format!("Failed to create {}: {}", path.display(), e))
        })?;
        let path = fs::canonicalize(&path).await.unwrap_or(path);

        if let Some(template) = template {
            if let Err(e) = template::provision(template, &path, self.install.as_ref()).await {
                tracing::warn!(
                    workspace_id = %id,
                    error = %e,
                    "Template provisioning failed, using minimal workspace"
                );
                template::write_minimal(&path).await.map_err(|e| {
                    EvalError::workspace(format!("Failed to create minimal workspace: {:#}", e))
                })?;
            }
        }

        let workspace = Workspace {
            id: id.clone(),
            created_at: Utc::now(),
            path,
        };

        self.active.lock().insert(id, workspace.clone());
        tracing::debug!(workspace_id = %workspace.id, path = %workspace.path.display(), "Created workspace");

        Ok(workspace)
    }

    /// Remove a workspace; never fails
    ///
    /// Returns whether the directory is gone. The table entry is dropped
    /// either way.
    pub async fn cleanup_workspace(&self, id: &str) -> bool {
        let Some(workspace) = self.active.lock().remove(id) else {
            tracing::debug!(workspace_id = %id, "Cleanup of unknown workspace");
            return true;
        };

        for attempt in 1..=CLEANUP_ATTEMPTS {
            match fs::remove_dir_all(&workspace.path).await {
                Ok(()) => return true,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return true,
                Err(e) => {
                    tracing::debug!(
                        workspace_id = %id,
                        attempt,
                        error = %e,
                        "Workspace removal failed"
                    );
                    if attempt < CLEANUP_ATTEMPTS {
                        tokio::time::sleep(Duration::from_millis(CLEANUP_PAUSE_MS * attempt as u64))
                            .await;
                    }
                }
            }
        }

        tracing::warn!(
            workspace_id = %id,
            path = %workspace.path.display(),
            "Failed to remove workspace"
        );
        false
    }

    /// Remove every tracked workspace
    pub async fn cleanup_all(&self) {
        let ids: Vec<String> = self.active.lock().keys().cloned().collect();
        for id in ids {
            self.cleanup_workspace(&id).await;
        }
    }

    /// Number of workspaces created and not yet cleaned up
    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    /// Look up a tracked workspace
    pub fn get(&self, id: &str) -> Option<Workspace> {
        self.active.lock().get(id).cloned()
    }
}

impl Default for WorkspaceManager {
    fn default() -> Self {
        Self::new()
    }
}
