//! Template provisioning for workspaces
//!
//! Copies a project template into a fresh workspace, installs its
//! dependencies, and falls back to a minimal project when either step fails.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::fs;
use tokio::process::Command;
use walkdir::WalkDir;

/// Directories never copied from a template
const SKIPPED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    "target",
    "coverage",
    ".next",
    ".turbo",
    ".cache",
];

/// Lockfiles never copied from a template
const SKIPPED_FILES: &[&str] = &["package-lock.json", "yarn.lock", "pnpm-lock.yaml", "bun.lockb"];

const MINIMAL_PACKAGE_JSON: &str = r#"{
  "name": "eval-workspace",
  "version": "0.0.0",
  "private": true,
  "type": "module"
}
"#;

/// Dependency install step run after a template copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallCommand {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl Default for InstallCommand {
    fn default() -> Self {
        Self {
            program: "npm".to_string(),
            args: vec![
                "install".to_string(),
                "--no-audit".to_string(),
                "--no-fund".to_string(),
            ],
            timeout: Duration::from_secs(300),
        }
    }
}

impl InstallCommand {
    /// Run the install inside `dir`
    pub async fn run(&self, dir: &Path) -> Result<()> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn {}", self.program))?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output.context("Failed to wait for install")?,
            Err(_) => bail!(
                "{} timed out after {} s",
                self.program,
                self.timeout.as_secs()
            ),
        };

        if !output.status.success() {
            bail!(
                "{} exited with {:?}: {}",
                self.program,
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(())
    }
}

fn is_skipped(name: &str, is_dir: bool) -> bool {
    if is_dir {
        SKIPPED_DIRS.contains(&name)
    } else {
        SKIPPED_FILES.contains(&name)
    }
}

/// Recursively copy `template` into `dest`, skipping build output and lockfiles
pub async fn copy_template(template: &Path, dest: &Path) -> Result<u64> {
    if !template.is_dir() {
        bail!("Template {:?} is not a directory", template);
    }

    let mut copied = 0;
    let walker = WalkDir::new(template)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| {
            !is_skipped(
                &e.file_name().to_string_lossy(),
                e.file_type().is_dir(),
            )
        });

    for entry in walker {
        let entry = entry.context("Failed to walk template")?;
        let relative = entry
            .path()
            .strip_prefix(template)
            .context("Template entry outside template root")?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .await
                .with_context(|| format!("Failed to create directory: {:?}", target))?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::copy(entry.path(), &target)
                .await
                .with_context(|| format!("Failed to copy {:?}", entry.path()))?;
            copied += 1;
        }
    }

    Ok(copied)
}

/// Empty `dir` and write the minimal project into it
pub async fn write_minimal(dir: &Path) -> Result<()> {
    if fs::try_exists(dir).await.unwrap_or(false) {
        fs::remove_dir_all(dir)
            .await
            .with_context(|| format!("Failed to clear {:?}", dir))?;
    }
    fs::create_dir_all(dir.join("src"))
        .await
        .with_context(|| format!("Failed to create {:?}", dir))?;
    fs::write(dir.join("package.json"), MINIMAL_PACKAGE_JSON)
        .await
        .context("Failed to write package.json")?;
    Ok(())
}

/// Copy the template and install its dependencies
pub async fn provision(template: &Path, dest: &Path, install: Option<&InstallCommand>) -> Result<()> {
    let copied = copy_template(template, dest).await?;
    tracing::debug!(files = copied, dest = %dest.display(), "Copied workspace template");

    if let Some(install) = install {
        if dest.join("package.json").is_file() {
            tracing::debug!(dest = %dest.display(), "Installing template dependencies");
            install.run(dest).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_copy_skips_build_output_and_lockfiles() {
        let template = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();

        write(template.path(), "src/index.ts", "export {}");
        write(template.path(), "README.md", "# t");
        write(template.path(), "node_modules/x/index.js", "");
        write(template.path(), ".git/HEAD", "ref");
        write(template.path(), "target/debug/out", "");
        write(template.path(), "yarn.lock", "");
        write(template.path(), "package-lock.json", "{}");

        let copied = copy_template(template.path(), dest.path()).await.unwrap();
        assert_eq!(copied, 2);
        assert!(dest.path().join("src/index.ts").exists());
        assert!(!dest.path().join("node_modules").exists());
        assert!(!dest.path().join(".git").exists());
        assert!(!dest.path().join("target").exists());
        assert!(!dest.path().join("yarn.lock").exists());
        assert!(!dest.path().join("package-lock.json").exists());
    }

    #[tokio::test]
    async fn test_missing_template_errors() {
        let dest = TempDir::new().unwrap();
        assert!(copy_template(Path::new("/no/such/template"), dest.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_write_minimal_replaces_contents() {
        let dir = TempDir::new().unwrap();
        let ws = dir.path().join("ws");
        write(&ws, "leftover.txt", "x");

        write_minimal(&ws).await.unwrap();
        assert!(ws.join("src").is_dir());
        assert!(ws.join("package.json").is_file());
        assert!(!ws.join("leftover.txt").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_install_is_reported() {
        let template = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        write(template.path(), "package.json", "{}");

        let install = InstallCommand {
            program: "sh".into(),
            args: vec!["-c".into(), "exit 1".into()],
            timeout: Duration::from_secs(5),
        };
        assert!(provision(template.path(), dest.path(), Some(&install)).await.is_err());
    }
}
