//! Local executor (§4.1.4): host-side command execution and health checks
//! for the reverse-proxy adapter, with a hard path allowlist.
//!
//! Writes are permitted only under a fixed set of prefixes; `..` and
//! absolute paths outside the allowlist are rejected before any filesystem
//! syscall (§8 invariant 7).

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;

use crate::error::OrchestratorError;

#[derive(Clone)]
pub struct LocalExecutor {
    allowed_prefixes: Vec<PathBuf>,
    http: reqwest::Client,
}

impl LocalExecutor {
    pub fn new(allowed_prefixes: Vec<PathBuf>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .expect("failed to build health-check http client");
        Self {
            allowed_prefixes,
            http,
        }
    }

    /// Rejects `..` components and any path that doesn't resolve under one of
    /// the configured prefixes. Purely lexical: does not touch the filesystem,
    /// so a rejection never depends on what currently exists on disk.
    pub fn check_path_allowed(&self, path: &Path) -> Result<(), OrchestratorError> {
        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(OrchestratorError::Validation(format!(
                "path '{}' contains a parent-directory component",
                path.display()
            )));
        }
        if !path.is_absolute() {
            return Err(OrchestratorError::Validation(format!(
                "path '{}' must be absolute",
                path.display()
            )));
        }
        let allowed = self
            .allowed_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix));
        if !allowed {
            return Err(OrchestratorError::Validation(format!(
                "path '{}' is outside the configured allowlist",
                path.display()
            )));
        }
        Ok(())
    }

    pub async fn write_file(&self, path: &Path, contents: &str) -> Result<(), OrchestratorError> {
        self.check_path_allowed(path)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| OrchestratorError::BackendUnavailable(e.to_string()))?;
        }
        tokio::fs::write(path, contents)
            .await
            .map_err(|e| OrchestratorError::BackendUnavailable(e.to_string()))
    }

    pub async fn read_file(&self, path: &Path) -> Result<String, OrchestratorError> {
        self.check_path_allowed(path)?;
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| OrchestratorError::BackendUnavailable(e.to_string()))
    }

    pub async fn remove_file(&self, path: &Path) -> Result<(), OrchestratorError> {
        self.check_path_allowed(path)?;
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(OrchestratorError::BackendUnavailable(e.to_string())),
        }
    }

    /// Runs a fixed binary with arguments (no shell interpolation, no `curl`/`psql`
    /// string composition — §9 design notes).
    pub async fn run_command(&self, program: &str, args: &[&str]) -> Result<CommandOutput, OrchestratorError> {
        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| OrchestratorError::BackendUnavailable(format!("failed to spawn {program}: {e}")))?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Native HTTP health check against `localhost:port/path` (no shelled-out `curl`).
    pub async fn health_check(&self, port: u16, path: &str) -> Result<bool, OrchestratorError> {
        let url = format!("http://localhost:{port}{path}");
        match self.http.get(url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(e) => {
                tracing::debug!(error = %e, port, path, "health check request failed");
                Ok(false)
            }
        }
    }
}

pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor() -> LocalExecutor {
        LocalExecutor::new(vec![PathBuf::from("/etc/caddy"), PathBuf::from("/tmp/deployctl")])
    }

    #[test]
    fn allows_path_under_prefix() {
        let exec = executor();
        assert!(exec.check_path_allowed(Path::new("/etc/caddy/sites/demo.conf")).is_ok());
    }

    #[test]
    fn rejects_path_outside_prefixes() {
        let exec = executor();
        assert!(exec.check_path_allowed(Path::new("/etc/passwd")).is_err());
    }

    #[test]
    fn rejects_parent_dir_traversal() {
        let exec = executor();
        assert!(
            exec.check_path_allowed(Path::new("/etc/caddy/../passwd"))
                .is_err()
        );
    }

    #[test]
    fn rejects_relative_paths() {
        let exec = executor();
        assert!(exec.check_path_allowed(Path::new("relative/site.conf")).is_err());
    }
}


