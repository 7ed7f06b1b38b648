//! Reverse proxy adapter (§4.1.3): writes a per-site Caddy config, validates
//! the global config, and reloads the service. A failed validation reverts
//! the newly written file from a pre-write backup.
//!
//! Writes are serialized by a per-file lock (§5 "Shared resources") so two
//! deployments touching the same site file never interleave.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::adapters::local_exec::LocalExecutor;
use crate::error::OrchestratorError;

#[derive(Clone)]
pub struct ReverseProxyAdapter {
    sites_dir: PathBuf,
    executor: LocalExecutor,
    file_locks: Arc<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>>,
}

impl ReverseProxyAdapter {
    pub fn new(sites_dir: impl Into<PathBuf>, executor: LocalExecutor) -> Self {
        Self {
            sites_dir: sites_dir.into(),
            executor,
            file_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn site_path(&self, fqdn: &str) -> PathBuf {
        self.sites_dir.join(format!("{fqdn}.caddy"))
    }

    async fn lock_for(&self, path: &PathBuf) -> Arc<Mutex<()>> {
        let mut locks = self.file_locks.lock().await;
        locks
            .entry(path.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Publishes (or updates) the reverse-proxy site file for `fqdn`, pointing
    /// at `upstream` (e.g. `127.0.0.1:3000`). Reverts on validation failure.
    pub async fn publish_site(&self, fqdn: &str, upstream: &str) -> Result<(), OrchestratorError> {
        let path = self.site_path(fqdn);
        let lock = self.lock_for(&path).await;
        let _guard = lock.lock().await;

        let backup = self.executor.read_file(&path).await.ok();
        let site_config = render_site_config(fqdn, upstream);

        self.executor.write_file(&path, &site_config).await?;

        if let Err(e) = self.validate_and_reload().await {
            tracing::warn!(fqdn, error = %e, "proxy validation failed, reverting site file");
            match backup {
                Some(previous) => {
                    self.executor.write_file(&path, &previous).await?;
                }
                None => {
                    self.executor.remove_file(&path).await?;
                }
            }
            return Err(e);
        }
        Ok(())
    }

    pub async fn remove_site(&self, fqdn: &str) -> Result<(), OrchestratorError> {
        let path = self.site_path(fqdn);
        let lock = self.lock_for(&path).await;
        let _guard = lock.lock().await;

        self.executor.remove_file(&path).await?;
        // Best-effort; teardown treats proxy cleanup like DNS cleanup (non-fatal).
        let _ = self.validate_and_reload().await;
        Ok(())
    }

    async fn validate_and_reload(&self) -> Result<(), OrchestratorError> {
        let validated = self
            .executor
            .run_command("caddy", &["validate", "--config", "/etc/caddy/Caddyfile"])
            .await?;
        if !validated.success {
            return Err(OrchestratorError::Validation(format!(
                "caddy validate failed: {}",
                validated.stderr
            )));
        }

        let reloaded = self
            .executor
            .run_command("systemctl", &["reload", "caddy"])
            .await?;
        if !reloaded.success {
            return Err(OrchestratorError::BackendUnavailable(format!(
                "systemctl reload caddy failed: {}",
                reloaded.stderr
            )));
        }
        Ok(())
    }
}

fn render_site_config(fqdn: &str, upstream: &str) -> String {
    format!(
        "{fqdn} {{\n    reverse_proxy {upstream}\n    encode gzip\n    tls internal\n}}\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_minimal_reverse_proxy_block() {
        let cfg = render_site_config("demo-a.example.com", "127.0.0.1:3000");
        assert!(cfg.starts_with("demo-a.example.com {"));
        assert!(cfg.contains("reverse_proxy 127.0.0.1:3000"));
    }
}
