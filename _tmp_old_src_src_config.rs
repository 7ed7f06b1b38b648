use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment};
use secrecy::SecretString;
use serde::Deserialize;

/// Process-wide configuration, loaded once at startup and never mutated
/// (§5 "Shared resources": tokens and clients are process-wide immutables).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// IPv4 of the app server; used as DNS A-record content.
    pub server_ip: String,
    /// PaaS's identifier for the target host, threaded into every create call.
    pub server_uuid: String,

    pub paas_url: String,
    pub paas_api_token: SecretString,

    pub dns_url: String,
    pub dns_api_key: SecretString,

    /// Zone used for auto-generated subdomains.
    pub base_domain: String,

    /// Fallback git repository when the client omits `gitRepository`.
    pub default_git_repo: String,

    /// Shared bearer token required on every `/api/*` call (§4.4 ambient auth).
    pub api_token: SecretString,

    #[serde(default = "default_wait_ready_budget_secs")]
    pub wait_ready_budget_secs: u64,

    #[serde(default)]
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_proxy_sites_dir")]
    pub sites_dir: String,
    #[serde(default = "default_proxy_config_dir")]
    pub config_dir: String,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_tmp_dir")]
    pub tmp_dir: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            sites_dir: default_proxy_sites_dir(),
            config_dir: default_proxy_config_dir(),
            log_dir: default_log_dir(),
            tmp_dir: default_tmp_dir(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_wait_ready_budget_secs() -> u64 {
    480
}

fn default_proxy_sites_dir() -> String {
    "/etc/caddy/sites".to_string()
}

fn default_proxy_config_dir() -> String {
    "/etc/caddy".to_string()
}

fn default_log_dir() -> String {
    "/var/log/deployctl".to_string()
}

fn default_tmp_dir() -> String {
    "/tmp/deployctl".to_string()
}

impl Config {
    pub fn load() -> Result<Self> {
        #[cfg(debug_assertions)]
        let _ = dotenvy::from_filename(".env.local");

        let raw = ConfigBuilder::builder()
            .add_source(Environment::default().separator("__"))
            .build()
            .context("failed to build configuration")?;

        raw.try_deserialize()
            .context("failed to deserialize configuration")
    }
}


