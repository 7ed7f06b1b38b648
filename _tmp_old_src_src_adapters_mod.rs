//! Remote API adapters (§4.1) and the `Adapters` bundle that the pipeline
//! takes as an explicit constructor argument instead of reaching for ambient
//! singletons (§9 REDESIGN FLAGS).

pub mod dns;
pub mod local_exec;
pub mod paas;
pub mod proxy;

use std::path::PathBuf;

use crate::config::Config;
use dns::DnsAdapter;
use local_exec::LocalExecutor;
use paas::PaasAdapter;
use proxy::ReverseProxyAdapter;

/// Every backend dependency a pipeline run needs, constructed once at
/// startup and cloned into each request's pipeline driver.
#[derive(Clone)]
pub struct Adapters {
    pub paas: PaasAdapter,
    pub dns: DnsAdapter,
    pub proxy: ReverseProxyAdapter,
    pub local: LocalExecutor,
}

impl Adapters {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let paas = PaasAdapter::new(&config.paas_url, &config.paas_api_token, &config.server_uuid)?;
        let dns = DnsAdapter::new(&config.dns_url, &config.dns_api_key)?;

        let allowed_prefixes = vec![
            PathBuf::from(&config.proxy.sites_dir),
            PathBuf::from(&config.proxy.config_dir),
            PathBuf::from(&config.proxy.log_dir),
            PathBuf::from(&config.proxy.tmp_dir),
        ];
        let local = LocalExecutor::new(allowed_prefixes);
        let proxy = ReverseProxyAdapter::new(config.proxy.sites_dir.clone(), local.clone());

        Ok(Self {
            paas,
            dns,
            proxy,
            local,
        })
    }
}


