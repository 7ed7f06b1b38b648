//! The deployment pipeline (§4.3): a fixed nine-step sequence driven by one
//! function that owns `stepLog` and `results` so ordering is guaranteed from
//! a single call site (REDESIGN FLAGS: driver-owned `stepLog`).

mod teardown;
mod wait_ready;

pub use teardown::{TeardownReport, teardown_project};

use crate::adapters::Adapters;
use crate::adapters::paas::ApplicationSpec;
use crate::config::Config;
use crate::credentials::Credentials;
use crate::model::{
    DatabaseResult, DeploymentContext, EnvVarEntry, RealizedApplication, RealizedDatabase,
    RealizedDomain, RealizedProject, StepLogEntry, StepStatus,
};
use crate::validation::validate_spec;

/// What a step hands back to the driver instead of throwing (REDESIGN FLAGS).
pub enum StepOutcome {
    Completed { details: String },
    Warning { details: String, error: String },
    Failed { details: String, error: String },
    /// WAIT_READY budget exhaustion only (§4.3): logs as `failed` with
    /// `timeout: true`, but the driver treats it as a soft (PARTIAL) outcome.
    TimedOut { details: String, error: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Succeeded,
    Partial,
    Failed,
}

pub struct PipelineResult {
    pub state: PipelineState,
    pub last_error: Option<String>,
}

/// Drives one deployment request from VALIDATE through WAIT_READY.
pub struct DeploymentPipeline<'a> {
    adapters: &'a Adapters,
    config: &'a Config,
}

impl<'a> DeploymentPipeline<'a> {
    pub fn new(adapters: &'a Adapters, config: &'a Config) -> Self {
        Self { adapters, config }
    }

    /// Appends the `starting` entry, runs `step`, appends its terminal entry,
    /// and folds the outcome into `soft_warning`/`hard_failure` as directed by
    /// the caller (only the driver ever pushes to `ctx.step_log`).
    async fn run_step<F, Fut>(
        &self,
        ctx: &mut DeploymentContext,
        name: &str,
        step: F,
    ) -> StepOutcome
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = StepOutcome>,
    {
        ctx.step_log.push(StepLogEntry {
            step: name.to_string(),
            status: StepStatus::Starting,
            details: None,
            error: None,
            timeout: None,
        });
        let outcome = step().await;
        let entry = match &outcome {
            StepOutcome::Completed { details } => StepLogEntry {
                step: name.to_string(),
                status: StepStatus::Completed,
                details: Some(details.clone()),
                error: None,
                timeout: None,
            },
            StepOutcome::Warning { details, error } => StepLogEntry {
                step: name.to_string(),
                status: StepStatus::Warning,
                details: Some(details.clone()),
                error: Some(error.clone()),
                timeout: None,
            },
            StepOutcome::Failed { details, error } => StepLogEntry {
                step: name.to_string(),
                status: StepStatus::Failed,
                details: Some(details.clone()),
                error: Some(error.clone()),
                timeout: None,
            },
            StepOutcome::TimedOut { details, error } => StepLogEntry {
                step: name.to_string(),
                status: StepStatus::Failed,
                details: Some(details.clone()),
                error: Some(error.clone()),
                timeout: Some(true),
            },
        };
        ctx.step_log.push(entry);
        outcome
    }

    /// Runs VALIDATE..WAIT_READY in order. Returns once a hard step fails or
    /// every step has reported in.
    pub async fn run(&self, ctx: &mut DeploymentContext) -> PipelineResult {
        let mut last_error: Option<String> = None;
        let mut any_soft_warning = false;

        // 1. VALIDATE — pure, local, no stepLog entry of its own kind beyond completed/failed.
        let validate_outcome = self
            .run_step(ctx, "VALIDATE", || async {
                match validate_spec(&ctx.spec) {
                    Ok(()) => StepOutcome::Completed {
                        details: "deployment spec is valid".to_string(),
                    },
                    Err(e) => StepOutcome::Failed {
                        details: "deployment spec rejected".to_string(),
                        error: e.to_string(),
                    },
                }
            })
            .await;
        if let StepOutcome::Failed { error, .. } = validate_outcome {
            return PipelineResult {
                state: PipelineState::Failed,
                last_error: Some(error),
            };
        }

        // 2. DNS — skippable when customDomain is set (the app keeps its own domain).
        let skip_dns = ctx.spec.custom_domain.as_deref().is_some_and(|d| !d.is_empty())
            || !ctx.spec.generate_domain;
        let dns_outcome = self
            .run_step(ctx, "DNS", || async {
                if skip_dns {
                    return StepOutcome::Completed {
                        details: "skipped: customDomain set or generateDomain=false".to_string(),
                    };
                }
                match self
                    .adapters
                    .dns
                    .upsert_a_record(&self.config.base_domain, &ctx.spec.project_name, &self.config.server_ip, None)
                    .await
                {
                    Ok(()) => StepOutcome::Completed {
                        details: format!("A record {} -> {}", ctx.full_domain, self.config.server_ip),
                    },
                    Err(e) => StepOutcome::Warning {
                        details: "DNS record creation failed, continuing without it".to_string(),
                        error: e.to_string(),
                    },
                }
            })
            .await;
        ctx.results.dns = matches!(dns_outcome, StepOutcome::Completed { .. });
        if matches!(dns_outcome, StepOutcome::Warning { .. }) {
            any_soft_warning = true;
        }
        if !skip_dns {
            ctx.domain = Some(RealizedDomain {
                subdomain: ctx.spec.project_name.clone(),
                zone: self.config.base_domain.clone(),
                target_ip: self.config.server_ip.clone(),
                ttl: 300,
            });
        }

        // 3. PROJECT — hard precondition for everything below.
        let project_outcome = self
            .run_step(ctx, "PROJECT", || async {
                match self
                    .adapters
                    .paas
                    .create_project(&ctx.spec.project_name, None)
                    .await
                {
                    Ok(created) => {
                        ctx.project = Some(RealizedProject {
                            project_uuid: created.project_uuid,
                            environment_uuid: created.environment_uuid,
                        });
                        StepOutcome::Completed {
                            details: format!("project '{}' created", ctx.spec.project_name),
                        }
                    }
                    Err(e) => StepOutcome::Failed {
                        details: "project creation failed".to_string(),
                        error: e.to_string(),
                    },
                }
            })
            .await;
        match project_outcome {
            StepOutcome::Completed { .. } => ctx.results.project = true,
            StepOutcome::Failed { error, .. } => {
                return PipelineResult {
                    state: PipelineState::Failed,
                    last_error: Some(error),
                };
            }
            StepOutcome::Warning { .. } => unreachable!("PROJECT never warns"),
            StepOutcome::TimedOut { .. } => unreachable!("PROJECT never times out"),
        }
        let project = ctx.project.clone().expect("PROJECT completed");

        // 4. DATABASES — sequential, each independently fatal-or-warning.
        for db in ctx.spec.databases.clone() {
            let project_name = ctx.spec.project_name.clone();
            let project_uuid = project.project_uuid.clone();
            let logical_name = db.name.clone();
            let kind = db.kind;
            let outcome = self
                .run_step(ctx, &format!("DATABASES:{logical_name}"), || async {
                    match self
                        .adapters
                        .paas
                        .create_database(&project_uuid, &project_name, &logical_name, kind)
                        .await
                    {
                        Ok((uuid, credentials)) => {
                            // sequential create -> sleep(3s) -> start, per REDESIGN FLAGS (no timer callback).
                            tokio::time::sleep(std::time::Duration::from_secs(3)).await;
                            let _ = self.adapters.paas.start_database(&uuid).await;
                            ctx.databases.push(RealizedDatabase {
                                name: logical_name.clone(),
                                kind,
                                uuid,
                                credentials,
                                success: true,
                            });
                            StepOutcome::Completed {
                                details: format!("database '{logical_name}' ({}) ready", kind.as_str()),
                            }
                        }
                        Err(e) => {
                            ctx.databases.push(RealizedDatabase {
                                name: logical_name.clone(),
                                kind,
                                uuid: String::new(),
                                credentials: placeholder_credentials(kind),
                                success: false,
                            });
                            StepOutcome::Warning {
                                details: format!("database '{logical_name}' creation failed"),
                                error: e.to_string(),
                            }
                        }
                    }
                })
                .await;
            let success = matches!(outcome, StepOutcome::Completed { .. });
            ctx.results.databases.push(DatabaseResult {
                name: db.name.clone(),
                success,
            });
            if !success {
                any_soft_warning = true;
            }
        }

        // 5. APPLICATION — hard step; always Git-based.
        let git_repository = ctx
            .spec
            .git_repository
            .clone()
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| self.config.default_git_repo.clone());
        let app_spec = ApplicationSpec {
            name: ctx.spec.project_name.clone(),
            git_repository,
            git_branch: ctx.spec.git_branch.clone(),
            build_pack: ctx.spec.build_pack.clone(),
            port: ctx.spec.port.clone(),
        };
        let application_outcome = self
            .run_step(ctx, "APPLICATION", || async {
                match self
                    .adapters
                    .paas
                    .create_application(&project.project_uuid, &project.environment_uuid, &app_spec)
                    .await
                {
                    Ok(created) => {
                        ctx.application = Some(RealizedApplication {
                            app_uuid: created.app_uuid,
                        });
                        StepOutcome::Completed {
                            details: format!("application '{}' created", ctx.spec.project_name),
                        }
                    }
                    Err(e) => StepOutcome::Failed {
                        details: "application creation failed".to_string(),
                        error: e.to_string(),
                    },
                }
            })
            .await;
        match application_outcome {
            StepOutcome::Completed { .. } => ctx.results.application = true,
            StepOutcome::Failed { error, .. } => {
                return PipelineResult {
                    state: PipelineState::Failed,
                    last_error: Some(error),
                };
            }
            StepOutcome::Warning { .. } => unreachable!("APPLICATION never warns"),
            StepOutcome::TimedOut { .. } => unreachable!("APPLICATION never times out"),
        }
        let application = ctx.application.clone().expect("APPLICATION completed");

        // 6. DOMAIN_ATTACH — soft; a 409 on our own fqdn is idempotent re-attach.
        let domain_outcome = self
            .run_step(ctx, "DOMAIN_ATTACH", || async {
                match self
                    .adapters
                    .paas
                    .set_application_domain(&application.app_uuid, &ctx.full_domain)
                    .await
                {
                    Ok(()) => StepOutcome::Completed {
                        details: format!("domain '{}' attached", ctx.full_domain),
                    },
                    Err(crate::error::OrchestratorError::DomainConflict(_)) => {
                        StepOutcome::Completed {
                            details: format!("domain '{}' already attached", ctx.full_domain),
                        }
                    }
                    Err(e) => StepOutcome::Warning {
                        details: "domain attach failed, app keeps running without it".to_string(),
                        error: e.to_string(),
                    },
                }
            })
            .await;
        if matches!(domain_outcome, StepOutcome::Warning { .. }) {
            any_soft_warning = true;
        }

        // 7. ENV_VARS — user entries first, then synthesized credentials (later wins on collision).
        let mut entries: Vec<EnvVarEntry> = ctx
            .spec
            .environment_variables
            .iter()
            .map(|e| EnvVarEntry {
                key: e.key.clone(),
                value: e.value.clone(),
                is_build_time: false,
            })
            .collect();
        for db in &ctx.databases {
            if !db.success {
                continue;
            }
            for (key, value) in db.credentials.to_env_entries(&db.name, &ctx.spec.project_name) {
                entries.push(EnvVarEntry {
                    key,
                    value,
                    is_build_time: false,
                });
            }
        }
        let entries = dedup_last_wins(entries);
        let env_outcome = self
            .run_step(ctx, "ENV_VARS", || async {
                if entries.is_empty() {
                    return StepOutcome::Completed {
                        details: "0 variables processed".to_string(),
                    };
                }
                let results = self.adapters.paas.set_env_vars(&application.app_uuid, &entries).await;
                let failed: Vec<&str> = results
                    .iter()
                    .filter(|(_, ok)| !ok)
                    .map(|(k, _)| k.as_str())
                    .collect();
                if failed.is_empty() {
                    StepOutcome::Completed {
                        details: format!("{} variables processed", results.len()),
                    }
                } else {
                    StepOutcome::Warning {
                        details: format!("{} of {} variables failed", failed.len(), results.len()),
                        error: failed.join(", "),
                    }
                }
            })
            .await;
        ctx.results.env_vars = matches!(env_outcome, StepOutcome::Completed { .. });
        if matches!(env_outcome, StepOutcome::Warning { .. }) {
            any_soft_warning = true;
        }

        // 8. START
        let start_outcome = self
            .run_step(ctx, "START", || async {
                match self.adapters.paas.start_application(&application.app_uuid).await {
                    Ok(()) => StepOutcome::Completed {
                        details: "start issued".to_string(),
                    },
                    Err(e) => StepOutcome::Warning {
                        details: "start request failed".to_string(),
                        error: e.to_string(),
                    },
                }
            })
            .await;
        ctx.results.start = matches!(start_outcome, StepOutcome::Completed { .. });
        if matches!(start_outcome, StepOutcome::Warning { .. }) {
            any_soft_warning = true;
        }

        // 9. WAIT_READY
        let wait_outcome = self
            .run_step(ctx, "WAIT_READY", || async {
                wait_ready::wait_ready(
                    &self.adapters.paas,
                    &application.app_uuid,
                    std::time::Duration::from_secs(self.config.wait_ready_budget_secs),
                )
                .await
            })
            .await;
        match wait_outcome {
            StepOutcome::Completed { .. } => {}
            StepOutcome::Warning { error, .. } | StepOutcome::TimedOut { error, .. } => {
                // Readiness was never confirmed: `application`/`start` report
                // the app as not-yet-running rather than merely "request sent"
                // (§8 Scenario D).
                any_soft_warning = true;
                last_error = Some(error);
                ctx.results.application = false;
                ctx.results.start = false;
            }
            StepOutcome::Failed { error, .. } => {
                return PipelineResult {
                    state: PipelineState::Failed,
                    last_error: Some(error),
                };
            }
        }

        let state = if any_soft_warning {
            PipelineState::Partial
        } else {
            PipelineState::Succeeded
        };
        PipelineResult { state, last_error }
    }
}

fn placeholder_credentials(kind: crate::credentials::DbKind) -> Credentials {
    use crate::credentials::DbKind;
    match kind {
        DbKind::Postgresql => Credentials::Postgres {
            host: String::new(),
            port: kind.default_port(),
            user: String::new(),
            password: String::new(),
            database: String::new(),
        },
        DbKind::Mysql => Credentials::MySql {
            host: String::new(),
            port: kind.default_port(),
            user: String::new(),
            password: String::new(),
            database: String::new(),
        },
        DbKind::Redis => Credentials::Redis {
            host: String::new(),
            port: kind.default_port(),
            password: String::new(),
        },
        DbKind::Mongodb => Credentials::Mongo {
            host: String::new(),
            port: kind.default_port(),
            user: String::new(),
            password: String::new(),
            database: String::new(),
        },
    }
}

/// Later entries with the same key win (§3 invariant 3, synthesized credentials override user vars).
fn dedup_last_wins(entries: Vec<EnvVarEntry>) -> Vec<EnvVarEntry> {
    let mut ordered_keys = Vec::new();
    let mut by_key = std::collections::HashMap::new();
    for entry in entries {
        if !by_key.contains_key(&entry.key) {
            ordered_keys.push(entry.key.clone());
        }
        by_key.insert(entry.key.clone(), entry);
    }
    ordered_keys
        .into_iter()
        .map(|k| by_key.remove(&k).expect("key present"))
        .collect()
}

/// Seed scenarios A-E (§8): the full pipeline driven against stubbed PaaS/DNS
/// backends. Scenario F (teardown) lives alongside `teardown_project` itself.
#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::adapters::local_exec::LocalExecutor;
    use crate::adapters::proxy::ReverseProxyAdapter;
    use crate::config::ProxyConfig;
    use crate::model::{DatabaseSpec, DeploymentSpec, EnvVarInput, compute_full_domain};

    async fn test_config(paas: &MockServer, dns: &MockServer, wait_ready_budget_secs: u64) -> Config {
        Config {
            bind_addr: "127.0.0.1:0".to_string(),
            server_ip: "203.0.113.9".to_string(),
            server_uuid: "server-uuid-1".to_string(),
            paas_url: paas.uri(),
            paas_api_token: SecretString::from("paas-token".to_string()),
            dns_url: dns.uri(),
            dns_api_key: SecretString::from("dns-key".to_string()),
            base_domain: "example.com".to_string(),
            default_git_repo: "https://git.example.com/placeholder.git".to_string(),
            api_token: SecretString::from("api-token".to_string()),
            wait_ready_budget_secs,
            proxy: ProxyConfig::default(),
        }
    }

    async fn test_adapters(config: &Config) -> Adapters {
        let paas = crate::adapters::paas::PaasAdapter::new(
            &config.paas_url,
            &config.paas_api_token,
            &config.server_uuid,
        )
        .unwrap();
        let dns = crate::adapters::dns::DnsAdapter::new(&config.dns_url, &config.dns_api_key).unwrap();
        let local = LocalExecutor::new(vec![]);
        let proxy = ReverseProxyAdapter::new("/tmp/deployctl-test", local.clone());
        Adapters { paas, dns, proxy, local }
    }

    fn minimal_spec(project_name: &str) -> DeploymentSpec {
        DeploymentSpec {
            project_name: project_name.to_string(),
            git_repository: None,
            git_branch: "main".to_string(),
            build_pack: "nixpacks".to_string(),
            port: "3000".to_string(),
            generate_domain: true,
            custom_domain: None,
            databases: Vec::new(),
            environment_variables: Vec::new(),
        }
    }

    async fn mount_happy_dns(dns: &MockServer) {
        Mock::given(method("PATCH"))
            .and(path_regex(r"^/zones/.*/rrsets$"))
            .respond_with(ResponseTemplate::new(204))
            .mount(dns)
            .await;
    }

    async fn mount_happy_paas(paas: &MockServer, state: &str) {
        Mock::given(method("POST"))
            .and(path("/projects"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "projectUuid": "proj-1",
                "environmentUuid": "env-1",
            })))
            .mount(paas)
            .await;
        Mock::given(method("POST"))
            .and(path("/applications"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "uuid": "app-1",
            })))
            .mount(paas)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/applications/app-1/domains"))
            .respond_with(ResponseTemplate::new(200))
            .mount(paas)
            .await;
        Mock::given(method("PUT"))
            .and(path("/applications/app-1/envs"))
            .respond_with(ResponseTemplate::new(200))
            .mount(paas)
            .await;
        Mock::given(method("GET"))
            .and(path("/applications/app-1/start"))
            .respond_with(ResponseTemplate::new(200))
            .mount(paas)
            .await;
        Mock::given(method("GET"))
            .and(path("/applications/app-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "state": state,
                "status": state,
            })))
            .mount(paas)
            .await;
    }

    /// Scenario A: minimal app, auto domain, one Postgres database.
    #[tokio::test]
    async fn scenario_a_minimal_app_auto_domain_one_postgres() {
        let paas = MockServer::start().await;
        let dns = MockServer::start().await;
        mount_happy_dns(&dns).await;
        mount_happy_paas(&paas, "healthy").await;
        Mock::given(method("POST"))
            .and(path("/databases/postgresql"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({ "uuid": "db-1" })))
            .mount(&paas)
            .await;
        Mock::given(method("POST"))
            .and(path("/databases/db-1/start"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&paas)
            .await;

        let config = test_config(&paas, &dns, 480).await;
        let adapters = test_adapters(&config).await;

        let mut spec = minimal_spec("demo-a");
        spec.databases.push(DatabaseSpec {
            name: "main".to_string(),
            kind: crate::credentials::DbKind::Postgresql,
        });
        spec.environment_variables.push(EnvVarInput {
            key: "NODE_ENV".to_string(),
            value: "production".to_string(),
        });
        let full_domain = compute_full_domain(&spec, &config.base_domain);
        let mut ctx = DeploymentContext::new(spec, full_domain);

        let pipeline = DeploymentPipeline::new(&adapters, &config);
        let result = pipeline.run(&mut ctx).await;

        assert_eq!(result.state, PipelineState::Succeeded);
        assert_eq!(ctx.full_domain, "demo-a.example.com");
        assert!(ctx.results.start);
        let creds = &ctx.databases[0].credentials;
        assert_eq!(
            creds.connection_url(),
            format!("postgresql://dbuser:{}@demo-a-main:5432/demo_a_main", creds.password())
        );
        assert!(
            creds
                .connection_url()
                .starts_with("postgresql://dbuser:")
        );
        let url = creds.connection_url();
        let password = url
            .strip_prefix("postgresql://dbuser:")
            .and_then(|rest| rest.split('@').next())
            .unwrap();
        assert_eq!(password.len(), 16);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    /// Scenario B: Redis only, no password workaround.
    #[tokio::test]
    async fn scenario_b_redis_only_no_password_workaround() {
        let paas = MockServer::start().await;
        let dns = MockServer::start().await;
        mount_happy_dns(&dns).await;
        mount_happy_paas(&paas, "running").await;
        Mock::given(method("POST"))
            .and(path("/databases/redis"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({ "uuid": "db-2" })))
            .mount(&paas)
            .await;
        Mock::given(method("POST"))
            .and(path("/databases/db-2/start"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&paas)
            .await;

        let config = test_config(&paas, &dns, 480).await;
        let adapters = test_adapters(&config).await;

        let mut spec = minimal_spec("demo-b");
        spec.databases.push(DatabaseSpec {
            name: "cache".to_string(),
            kind: crate::credentials::DbKind::Redis,
        });
        let full_domain = compute_full_domain(&spec, &config.base_domain);
        let mut ctx = DeploymentContext::new(spec, full_domain);

        let pipeline = DeploymentPipeline::new(&adapters, &config);
        let result = pipeline.run(&mut ctx).await;

        assert_eq!(result.state, PipelineState::Succeeded);
        let creds = &ctx.databases[0].credentials;
        assert_eq!(creds.password(), "");
        assert_eq!(creds.connection_url(), "redis://demo-b-cache:6379");
        let entries = creds.to_env_entries("cache", "demo-b");
        assert!(!entries.iter().any(|(k, _)| k == "CACHE_PASSWORD"));
        assert!(!entries.iter().any(|(k, _)| k == "CACHE_DATABASE"));
        assert!(entries.iter().any(|(k, v)| k == "CACHE_URL" && v == "redis://demo-b-cache:6379"));
    }

    /// Scenario C: PROJECT step fails with NameTaken -> hard failure.
    #[tokio::test]
    async fn scenario_c_project_name_taken_is_hard_failure() {
        let paas = MockServer::start().await;
        let dns = MockServer::start().await;
        mount_happy_dns(&dns).await;
        Mock::given(method("POST"))
            .and(path("/projects"))
            .respond_with(ResponseTemplate::new(409).set_body_string("project exists"))
            .mount(&paas)
            .await;

        let config = test_config(&paas, &dns, 480).await;
        let adapters = test_adapters(&config).await;

        let spec = minimal_spec("existing");
        let full_domain = compute_full_domain(&spec, &config.base_domain);
        let mut ctx = DeploymentContext::new(spec, full_domain);

        let pipeline = DeploymentPipeline::new(&adapters, &config);
        let result = pipeline.run(&mut ctx).await;

        assert_eq!(result.state, PipelineState::Failed);
        assert!(!ctx.results.project);
        let project_entries: Vec<_> = ctx.step_log.iter().filter(|e| e.step == "PROJECT").collect();
        assert_eq!(project_entries.len(), 2);
        assert_eq!(project_entries[0].status, StepStatus::Starting);
        assert_eq!(project_entries[1].status, StepStatus::Failed);
    }

    /// Scenario D: WAIT_READY never sees a terminal state before the budget
    /// runs out -> PARTIAL, not FAILED (§9 Open Question 3).
    #[tokio::test]
    async fn scenario_d_wait_ready_timeout_is_partial() {
        let paas = MockServer::start().await;
        let dns = MockServer::start().await;
        mount_happy_dns(&dns).await;
        mount_happy_paas(&paas, "building").await;

        // Tiny budget: wait_ready's deadline check fires after the first poll
        // without ever sleeping the full 15s interval.
        let config = test_config(&paas, &dns, 1).await;
        let adapters = test_adapters(&config).await;

        let spec = minimal_spec("demo-d");
        let full_domain = compute_full_domain(&spec, &config.base_domain);
        let mut ctx = DeploymentContext::new(spec, full_domain);

        let pipeline = DeploymentPipeline::new(&adapters, &config);
        let result = pipeline.run(&mut ctx).await;

        assert_eq!(result.state, PipelineState::Partial);
        assert!(!ctx.results.application);
        assert!(!ctx.results.start);
        let wait_entry = ctx
            .step_log
            .iter()
            .find(|e| e.step == "WAIT_READY" && e.status == StepStatus::Failed)
            .expect("WAIT_READY should have a failed/timeout entry");
        assert_eq!(wait_entry.timeout, Some(true));
        assert!(
            wait_entry
                .error
                .as_deref()
                .unwrap_or_default()
                .contains("timeout")
        );
    }

    /// Scenario E: custom domain overrides auto-domain; DNS step is skipped outright.
    #[tokio::test]
    async fn scenario_e_custom_domain_skips_dns_step() {
        let paas = MockServer::start().await;
        let dns = MockServer::start().await;
        mount_happy_paas(&paas, "healthy").await;

        let config = test_config(&paas, &dns, 480).await;
        let adapters = test_adapters(&config).await;

        let mut spec = minimal_spec("demo-e");
        spec.custom_domain = Some("myapp.example.com".to_string());
        spec.generate_domain = false;
        let full_domain = compute_full_domain(&spec, &config.base_domain);
        let mut ctx = DeploymentContext::new(spec, full_domain);

        let pipeline = DeploymentPipeline::new(&adapters, &config);
        let result = pipeline.run(&mut ctx).await;

        assert_eq!(result.state, PipelineState::Succeeded);
        assert_eq!(ctx.full_domain, "myapp.example.com");
        let dns_entry = ctx
            .step_log
            .iter()
            .find(|e| e.step == "DNS" && e.status == StepStatus::Completed)
            .expect("DNS step should report completed (skipped)");
        assert!(dns_entry.details.as_deref().unwrap_or_default().contains("skipped"));
        assert!(ctx.domain.is_none());
    }
}


