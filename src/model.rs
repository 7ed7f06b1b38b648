//! Entities and the per-request context the pipeline operates on (§3).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::credentials::{Credentials, DbKind};

/// Immutable client-provided request. Never mutated after construction.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSpec {
    pub project_name: String,
    #[serde(default)]
    pub git_repository: Option<String>,
    #[serde(default = "default_git_branch")]
    pub git_branch: String,
    #[serde(default = "default_build_pack")]
    pub build_pack: String,
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default = "default_true")]
    pub generate_domain: bool,
    #[serde(default)]
    pub custom_domain: Option<String>,
    #[serde(default)]
    pub databases: Vec<DatabaseSpec>,
    #[serde(default)]
    pub environment_variables: Vec<EnvVarInput>,
}

fn default_git_branch() -> String {
    "main".to_string()
}

fn default_build_pack() -> String {
    "nixpacks".to_string()
}

fn default_port() -> String {
    "3000".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DbKind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvVarInput {
    pub key: String,
    pub value: String,
}

/// One (key, value, isBuildTime) entry destined for the application's env vars.
#[derive(Debug, Clone, Serialize)]
pub struct EnvVarEntry {
    pub key: String,
    pub value: String,
    pub is_build_time: bool,
}

/// Result of realizing a Project on the PaaS.
#[derive(Debug, Clone)]
pub struct RealizedProject {
    pub project_uuid: String,
    pub environment_uuid: String,
}

/// Result of realizing an Application on the PaaS.
#[derive(Debug, Clone)]
pub struct RealizedApplication {
    pub app_uuid: String,
}

/// Result of realizing one Database on the PaaS.
#[derive(Debug, Clone)]
pub struct RealizedDatabase {
    pub name: String,
    pub kind: DbKind,
    pub uuid: String,
    pub credentials: Credentials,
    pub success: bool,
}

/// DNS A-record created for the application, if any.
#[derive(Debug, Clone)]
pub struct RealizedDomain {
    pub subdomain: String,
    pub zone: String,
    pub target_ip: String,
    pub ttl: u32,
}

/// One audit row. `starting` is appended by the driver before a step runs;
/// the step's terminal entry is appended once it returns (§4.3 step contract).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepLogEntry {
    pub step: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set only on WAIT_READY budget exhaustion (§4.3): the step logs as
    /// `failed` even though the pipeline outcome is PARTIAL, not FAILED.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Starting,
    Completed,
    Warning,
    Failed,
}

/// Flat, fixed-shape results record (REDESIGN FLAGS: no string-keyed map).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Results {
    pub dns: bool,
    pub project: bool,
    pub databases: Vec<DatabaseResult>,
    pub application: bool,
    pub env_vars: bool,
    pub start: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseResult {
    pub name: String,
    pub success: bool,
}

impl Default for Results {
    fn default() -> Self {
        Self {
            dns: false,
            project: false,
            databases: Vec::new(),
            application: false,
            env_vars: false,
            start: false,
        }
    }
}

/// Reserved terminology for future blue/green support (GLOSSARY "Slot"); not
/// modeled as a type here, no pipeline step reads or writes it.
///
/// Mutable per-run state. Discarded once the HTTP response is rendered.
pub struct DeploymentContext {
    pub deployment_id: Uuid,
    pub spec: DeploymentSpec,
    pub full_domain: String,
    pub step_log: Vec<StepLogEntry>,
    pub results: Results,

    pub project: Option<RealizedProject>,
    pub application: Option<RealizedApplication>,
    pub databases: Vec<RealizedDatabase>,
    pub domain: Option<RealizedDomain>,
}

impl DeploymentContext {
    pub fn new(spec: DeploymentSpec, full_domain: String) -> Self {
        Self {
            deployment_id: Uuid::new_v4(),
            spec,
            full_domain,
            step_log: Vec::new(),
            results: Results::default(),
            project: None,
            application: None,
            databases: Vec::new(),
            domain: None,
        }
    }
}

/// `fullDomain` selection rule (§3 invariants, §8 invariant 4).
pub fn compute_full_domain(spec: &DeploymentSpec, base_domain: &str) -> String {
    match spec.custom_domain.as_deref() {
        Some(d) if !d.is_empty() => d.to_string(),
        _ => format!("{}.{}", spec.project_name, base_domain),
    }
}
