//! Wire DTOs for the HTTP surface (§6). Kept separate from the internal
//! model types so the pipeline's internal shapes can evolve without
//! reshaping the public JSON contract.

use serde::Serialize;

use crate::credentials::Credentials;
use crate::model::{DeploymentContext, Results, StepLogEntry};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub services: ServicesHealth,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ServicesHealth {
    pub api: bool,
    pub paas: bool,
    pub dns: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploySuccessResponse {
    pub success: bool,
    pub deployment_id: String,
    pub project_name: String,
    pub domain: String,
    pub url: String,
    pub coolify: CoolifyInfo,
    pub databases: Vec<DatabaseResponseItem>,
    pub deployment_log: Vec<StepLogEntry>,
    pub results: Results,
    pub deployed_at: String,
    pub instructions: Instructions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployFailureResponse {
    pub error: &'static str,
    pub deployment_id: String,
    pub details: String,
    pub deployment_log: Vec<StepLogEntry>,
    pub results: Results,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoolifyInfo {
    pub project_uuid: Option<String>,
    pub application_uuid: Option<String>,
    pub dashboard_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseResponseItem {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub uuid: String,
    pub status: &'static str,
    pub credentials: CredentialsDto,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsDto {
    pub kind: &'static str,
    pub host: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    pub connection_url: String,
}

impl From<&Credentials> for CredentialsDto {
    fn from(c: &Credentials) -> Self {
        let (user, database) = match c {
            Credentials::Postgres { user, database, .. }
            | Credentials::MySql { user, database, .. }
            | Credentials::Mongo { user, database, .. } => {
                (Some(user.clone()), Some(database.clone()))
            }
            Credentials::Redis { .. } => (None, None),
        };
        Self {
            kind: c.kind().as_str(),
            host: c.host().to_string(),
            port: c.port(),
            user,
            password: c.password().to_string(),
            database,
            connection_url: c.connection_url(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Instructions {
    pub access: String,
    pub dashboard: String,
    pub dns: String,
}

impl Instructions {
    /// The three fixed user-oriented strings (§4.4), returned verbatim
    /// regardless of partial outcomes (§7 "User-visible behavior").
    pub fn fixed(full_domain: &str, dashboard_url: &str) -> Self {
        Self {
            access: format!(
                "Your application will be available at https://{full_domain} once the deployment finishes starting."
            ),
            dashboard: format!("Manage this deployment from the PaaS dashboard: {dashboard_url}"),
            dns: "DNS changes can take a few minutes to propagate globally; give it time before assuming something is wrong.".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectListItem {
    pub name: String,
    pub uuid: String,
    pub fqdn: String,
    pub status: String,
    pub created_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteProjectResponse {
    pub message: String,
}

/// Renders the full success response from a finished `DeploymentContext`
/// (§4.4, §6 exact response shape).
pub fn render_success_response(
    ctx: &DeploymentContext,
    dashboard_base_url: &str,
    deployed_at: String,
) -> DeploySuccessResponse {
    let databases = ctx
        .databases
        .iter()
        .map(|db| DatabaseResponseItem {
            name: db.name.clone(),
            kind: db.kind.as_str(),
            uuid: db.uuid.clone(),
            status: "deployed",
            credentials: CredentialsDto::from(&db.credentials),
        })
        .collect();

    let application_uuid = ctx.application.as_ref().map(|a| a.app_uuid.clone());
    let dashboard_url = ctx
        .project
        .as_ref()
        .map(|p| format!("{}/projects/{}", dashboard_base_url.trim_end_matches('/'), p.project_uuid))
        .unwrap_or_else(|| dashboard_base_url.to_string());

    DeploySuccessResponse {
        success: true,
        deployment_id: ctx.deployment_id.to_string(),
        project_name: ctx.spec.project_name.clone(),
        domain: ctx.full_domain.clone(),
        url: format!("https://{}", ctx.full_domain),
        coolify: CoolifyInfo {
            project_uuid: ctx.project.as_ref().map(|p| p.project_uuid.clone()),
            application_uuid,
            dashboard_url: Some(dashboard_url.clone()),
        },
        databases,
        deployment_log: ctx.step_log.clone(),
        results: ctx.results.clone(),
        deployed_at,
        instructions: Instructions::fixed(&ctx.full_domain, &dashboard_url),
    }
}

pub fn render_failure_response(ctx: &DeploymentContext, details: String) -> DeployFailureResponse {
    DeployFailureResponse {
        error: "Deployment failed",
        deployment_id: ctx.deployment_id.to_string(),
        details,
        deployment_log: ctx.step_log.clone(),
        results: ctx.results.clone(),
    }
}


