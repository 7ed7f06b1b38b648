//! PaaS adapter (§4.1.1): a Coolify-style API for projects/applications/databases/envs.
//!
//! Nothing above this layer sees raw HTTP; every operation returns a typed
//! result or an [`OrchestratorError`] already classified per the retry/error
//! policy in §4.1.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use crate::credentials::{Credentials, DbKind, sanitize_db_name};
use crate::error::{OrchestratorError, classify_http_error, classify_status};
use crate::model::EnvVarEntry;
use crate::passwordgen::generate_password;
use crate::retry::with_retries;

const CREATE_TIMEOUT: Duration = Duration::from_secs(60);
const READ_TIMEOUT: Duration = Duration::from_secs(30);
const DELETE_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct PaasAdapter {
    base_url: String,
    server_uuid: String,
    client: reqwest::Client,
}

impl PaasAdapter {
    pub fn new(base_url: impl Into<String>, api_token: &SecretString, server_uuid: impl Into<String>) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_token.expose_secret()))?;
        auth.set_sensitive(true);
        headers.insert(HeaderName::from_static("authorization"), auth);

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            base_url: base_url.into(),
            server_uuid: server_uuid.into(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    #[instrument(skip(self))]
    pub async fn create_project(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<CreatedProject, OrchestratorError> {
        with_retries("create_project", || async {
            let resp = self
                .client
                .post(self.url("/projects"))
                .timeout(CREATE_TIMEOUT)
                .json(&json!({
                    "name": name,
                    "description": description.unwrap_or_default(),
                    "server_uuid": self.server_uuid,
                }))
                .send()
                .await
                .map_err(|e| classify_http_error(&e))?;

            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            if !status.is_success() {
                return Err(classify_status(status, &body));
            }
            let parsed: CreateProjectResponse = serde_json::from_str(&body).map_err(|e| {
                OrchestratorError::BackendUnavailable(format!("malformed create_project response: {e}"))
            })?;
            Ok(CreatedProject {
                project_uuid: parsed.project_uuid,
                environment_uuid: parsed.environment_uuid,
            })
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn get_project_details(&self, uuid: &str) -> Result<ProjectDetails, OrchestratorError> {
        with_retries("get_project_details", || async {
            let resp = self
                .client
                .get(self.url(&format!("/projects/{uuid}")))
                .timeout(READ_TIMEOUT)
                .send()
                .await
                .map_err(|e| classify_http_error(&e))?;

            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            if !status.is_success() {
                return Err(classify_status(status, &body));
            }
            serde_json::from_str(&body).map_err(|e| {
                OrchestratorError::BackendUnavailable(format!("malformed project details response: {e}"))
            })
        })
        .await
    }

    #[instrument(skip(self, spec))]
    pub async fn create_application(
        &self,
        project_uuid: &str,
        environment_uuid: &str,
        spec: &ApplicationSpec,
    ) -> Result<CreatedApplication, OrchestratorError> {
        with_retries("create_application", || async {
            let resp = self
                .client
                .post(self.url("/applications"))
                .timeout(CREATE_TIMEOUT)
                .json(&json!({
                    "project_uuid": project_uuid,
                    "environment_uuid": environment_uuid,
                    "server_uuid": self.server_uuid,
                    "name": spec.name,
                    "git_repository": spec.git_repository,
                    "git_branch": spec.git_branch,
                    "build_pack": spec.build_pack,
                    "ports_exposes": spec.port,
                }))
                .send()
                .await
                .map_err(|e| classify_http_error(&e))?;

            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            if !status.is_success() {
                if status == reqwest::StatusCode::UNPROCESSABLE_ENTITY
                    && body.to_ascii_lowercase().contains("repository")
                {
                    return Err(OrchestratorError::RepoUnreachable(body));
                }
                return Err(classify_status(status, &body));
            }
            let parsed: CreateApplicationResponse = serde_json::from_str(&body).map_err(|e| {
                OrchestratorError::BackendUnavailable(format!("malformed create_application response: {e}"))
            })?;
            Ok(CreatedApplication {
                app_uuid: parsed.uuid,
            })
        })
        .await
    }

    /// Soft-fail by contract: a `DomainConflict` on an identical fqdn is
    /// classified as success (idempotence law, §8).
    #[instrument(skip(self))]
    pub async fn set_application_domain(&self, app_uuid: &str, fqdn: &str) -> Result<(), OrchestratorError> {
        let resp = self
            .client
            .patch(self.url(&format!("/applications/{app_uuid}/domains")))
            .timeout(READ_TIMEOUT)
            .json(&json!({ "domain": fqdn }))
            .send()
            .await
            .map_err(|e| classify_http_error(&e))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        if status == reqwest::StatusCode::CONFLICT {
            let body = resp.text().await.unwrap_or_default();
            return Err(OrchestratorError::DomainConflict(body));
        }
        let body = resp.text().await.unwrap_or_default();
        Err(classify_status(status, &body))
    }

    /// Per-entry success list; partial success is permitted (§4.1.1, ENV_VARS step).
    #[instrument(skip(self, entries))]
    pub async fn set_env_vars(
        &self,
        app_uuid: &str,
        entries: &[EnvVarEntry],
    ) -> Vec<(String, bool)> {
        if entries.is_empty() {
            return Vec::new();
        }

        let payload: Vec<Value> = entries
            .iter()
            .map(|e| json!({ "key": e.key, "value": e.value, "is_build_time": e.is_build_time }))
            .collect();

        let resp = self
            .client
            .put(self.url(&format!("/applications/{app_uuid}/envs")))
            .timeout(READ_TIMEOUT)
            .json(&json!({ "data": payload }))
            .send()
            .await;

        match resp {
            Ok(r) if r.status().is_success() => {
                entries.iter().map(|e| (e.key.clone(), true)).collect()
            }
            _ => entries.iter().map(|e| (e.key.clone(), false)).collect(),
        }
    }

    /// GET first, fall back to POST; only both failing is a start failure (§4.1.1).
    #[instrument(skip(self))]
    pub async fn start_application(&self, app_uuid: &str) -> Result<(), OrchestratorError> {
        let get_resp = self
            .client
            .get(self.url(&format!("/applications/{app_uuid}/start")))
            .timeout(READ_TIMEOUT)
            .send()
            .await;
        if let Ok(r) = &get_resp {
            if r.status().is_success() {
                return Ok(());
            }
        }

        let post_resp = self
            .client
            .post(self.url(&format!("/applications/{app_uuid}/start")))
            .timeout(READ_TIMEOUT)
            .send()
            .await;
        match post_resp {
            Ok(r) if r.status().is_success() => Ok(()),
            Ok(r) => {
                let status = r.status();
                let body = r.text().await.unwrap_or_default();
                Err(classify_status(status, &body))
            }
            Err(e) => Err(classify_http_error(&e)),
        }
    }

    #[instrument(skip(self))]
    pub async fn poll_application_status(&self, app_uuid: &str) -> Result<ApplicationStatus, OrchestratorError> {
        let resp = self
            .client
            .get(self.url(&format!("/applications/{app_uuid}")))
            .timeout(POLL_TIMEOUT)
            .send()
            .await
            .map_err(|e| classify_http_error(&e))?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(classify_status(status, &body));
        }
        let parsed: ApplicationStatusResponse = serde_json::from_str(&body).map_err(|e| {
            OrchestratorError::BackendUnavailable(format!("malformed status response: {e}"))
        })?;
        Ok(parsed.into())
    }

    /// Kind-specific create payloads (§4.1.1): the Redis backend bug means no
    /// password field is ever sent on create; credentials record an empty password.
    #[instrument(skip(self))]
    pub async fn create_database(
        &self,
        project_uuid: &str,
        project_name: &str,
        logical_name: &str,
        kind: DbKind,
    ) -> Result<(String, Credentials), OrchestratorError> {
        let host = format!("{project_name}-{logical_name}");
        let db_name = sanitize_db_name(project_name, logical_name);
        let password = generate_password();

        let (endpoint, payload, credentials) = match kind {
            DbKind::Postgresql => (
                "/databases/postgresql",
                json!({
                    "project_uuid": project_uuid,
                    "server_uuid": self.server_uuid,
                    "name": logical_name,
                    "postgres_user": "dbuser",
                    "postgres_password": password,
                    "postgres_db": db_name,
                }),
                Credentials::Postgres {
                    host: host.clone(),
                    port: kind.default_port(),
                    user: "dbuser".to_string(),
                    password,
                    database: db_name,
                },
            ),
            DbKind::Mysql => {
                let root_password = generate_password();
                (
                    "/databases/mysql",
                    json!({
                        "project_uuid": project_uuid,
                        "server_uuid": self.server_uuid,
                        "name": logical_name,
                        "mysql_root_password": root_password,
                        "mysql_user": "dbuser",
                        "mysql_password": password,
                        "mysql_database": db_name,
                    }),
                    Credentials::MySql {
                        host: host.clone(),
                        port: kind.default_port(),
                        user: "dbuser".to_string(),
                        password,
                        database: db_name,
                    },
                )
            }
            DbKind::Redis => (
                "/databases/redis",
                json!({
                    "project_uuid": project_uuid,
                    "server_uuid": self.server_uuid,
                    "name": logical_name,
                }),
                Credentials::Redis {
                    host: host.clone(),
                    port: kind.default_port(),
                    password: String::new(),
                },
            ),
            DbKind::Mongodb => (
                "/databases/mongodb",
                json!({
                    "project_uuid": project_uuid,
                    "server_uuid": self.server_uuid,
                    "name": logical_name,
                    "mongo_initdb_root_username": "admin",
                    "mongo_initdb_root_password": password,
                    "mongo_initdb_database": db_name,
                }),
                Credentials::Mongo {
                    host: host.clone(),
                    port: kind.default_port(),
                    user: "admin".to_string(),
                    password,
                    database: db_name,
                },
            ),
        };

        let uuid = with_retries("create_database", || async {
            let resp = self
                .client
                .post(self.url(endpoint))
                .timeout(CREATE_TIMEOUT)
                .json(&payload)
                .send()
                .await
                .map_err(|e| classify_http_error(&e))?;

            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            if !status.is_success() {
                return Err(classify_status(status, &body));
            }
            let parsed: CreateDatabaseResponse = serde_json::from_str(&body).map_err(|e| {
                OrchestratorError::BackendUnavailable(format!("malformed create_database response: {e}"))
            })?;
            Ok(parsed.uuid)
        })
        .await?;

        Ok((uuid, credentials))
    }

    #[instrument(skip(self))]
    pub async fn start_database(&self, db_uuid: &str) -> Result<(), OrchestratorError> {
        let resp = self
            .client
            .post(self.url(&format!("/databases/{db_uuid}/start")))
            .timeout(READ_TIMEOUT)
            .send()
            .await;
        // Soft-fail by contract (§4.1.1): never bubble this up as fatal.
        if let Err(e) = resp {
            tracing::warn!(error = %e, db_uuid, "start_database request failed, continuing");
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_application(&self, app_uuid: &str) -> Result<(), OrchestratorError> {
        self.delete("/applications", app_uuid).await
    }

    #[instrument(skip(self))]
    pub async fn delete_database(&self, db_uuid: &str) -> Result<(), OrchestratorError> {
        self.delete("/databases", db_uuid).await
    }

    #[instrument(skip(self))]
    pub async fn delete_project(&self, project_uuid: &str) -> Result<(), OrchestratorError> {
        self.delete("/projects", project_uuid).await
    }

    async fn delete(&self, collection: &str, uuid: &str) -> Result<(), OrchestratorError> {
        let resp = self
            .client
            .delete(self.url(&format!("{collection}/{uuid}")))
            .timeout(DELETE_TIMEOUT)
            .send()
            .await
            .map_err(|e| classify_http_error(&e))?;

        let status = resp.status();
        // 404 is success (§4.3, §8 invariant 5).
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(classify_status(status, &body))
    }

    /// Lists applications under a project (§4.3 reverse pipeline step 1).
    #[instrument(skip(self))]
    pub async fn list_applications(&self, project_uuid: &str) -> Result<Vec<String>, OrchestratorError> {
        with_retries("list_applications", || async {
            let resp = self
                .client
                .get(self.url(&format!("/projects/{project_uuid}/applications")))
                .timeout(READ_TIMEOUT)
                .send()
                .await
                .map_err(|e| classify_http_error(&e))?;

            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Ok(Vec::new());
            }
            if !status.is_success() {
                return Err(classify_status(status, &body));
            }
            let parsed: Vec<UuidOnly> = serde_json::from_str(&body).map_err(|e| {
                OrchestratorError::BackendUnavailable(format!("malformed applications list response: {e}"))
            })?;
            Ok(parsed.into_iter().map(|u| u.uuid).collect())
        })
        .await
    }

    /// Lists databases under a project (§4.3 reverse pipeline step 2).
    #[instrument(skip(self))]
    pub async fn list_databases(&self, project_uuid: &str) -> Result<Vec<String>, OrchestratorError> {
        with_retries("list_databases", || async {
            let resp = self
                .client
                .get(self.url(&format!("/projects/{project_uuid}/databases")))
                .timeout(READ_TIMEOUT)
                .send()
                .await
                .map_err(|e| classify_http_error(&e))?;

            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Ok(Vec::new());
            }
            if !status.is_success() {
                return Err(classify_status(status, &body));
            }
            let parsed: Vec<UuidOnly> = serde_json::from_str(&body).map_err(|e| {
                OrchestratorError::BackendUnavailable(format!("malformed databases list response: {e}"))
            })?;
            Ok(parsed.into_iter().map(|u| u.uuid).collect())
        })
        .await
    }

    /// Used by the list-projects handler (§6 `GET /api/projects`).
    #[instrument(skip(self))]
    pub async fn list_projects(&self) -> Result<Vec<ProjectSummary>, OrchestratorError> {
        with_retries("list_projects", || async {
            let resp = self
                .client
                .get(self.url("/projects"))
                .timeout(READ_TIMEOUT)
                .send()
                .await
                .map_err(|e| classify_http_error(&e))?;

            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            if !status.is_success() {
                return Err(classify_status(status, &body));
            }
            serde_json::from_str(&body).map_err(|e| {
                OrchestratorError::BackendUnavailable(format!("malformed list_projects response: {e}"))
            })
        })
        .await
    }
}

pub struct ApplicationSpec {
    pub name: String,
    pub git_repository: String,
    pub git_branch: String,
    pub build_pack: String,
    pub port: String,
}

#[derive(Debug, Clone)]
pub struct CreatedProject {
    pub project_uuid: String,
    pub environment_uuid: String,
}

#[derive(Debug, Clone)]
pub struct CreatedApplication {
    pub app_uuid: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateProjectResponse {
    project_uuid: String,
    environment_uuid: String,
}

#[derive(Debug, Deserialize)]
pub struct ProjectDetails {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub environments: Vec<EnvironmentSummary>,
}

#[derive(Debug, Deserialize)]
pub struct EnvironmentSummary {
    pub uuid: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct CreateApplicationResponse {
    uuid: String,
}

#[derive(Debug, Deserialize)]
struct CreateDatabaseResponse {
    uuid: String,
}

#[derive(Debug, Deserialize)]
struct UuidOnly {
    uuid: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationState {
    Building,
    Starting,
    Deploying,
    Running,
    Healthy,
    Exited,
    Failed,
    Error,
    Unknown,
}

impl ApplicationState {
    pub fn is_ready(self) -> bool {
        matches!(self, ApplicationState::Running | ApplicationState::Healthy)
    }

    pub fn is_terminal_failure(self) -> bool {
        matches!(
            self,
            ApplicationState::Exited | ApplicationState::Failed | ApplicationState::Error
        )
    }
}

impl From<&str> for ApplicationState {
    fn from(s: &str) -> Self {
        match s {
            "building" => ApplicationState::Building,
            "starting" => ApplicationState::Starting,
            "deploying" => ApplicationState::Deploying,
            "running" => ApplicationState::Running,
            "healthy" => ApplicationState::Healthy,
            "exited" => ApplicationState::Exited,
            "failed" => ApplicationState::Failed,
            "error" => ApplicationState::Error,
            _ => ApplicationState::Unknown,
        }
    }
}

pub struct ApplicationStatus {
    pub state: ApplicationState,
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct ApplicationStatusResponse {
    state: String,
    #[serde(default)]
    status: Option<String>,
}

impl From<ApplicationStatusResponse> for ApplicationStatus {
    fn from(r: ApplicationStatusResponse) -> Self {
        ApplicationStatus {
            state: ApplicationState::from(r.state.as_str()),
            status: r.status.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub created_at: Option<String>,
}
