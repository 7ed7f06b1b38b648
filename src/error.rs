//! Error taxonomy for the deployment pipeline.
//!
//! Adapters and pipeline steps return [`OrchestratorError`] instead of
//! throwing; the pipeline driver is the only place that turns a failing
//! step into a terminal pipeline state (see `pipeline::steps::StepOutcome`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("name already taken: {0}")]
    NameTaken(String),

    #[error("resource conflict: {0}")]
    ResourceConflict(String),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("git repository unreachable: {0}")]
    RepoUnreachable(String),

    #[error("domain already bound: {0}")]
    DomainConflict(String),

    #[error("zone not found: {0}")]
    ZoneNotFound(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("deployment timed out waiting for readiness")]
    DeploymentTimeout,

    #[error("deployment entered a terminal failed state: {0}")]
    DeploymentFailed(String),

    #[error("one or more teardown deletes failed: {0}")]
    TeardownPartial(String),
}

impl OrchestratorError {
    /// Transient errors are the only ones worth retrying (§4.1 retry policy).
    pub fn is_transient(&self) -> bool {
        matches!(self, OrchestratorError::BackendUnavailable(_))
    }

    /// A 404 at a delete operation is success, never an error (§4.3 reverse pipeline, §8 invariant 5).
    pub fn is_not_found(&self) -> bool {
        matches!(self, OrchestratorError::NotFound(_))
    }
}

/// Classify a `reqwest` failure/response into the taxonomy above.
///
/// Centralized here so every adapter applies the same 4xx-vs-5xx-vs-network
/// rules instead of re-deriving them per call site.
pub fn classify_http_error(err: &reqwest::Error) -> OrchestratorError {
    if err.is_timeout() || err.is_connect() {
        return OrchestratorError::BackendUnavailable(err.to_string());
    }
    match err.status() {
        Some(status) if status.is_server_error() => {
            OrchestratorError::BackendUnavailable(format!("{status}: {err}"))
        }
        Some(status) if status == reqwest::StatusCode::NOT_FOUND => {
            OrchestratorError::NotFound(err.to_string())
        }
        Some(status) if status == reqwest::StatusCode::CONFLICT => {
            OrchestratorError::NameTaken(err.to_string())
        }
        _ => OrchestratorError::BackendUnavailable(err.to_string()),
    }
}

pub fn classify_status(status: reqwest::StatusCode, body: &str) -> OrchestratorError {
    match status {
        reqwest::StatusCode::NOT_FOUND => OrchestratorError::NotFound(body.to_string()),
        reqwest::StatusCode::CONFLICT => OrchestratorError::NameTaken(body.to_string()),
        reqwest::StatusCode::BAD_REQUEST | reqwest::StatusCode::UNPROCESSABLE_ENTITY => {
            OrchestratorError::Validation(body.to_string())
        }
        s if s.is_server_error() => {
            OrchestratorError::BackendUnavailable(format!("{s}: {body}"))
        }
        s => OrchestratorError::BackendUnavailable(format!("unexpected status {s}: {body}")),
    }
}
