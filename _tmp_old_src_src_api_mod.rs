pub mod types;

use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;

use crate::AppState;
use crate::model::{DeploymentContext, DeploymentSpec, compute_full_domain};
use crate::pipeline::{DeploymentPipeline, PipelineState, teardown_project};
use types::{
    DeleteProjectResponse, HealthResponse, ProjectListItem, ServicesHealth,
    render_failure_response, render_success_response,
};

/// Builds the `/api` router (§6 HTTP surface).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/deploy/complete", post(deploy_complete))
        .route("/projects", get(list_projects))
        .route("/projects/{uuid}", delete(delete_project))
}

/// Authenticates a request against the single shared API token (§4.4).
/// Accepts `x-api-key` or `Authorization: Bearer <token>`.
pub struct ApiToken;

impl axum::extract::FromRequestParts<AppState> for ApiToken {
    type Rejection = (StatusCode, Json<serde_json::Value>);

    fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        use secrecy::ExposeSecret;
        let provided = parts
            .headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .or_else(|| {
                parts
                    .headers
                    .get(axum::http::header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.strip_prefix("Bearer ").map(|s| s.to_string()))
            });

        let expected = state.config.api_token.expose_secret().to_string();

        async move {
            match provided {
                Some(token) if token == expected => Ok(ApiToken),
                _ => Err((
                    StatusCode::UNAUTHORIZED,
                    Json(serde_json::json!({ "error": "missing or invalid API token" })),
                )),
            }
        }
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let paas_ok = state.adapters.paas.list_projects().await.is_ok();
    let dns_ok = state
        .adapters
        .dns
        .list_records(&state.config.base_domain)
        .await
        .is_ok();

    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339(),
        services: ServicesHealth {
            api: true,
            paas: paas_ok,
            dns: dns_ok,
        },
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// The wall-clock soft budget for one deployment request: sum of step
/// timeouts plus the WAIT_READY budget (§5 "~12 minutes worst case").
fn deployment_wall_clock_budget(wait_ready_budget_secs: u64) -> Duration {
    Duration::from_secs(wait_ready_budget_secs + 4 * 60)
}

async fn deploy_complete(
    State(state): State<AppState>,
    _auth: ApiToken,
    Json(spec): Json<DeploymentSpec>,
) -> Response {
    let full_domain = compute_full_domain(&spec, &state.config.base_domain);
    let mut ctx = DeploymentContext::new(spec, full_domain);

    let pipeline = DeploymentPipeline::new(state.adapters.as_ref(), state.config.as_ref());
    let budget = deployment_wall_clock_budget(state.config.wait_ready_budget_secs);

    let outcome = tokio::time::timeout(budget, pipeline.run(&mut ctx)).await;

    let deployed_at = Utc::now().to_rfc3339();
    match outcome {
        Ok(result) => match result.state {
            PipelineState::Succeeded | PipelineState::Partial => {
                let body = render_success_response(&ctx, &state.config.paas_url, deployed_at);
                (StatusCode::OK, Json(body)).into_response()
            }
            PipelineState::Failed => {
                let details = result.last_error.unwrap_or_else(|| "unknown error".to_string());
                let body = render_failure_response(&ctx, details);
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        },
        Err(_) => {
            // Wall-clock budget exhausted with no step able to finish in time;
            // the handler must never block indefinitely (§5 cancellation note).
            let body = render_failure_response(
                &ctx,
                format!(
                    "deployment exceeded the {}s wall-clock budget",
                    budget.as_secs()
                ),
            );
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

async fn list_projects(
    State(state): State<AppState>,
    _auth: ApiToken,
) -> Result<Json<Vec<ProjectListItem>>, (StatusCode, String)> {
    let projects = state
        .adapters
        .paas
        .list_projects()
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string()))?;

    // `fqdn` is synthesized from the project name regardless of actual domain
    // binding — a known cosmetic inaccuracy carried over deliberately (§9
    // Design Notes open question 4; see DESIGN.md).
    let items = projects
        .into_iter()
        .map(|p| ProjectListItem {
            fqdn: format!("{}.{}", p.name, state.config.base_domain),
            name: p.name,
            uuid: p.uuid,
            status: "unknown".to_string(),
            created_at: p.created_at,
        })
        .collect();

    Ok(Json(items))
}

async fn delete_project(
    State(state): State<AppState>,
    _auth: ApiToken,
    Path(uuid): Path<String>,
) -> Json<DeleteProjectResponse> {
    let dns_name = state
        .adapters
        .paas
        .get_project_details(&uuid)
        .await
        .ok()
        .map(|p| p.name);

    let zone = state.config.base_domain.clone();
    let report = teardown_project(state.adapters.as_ref(), &uuid, Some(&zone), dns_name.as_deref()).await;

    if !report.errors.is_empty() {
        tracing::warn!(project_uuid = %uuid, errors = ?report.errors, "teardown completed with partial errors");
    }

    Json(DeleteProjectResponse {
        message: format!("Project {uuid} deleted successfully"),
    })
}


