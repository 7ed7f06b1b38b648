//! Pure, local validation run before any remote call (§3 invariants, VALIDATE step).

use std::sync::LazyLock;

use regex::Regex;

use crate::error::OrchestratorError;
use crate::model::DeploymentSpec;

static PROJECT_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("valid regex"));

const MAX_PROJECT_NAME_LEN: usize = 63;

pub fn validate_project_name(name: &str) -> Result<(), OrchestratorError> {
    if name.is_empty() || name.len() > MAX_PROJECT_NAME_LEN {
        return Err(OrchestratorError::Validation(format!(
            "projectName must be 1-{MAX_PROJECT_NAME_LEN} characters, got {}",
            name.len()
        )));
    }
    if !PROJECT_NAME_RE.is_match(name) {
        return Err(OrchestratorError::Validation(format!(
            "projectName '{name}' must match [a-z0-9]([-a-z0-9]*[a-z0-9])?"
        )));
    }
    Ok(())
}

pub fn validate_custom_domain(domain: &str) -> Result<(), OrchestratorError> {
    if domain.is_empty() {
        return Ok(());
    }
    let looks_like_host = domain
        .split('.')
        .all(|label| !label.is_empty() && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));
    if !looks_like_host || !domain.contains('.') {
        return Err(OrchestratorError::Validation(format!(
            "customDomain '{domain}' is not a valid hostname"
        )));
    }
    Ok(())
}

pub fn validate_build_pack(build_pack: &str) -> Result<(), OrchestratorError> {
    match build_pack {
        "nixpacks" | "dockerfile" | "static" => Ok(()),
        other => Err(OrchestratorError::Validation(format!(
            "buildPack '{other}' must be one of nixpacks, dockerfile, static"
        ))),
    }
}

/// The VALIDATE step: everything that can be rejected before any external call.
pub fn validate_spec(spec: &DeploymentSpec) -> Result<(), OrchestratorError> {
    validate_project_name(&spec.project_name)?;
    if let Some(domain) = &spec.custom_domain {
        validate_custom_domain(domain)?;
    }
    validate_build_pack(&spec.build_pack)?;

    let mut seen = std::collections::HashSet::new();
    for db in &spec.databases {
        if db.name.is_empty() {
            return Err(OrchestratorError::Validation(
                "database name must not be empty".to_string(),
            ));
        }
        if !seen.insert(db.name.clone()) {
            return Err(OrchestratorError::Validation(format!(
                "duplicate database name '{}'",
                db.name
            )));
        }
    }
    Ok(())
}
