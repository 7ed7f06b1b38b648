//! The reverse pipeline (§4.3): deletes applications, then databases, then
//! the project itself, in that order. A 404 at any delete is success.

use std::time::Duration;

use crate::adapters::Adapters;
use crate::error::OrchestratorError;

const INTER_DELETE_SPACING: Duration = Duration::from_secs(2);
const PROJECT_DELETE_RETRIES: usize = 3;
const PROJECT_DELETE_SPACING: Duration = Duration::from_secs(3);

#[derive(Debug, Default)]
pub struct TeardownReport {
    pub applications_deleted: Vec<String>,
    pub databases_deleted: Vec<String>,
    pub project_deleted: bool,
    pub dns_cleanup_ok: bool,
    pub errors: Vec<String>,
}

/// Lists applications and databases under `project_uuid`, deletes each with
/// the configured spacing, then retries the project delete itself because
/// the backend is eventually consistent about dependent-resource cleanup.
/// DNS cleanup is attempted but never turns the report into a hard error
/// (§4.3 "DNS record cleanup is best-effort and non-fatal").
pub async fn teardown_project(
    adapters: &Adapters,
    project_uuid: &str,
    dns_zone: Option<&str>,
    dns_name: Option<&str>,
) -> TeardownReport {
    let mut report = TeardownReport::default();

    let applications = match adapters.paas.list_applications(project_uuid).await {
        Ok(apps) => apps,
        Err(e) if e.is_not_found() => Vec::new(),
        Err(e) => {
            report.errors.push(format!("failed to list applications: {e}"));
            Vec::new()
        }
    };
    for app in applications {
        delete_one(
            &mut report,
            "application",
            &app,
            adapters.paas.delete_application(&app).await,
        );
        report.applications_deleted.push(app);
        tokio::time::sleep(INTER_DELETE_SPACING).await;
    }

    let databases = match adapters.paas.list_databases(project_uuid).await {
        Ok(dbs) => dbs,
        Err(e) if e.is_not_found() => Vec::new(),
        Err(e) => {
            report.errors.push(format!("failed to list databases: {e}"));
            Vec::new()
        }
    };
    for db in databases {
        delete_one(
            &mut report,
            "database",
            &db,
            adapters.paas.delete_database(&db).await,
        );
        report.databases_deleted.push(db);
        tokio::time::sleep(INTER_DELETE_SPACING).await;
    }

    report.project_deleted = delete_project_with_retries(adapters, project_uuid, &mut report).await;

    if let (Some(zone), Some(name)) = (dns_zone, dns_name) {
        match adapters.dns.delete_record(zone, name, "A").await {
            Ok(()) => report.dns_cleanup_ok = true,
            Err(e) => {
                tracing::warn!(zone, name, error = %e, "DNS cleanup failed during teardown, continuing");
                report.dns_cleanup_ok = false;
            }
        }
    } else {
        report.dns_cleanup_ok = true;
    }

    report
}

fn delete_one(
    report: &mut TeardownReport,
    kind: &str,
    uuid: &str,
    result: Result<(), OrchestratorError>,
) {
    match result {
        Ok(()) => {}
        Err(e) if e.is_not_found() => {}
        Err(e) => {
            tracing::warn!(kind, uuid, error = %e, "teardown delete failed, continuing");
            report.errors.push(format!("{kind} {uuid}: {e}"));
        }
    }
}

async fn delete_project_with_retries(
    adapters: &Adapters,
    project_uuid: &str,
    report: &mut TeardownReport,
) -> bool {
    for attempt in 0..PROJECT_DELETE_RETRIES {
        match adapters.paas.delete_project(project_uuid).await {
            Ok(()) => return true,
            Err(e) if e.is_not_found() => return true,
            Err(e) => {
                tracing::warn!(
                    project_uuid,
                    attempt = attempt + 1,
                    error = %e,
                    "project delete failed, retrying"
                );
                report.errors.push(format!("project delete attempt {}: {e}", attempt + 1));
                if attempt + 1 < PROJECT_DELETE_RETRIES {
                    tokio::time::sleep(PROJECT_DELETE_SPACING).await;
                }
            }
        }
    }
    false
}


