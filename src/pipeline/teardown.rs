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

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::adapters::dns::DnsAdapter;
    use crate::adapters::local_exec::LocalExecutor;
    use crate::adapters::paas::PaasAdapter;
    use crate::adapters::proxy::ReverseProxyAdapter;

    async fn test_adapters(paas: &MockServer, dns: &MockServer) -> Adapters {
        let paas_adapter =
            PaasAdapter::new(paas.uri(), &SecretString::from("paas-token".to_string()), "server-uuid-1").unwrap();
        let dns_adapter = DnsAdapter::new(dns.uri(), &SecretString::from("dns-key".to_string())).unwrap();
        let local = LocalExecutor::new(vec![]);
        let proxy = ReverseProxyAdapter::new("/etc/caddy/sites".to_string(), local.clone());
        Adapters {
            paas: paas_adapter,
            dns: dns_adapter,
            proxy,
            local,
        }
    }

    /// Scenario F (§8): 1 app + 2 DBs. Deletes go app, db, db, then project;
    /// the project delete is retried on 409 up to 3 times before succeeding.
    #[tokio::test(start_paused = true)]
    async fn scenario_f_tears_down_one_app_and_two_databases_then_project() {
        let paas = MockServer::start().await;
        let dns = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/projects/proj-1/applications"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "uuid": "app-1" },
            ])))
            .mount(&paas)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/applications/app-1"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&paas)
            .await;

        Mock::given(method("GET"))
            .and(path("/projects/proj-1/databases"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "uuid": "db-1" },
                { "uuid": "db-2" },
            ])))
            .mount(&paas)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/databases/db-1"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&paas)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/databases/db-2"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&paas)
            .await;

        // Project delete: 409 twice, then succeeds on the third attempt.
        Mock::given(method("DELETE"))
            .and(path("/projects/proj-1"))
            .respond_with(ResponseTemplate::new(409))
            .up_to_n_times(2)
            .mount(&paas)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/projects/proj-1"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&paas)
            .await;

        let adapters = test_adapters(&paas, &dns).await;
        let report = teardown_project(&adapters, "proj-1", None, None).await;

        assert_eq!(report.applications_deleted, vec!["app-1".to_string()]);
        assert_eq!(report.databases_deleted, vec!["db-1".to_string(), "db-2".to_string()]);
        assert!(report.project_deleted);
        assert!(report.dns_cleanup_ok);

        let requests = paas.received_requests().await.unwrap();
        let delete_order: Vec<String> = requests
            .iter()
            .filter(|r| r.method.as_str() == "DELETE")
            .map(|r| r.url.path().to_string())
            .collect();
        assert_eq!(
            delete_order,
            vec![
                "/applications/app-1".to_string(),
                "/databases/db-1".to_string(),
                "/databases/db-2".to_string(),
                "/projects/proj-1".to_string(),
                "/projects/proj-1".to_string(),
                "/projects/proj-1".to_string(),
            ]
        );
    }
}
