//! PowerDNS authoritative DNS adapter (§4.1.2).
//!
//! Zone and record names are sent with a trailing dot; A-record content is
//! the raw IPv4 string (no quotes). Auth via `X-API-Key`.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::error::{OrchestratorError, classify_http_error, classify_status};
use crate::retry::with_retries;

const DEFAULT_TTL: u32 = 300;

/// Builds the fully-qualified, trailing-dot rrset name PowerDNS expects. `name`
/// is the bare subdomain (e.g. a project name); if it's already fully
/// qualified within `zone` (already ends with the zone), it's used as-is.
fn record_fqdn(zone: &str, name: &str) -> String {
    let zone = zone.trim_end_matches('.');
    let name = name.trim_end_matches('.');
    if name == zone || name.ends_with(&format!(".{zone}")) {
        format!("{name}.")
    } else {
        format!("{name}.{zone}.")
    }
}

#[derive(Clone)]
pub struct DnsAdapter {
    base_url: String,
    client: reqwest::Client,
}

impl DnsAdapter {
    pub fn new(base_url: impl Into<String>, api_key: &SecretString) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key.expose_secret())?;
        key.set_sensitive(true);
        headers.insert(HeaderName::from_static("x-api-key"), key);

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    fn rrsets_url(&self, zone: &str) -> String {
        format!("{}/zones/{}./rrsets", self.base_url.trim_end_matches('/'), zone.trim_end_matches('.'))
    }

    /// Creates or replaces an A rrset for `name` in `zone` (default TTL 300s).
    #[instrument(skip(self))]
    pub async fn upsert_a_record(
        &self,
        zone: &str,
        name: &str,
        ipv4: &str,
        ttl: Option<u32>,
    ) -> Result<(), OrchestratorError> {
        let ttl = ttl.unwrap_or(DEFAULT_TTL);
        let fqdn = record_fqdn(zone, name);

        with_retries("dns_upsert_a_record", || async {
            let resp = self
                .client
                .patch(self.rrsets_url(zone))
                .json(&json!({
                    "rrsets": [{
                        "name": fqdn,
                        "type": "A",
                        "ttl": ttl,
                        "changetype": "REPLACE",
                        "records": [{ "content": ipv4, "disabled": false }],
                    }]
                }))
                .send()
                .await
                .map_err(|e| classify_http_error(&e))?;

            let status = resp.status();
            if status.is_success() {
                return Ok(());
            }
            let body = resp.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(OrchestratorError::ZoneNotFound(body));
            }
            Err(classify_status(status, &body))
        })
        .await
    }

    /// A 404 is treated as success, matching the reverse-pipeline delete contract.
    #[instrument(skip(self))]
    pub async fn delete_record(&self, zone: &str, name: &str, record_type: &str) -> Result<(), OrchestratorError> {
        let fqdn = record_fqdn(zone, name);

        let resp = self
            .client
            .patch(self.rrsets_url(zone))
            .json(&json!({
                "rrsets": [{
                    "name": fqdn,
                    "type": record_type,
                    "changetype": "DELETE",
                }]
            }))
            .send()
            .await
            .map_err(|e| classify_http_error(&e))?;

        let status = resp.status();
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(classify_status(status, &body))
    }

    #[instrument(skip(self))]
    pub async fn list_records(&self, zone: &str) -> Result<Vec<RrSet>, OrchestratorError> {
        let resp = self
            .client
            .get(format!(
                "{}/zones/{}.",
                self.base_url.trim_end_matches('/'),
                zone.trim_end_matches('.')
            ))
            .send()
            .await
            .map_err(|e| classify_http_error(&e))?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(OrchestratorError::ZoneNotFound(body));
            }
            return Err(classify_status(status, &body));
        }
        let zone_doc: ZoneDocument = serde_json::from_str(&body).map_err(|e| {
            OrchestratorError::BackendUnavailable(format!("malformed zone document: {e}"))
        })?;
        Ok(zone_doc.rrsets)
    }
}

#[derive(Debug, Deserialize)]
struct ZoneDocument {
    #[serde(default)]
    rrsets: Vec<RrSet>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RrSet {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub ttl: u32,
    pub records: Vec<RecordContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordContent {
    pub content: String,
    #[serde(default)]
    pub disabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_fqdn_joins_subdomain_and_zone_with_trailing_dot() {
        assert_eq!(record_fqdn("example.com", "demo-a"), "demo-a.example.com.");
        assert_eq!(record_fqdn("example.com.", "demo-a"), "demo-a.example.com.");
    }

    #[test]
    fn record_fqdn_leaves_already_qualified_names_alone() {
        assert_eq!(
            record_fqdn("example.com", "demo-a.example.com"),
            "demo-a.example.com."
        );
        assert_eq!(record_fqdn("example.com", "example.com"), "example.com.");
    }
}

#[cfg(test)]
mod integration_tests {
    use secrecy::SecretString;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn adapter(mock_server: &MockServer) -> DnsAdapter {
        DnsAdapter::new(mock_server.uri(), &SecretString::from("dns-key".to_string())).unwrap()
    }

    #[tokio::test]
    async fn upsert_a_record_sends_fully_qualified_name_and_raw_ip() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/zones/example.com./rrsets"))
            .and(header("x-api-key", "dns-key"))
            .and(body_partial_json(serde_json::json!({
                "rrsets": [{
                    "name": "demo-a.example.com.",
                    "type": "A",
                    "ttl": 300,
                    "changetype": "REPLACE",
                    "records": [{"content": "203.0.113.9", "disabled": false}],
                }]
            })))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        let dns = adapter(&mock_server).await;
        dns.upsert_a_record("example.com", "demo-a", "203.0.113.9", None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn delete_record_treats_not_found_as_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/zones/example.com./rrsets"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let dns = adapter(&mock_server).await;
        assert!(dns.delete_record("example.com", "demo-a", "A").await.is_ok());
    }

    #[tokio::test]
    async fn upsert_a_record_retries_on_5xx_then_succeeds() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/zones/example.com./rrsets"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/zones/example.com./rrsets"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        let dns = adapter(&mock_server).await;
        dns.upsert_a_record("example.com", "demo-a", "203.0.113.9", None)
            .await
            .unwrap();
    }
}
