use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::{debug, warn};

use super::{CatalogError, CatalogKind, ListRecord};
use crate::config::{CatalogConfig, CatalogEndpoint};

/// Header carrying the access key for document stores that require one.
pub const MASTER_KEY_HEADER: &str = "X-Master-Key";

#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_records(&self, kind: CatalogKind) -> Result<Vec<ListRecord>, CatalogError>;
}

#[derive(Clone)]
pub struct HttpCatalogSource {
    http: reqwest::Client,
    endpoints: CatalogConfig,
}

impl HttpCatalogSource {
    pub fn new(endpoints: CatalogConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().user_agent("datadada-catalog").build()?;
        Ok(Self { http, endpoints })
    }

    fn endpoint(&self, kind: CatalogKind) -> &CatalogEndpoint {
        match kind {
            CatalogKind::Dashboards => &self.endpoints.dashboards,
            CatalogKind::DataSources => &self.endpoints.data_sources,
        }
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch_records(&self, kind: CatalogKind) -> Result<Vec<ListRecord>, CatalogError> {
        let endpoint = self.endpoint(kind);
        debug!(
            event_name = "catalog.fetch.start",
            catalog = kind.field_name(),
            url = %endpoint.url,
            "fetching catalog"
        );

        let mut request = self.http.get(&endpoint.url);
        if let Some(master_key) = &endpoint.master_key {
            request = request.header(MASTER_KEY_HEADER, master_key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|error| CatalogError::Fetch { kind, message: error.to_string() })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                event_name = "catalog.fetch.status",
                catalog = kind.field_name(),
                status = status.as_u16(),
                body = %truncate(&body, 240),
                "catalog endpoint returned a non-success status"
            );
            return Err(CatalogError::Fetch {
                kind,
                message: format!("unexpected status {status}"),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|error| CatalogError::Fetch { kind, message: error.to_string() })?;
        let document = serde_json::from_str::<Value>(&body).map_err(|error| {
            CatalogError::Schema { kind, reason: format!("response body is not JSON: {error}") }
        })?;

        let records = extract_records(kind, &document)?;
        debug!(
            event_name = "catalog.fetch.done",
            catalog = kind.field_name(),
            record_count = records.len(),
            "catalog fetched"
        );
        Ok(records)
    }
}

/// Pulls the record array out of a catalog document. Document stores wrap the
/// stored JSON in a top-level `record` object, so that location is also checked.
pub fn extract_records(
    kind: CatalogKind,
    document: &Value,
) -> Result<Vec<ListRecord>, CatalogError> {
    let field = kind.field_name();
    let located =
        document.get(field).or_else(|| document.get("record").and_then(|inner| inner.get(field)));

    match located {
        Some(Value::Array(items)) => Ok(items.iter().map(ListRecord::from_value).collect()),
        Some(_) => Err(CatalogError::Schema { kind, reason: format!("`{field}` is not an array") }),
        None => Err(CatalogError::Schema {
            kind,
            reason: format!("`{field}` not found in response"),
        }),
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_owned();
    }
    let mut truncated: String = value.chars().take(max_chars).collect();
    truncated.push('…');
    truncated
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::{extract_records, CatalogSource, HttpCatalogSource, MASTER_KEY_HEADER};
    use crate::catalog::{CatalogError, CatalogKind};
    use crate::config::{CatalogConfig, CatalogEndpoint};

    fn source_for(server: &MockServer) -> HttpCatalogSource {
        HttpCatalogSource::new(CatalogConfig {
            dashboards: CatalogEndpoint::public(server.url("/dashboard.json")),
            data_sources: CatalogEndpoint {
                url: server.url("/b/data-sources"),
                master_key: Some("doc-key".to_string().into()),
            },
        })
        .expect("client")
    }

    #[tokio::test]
    async fn fetches_dashboards_from_top_level_field() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/dashboard.json");
            then.status(200).json_body(json!({
                "dashboards": [
                    {"title": "Sales", "url": "http://x/1", "description": "Q3 sales"},
                    {"title": "Reach", "description": "Weekly reach"}
                ]
            }));
        });

        let records =
            source_for(&server).fetch_records(CatalogKind::Dashboards).await.expect("records");

        assert_eq!(mock.calls(), 1);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].url.as_deref(), Some("http://x/1"));
        assert_eq!(records[1].url, None);
    }

    #[tokio::test]
    async fn document_store_requests_send_master_key_and_unwrap_record() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/b/data-sources").header(MASTER_KEY_HEADER, "doc-key");
            then.status(200).json_body(json!({
                "record": {"data_sources": [{"title": "Surveys", "description": "Raw survey data"}]},
                "metadata": {"id": "abc"}
            }));
        });

        let records =
            source_for(&server).fetch_records(CatalogKind::DataSources).await.expect("records");

        assert_eq!(mock.calls(), 1);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Surveys");
    }

    #[tokio::test]
    async fn non_success_status_is_a_fetch_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/dashboard.json");
            then.status(503).body("maintenance");
        });

        let error = source_for(&server)
            .fetch_records(CatalogKind::Dashboards)
            .await
            .expect_err("503 must fail");

        assert!(matches!(error, CatalogError::Fetch { kind: CatalogKind::Dashboards, .. }));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_fetch_error() {
        let source = HttpCatalogSource::new(CatalogConfig {
            dashboards: CatalogEndpoint::public("http://127.0.0.1:9/dashboard.json"),
            data_sources: CatalogEndpoint::public("http://127.0.0.1:9/data_sources.json"),
        })
        .expect("client");

        let error = source.fetch_records(CatalogKind::Dashboards).await.expect_err("must fail");
        assert!(matches!(error, CatalogError::Fetch { .. }));
    }

    #[tokio::test]
    async fn missing_field_is_a_schema_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/dashboard.json");
            then.status(200).json_body(json!({"reports": []}));
        });

        let error = source_for(&server)
            .fetch_records(CatalogKind::Dashboards)
            .await
            .expect_err("missing field must fail");

        assert!(matches!(error, CatalogError::Schema { kind: CatalogKind::Dashboards, .. }));
    }

    #[tokio::test]
    async fn non_json_body_is_a_schema_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/dashboard.json");
            then.status(200).body("<html>not json</html>");
        });

        let error = source_for(&server)
            .fetch_records(CatalogKind::Dashboards)
            .await
            .expect_err("html must fail");

        assert!(matches!(error, CatalogError::Schema { .. }));
    }

    #[test]
    fn field_that_is_not_an_array_is_rejected() {
        let error = extract_records(CatalogKind::Dashboards, &json!({"dashboards": {"a": 1}}))
            .expect_err("object is not a list");
        assert!(error.to_string().contains("not an array"));
    }

    #[test]
    fn empty_array_is_valid() {
        let records =
            extract_records(CatalogKind::DataSources, &json!({"data_sources": []})).expect("ok");
        assert!(records.is_empty());
    }
}
