//! Best-effort retrieval of a chute's schema document.

use crate::parser::SchemaParser;
use crate::types::SchemaDocument;
use chutes_core::{AuthConfig, HttpExecutor, HttpRequest, ReqwestExecutor};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Well-known sub-path of the schema document.
pub const SCHEMA_PATH: &str = "/openapi.json";

/// Upper bound on one schema fetch; not configurable.
pub const SCHEMA_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of a schema fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaFetch {
    Available(SchemaDocument),
    /// Why the document could not be used
    Unavailable(String),
}

impl SchemaFetch {
    pub fn is_available(&self) -> bool {
        matches!(self, SchemaFetch::Available(_))
    }

    pub fn document(&self) -> Option<&SchemaDocument> {
        match self {
            SchemaFetch::Available(doc) => Some(doc),
            SchemaFetch::Unavailable(_) => None,
        }
    }
}

/// Fetches `/openapi.json` from a chute.
///
/// Never fails: network errors, non-2xx statuses, timeouts and unparseable
/// documents all come back as [`SchemaFetch::Unavailable`]. There is no retry.
#[derive(Clone)]
pub struct SchemaFetcher {
    executor: Arc<dyn HttpExecutor>,
}

impl SchemaFetcher {
    pub fn new(executor: Arc<dyn HttpExecutor>) -> Self {
        Self { executor }
    }

    /// Fetch and parse the schema document of the chute at `base_url`.
    pub async fn fetch_schema(&self, base_url: &str, api_key: &str) -> SchemaFetch {
        let url = format!("{}{}", base_url.trim_end_matches('/'), SCHEMA_PATH);
        let request = HttpRequest::get(&url)
            .with_auth(&AuthConfig::from_api_key(api_key))
            .with_timeout(SCHEMA_TIMEOUT);

        let outcome = match tokio::time::timeout(SCHEMA_TIMEOUT, self.executor.execute(request)).await
        {
            Err(_) => SchemaFetch::Unavailable(format!("timed out after {:?}", SCHEMA_TIMEOUT)),
            Ok(Err(e)) => SchemaFetch::Unavailable(e.to_string()),
            Ok(Ok(response)) if !response.is_success() => {
                SchemaFetch::Unavailable(format!("status {}", response.status))
            }
            Ok(Ok(response)) => {
                match SchemaParser::from_slice(&response.body).and_then(|p| p.parse()) {
                    Ok(document) => SchemaFetch::Available(document),
                    Err(e) => SchemaFetch::Unavailable(e.to_string()),
                }
            }
        };

        match &outcome {
            SchemaFetch::Available(doc) => {
                debug!("Fetched schema for {} ({} endpoints)", url, doc.endpoints.len())
            }
            SchemaFetch::Unavailable(reason) => {
                debug!("Schema for {} unavailable: {}", url, reason)
            }
        }

        outcome
    }
}

impl Default for SchemaFetcher {
    fn default() -> Self {
        Self::new(Arc::new(ReqwestExecutor::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chutes_core::testing::{ScriptedExecutor, json_response};
    use chutes_core::HttpResponse;
    use serde_json::json;

    const SPEC_JSON: &str = r#"{
        "openapi": "3.0.0",
        "info": {"title": "flux-dev", "version": "1"},
        "paths": {
            "/generate": {
                "post": {
                    "requestBody": {
                        "content": {
                            "application/json": {
                                "schema": {
                                    "type": "object",
                                    "properties": {
                                        "prompt": {"type": "string"},
                                        "width": {"type": "integer"},
                                        "height": {"type": "integer"}
                                    }
                                }
                            }
                        }
                    },
                    "responses": {"200": {"description": "image"}}
                }
            }
        }
    }"#;

    #[tokio::test]
    async fn test_fetch_schema_over_http() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/openapi.json")
            .match_header("authorization", "Bearer cpk_test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(SPEC_JSON)
            .create_async()
            .await;

        let fetcher = SchemaFetcher::default();
        let fetch = fetcher.fetch_schema(&server.url(), "cpk_test").await;

        mock.assert_async().await;
        let doc = fetch.document().unwrap();
        assert_eq!(doc.endpoints.len(), 1);
        assert!(doc.endpoints[0].declares("width"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/openapi.json")
            .with_status(404)
            .create_async()
            .await;

        let fetch = SchemaFetcher::default()
            .fetch_schema(&server.url(), "k")
            .await;
        assert_eq!(fetch, SchemaFetch::Unavailable("status 404".to_string()));
    }

    #[tokio::test]
    async fn test_malformed_document_is_unavailable() {
        let executor = ScriptedExecutor::new()
            .with_responses([json_response(200, json!({"detail": "not here"}))]);
        let fetch = SchemaFetcher::new(Arc::new(executor))
            .fetch_schema("https://x.chutes.ai", "k")
            .await;
        assert!(!fetch.is_available());
    }

    #[tokio::test]
    async fn test_network_error_is_unavailable() {
        let executor = Arc::new(ScriptedExecutor::new());
        let fetch = SchemaFetcher::new(executor.clone())
            .fetch_schema("https://x.chutes.ai/", "k")
            .await;
        assert!(!fetch.is_available());
        assert_eq!(executor.count("https://x.chutes.ai/openapi.json"), 1);
    }

    struct HangingExecutor;

    #[async_trait]
    impl HttpExecutor for HangingExecutor {
        async fn execute(&self, _request: HttpRequest) -> chutes_core::Result<HttpResponse> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(HttpResponse::new(200, Vec::new()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_chute_times_out() {
        let fetch = SchemaFetcher::new(Arc::new(HangingExecutor))
            .fetch_schema("https://slow.chutes.ai", "k")
            .await;
        assert!(matches!(fetch, SchemaFetch::Unavailable(reason) if reason.contains("timed out")));
    }
}
