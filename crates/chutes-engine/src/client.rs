//! The discover, plan and send pipeline.

use crate::adapter::{RequestPlan, build_request_body};
use crate::capabilities::ChuteCapabilities;
use crate::classifier::discover_chute_capabilities;
use chutes_core::{
    ChutesConfig, Error, HttpExecutor, OperationFamily, ReqwestExecutor, Result, SemanticFieldBag,
};
use chutes_openapi::SchemaFetcher;
use chutes_telemetry::attributes::{CHUTE_PATH, HTTP_REQUEST_METHOD};
use chutes_telemetry::{chute_request_span, record_response, safe_serialize};
use chutes_transport::{ChuteResponse, ResilientTransport};
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, debug};

/// Client for invoking chutes by operation family.
///
/// Each call runs an independent pipeline: capabilities are discovered
/// fresh, never cached between calls.
///
/// ```rust,no_run
/// use chutes_core::{OperationFamily, SemanticFieldBag};
/// use chutes_engine::ChuteClient;
///
/// # async fn run() -> chutes_core::Result<()> {
/// let client = ChuteClient::new("cpk_...");
/// let fields = SemanticFieldBag::new().with("prompt", "a cat surfing");
/// let response = client
///     .execute(OperationFamily::TextToVideo, "https://chutes-wan2-1-14b.chutes.ai", &fields)
///     .await?;
/// println!("{} bytes of {:?}", response.body.len(), response.content_type());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ChuteClient {
    api_key: String,
    fetcher: SchemaFetcher,
    transport: ResilientTransport,
    timeout: Option<Duration>,
}

impl ChuteClient {
    /// Client with default transport settings and no overall timeout.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_executor(
            Arc::new(ReqwestExecutor::new()),
            api_key,
            &ChutesConfig::default(),
        )
    }

    /// Client built from a loaded configuration.
    pub fn from_config(config: &ChutesConfig) -> Result<Self> {
        let api_key = config.api_key().map_err(|e| Error::config_error(e.to_string()))?;
        Ok(Self::with_executor(
            Arc::new(ReqwestExecutor::new()),
            api_key,
            config,
        ))
    }

    /// Client sharing `executor` between schema fetches and invocations.
    pub fn with_executor(
        executor: Arc<dyn HttpExecutor>,
        api_key: impl Into<String>,
        config: &ChutesConfig,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            fetcher: SchemaFetcher::new(executor.clone()),
            transport: ResilientTransport::new(executor, &config.transport),
            timeout: config.pipeline.timeout(),
        }
    }

    /// Bound the whole pipeline, discovery included.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Transport used for invocations.
    pub fn transport(&self) -> &ResilientTransport {
        &self.transport
    }

    /// Fetch and classify the chute's schema.
    ///
    /// Never fails: an unreachable or unparsable schema yields
    /// [`ChuteCapabilities::fallback`].
    pub async fn discover(&self, base_url: &str) -> ChuteCapabilities {
        discover_chute_capabilities(&self.fetcher, base_url, &self.api_key).await
    }

    /// Discover the chute and translate `fields` for it.
    pub async fn plan(
        &self,
        family: OperationFamily,
        base_url: &str,
        fields: &SemanticFieldBag,
    ) -> Result<RequestPlan> {
        let capabilities = self.discover(base_url).await;
        build_request_body(family, &capabilities, fields, Some(base_url)).ok_or_else(|| {
            Error::UnsupportedOperation {
                family,
                base_url: base_url.to_string(),
            }
        })
    }

    /// Send an already-built plan.
    pub async fn send(&self, plan: &RequestPlan, base_url: &str) -> Result<ChuteResponse> {
        self.transport
            .send(
                plan.method.clone(),
                &plan.endpoint,
                Some(&plan.body),
                base_url,
                &self.api_key,
            )
            .await
    }

    /// Run the full pipeline for one operation.
    ///
    /// Fails with [`Error::UnsupportedOperation`] without touching the
    /// invocation endpoint when the chute lacks `family`, and with
    /// [`Error::Timeout`] when the configured bound elapses.
    pub async fn execute(
        &self,
        family: OperationFamily,
        base_url: &str,
        fields: &SemanticFieldBag,
    ) -> Result<ChuteResponse> {
        let span = chute_request_span(base_url, family.as_str());
        let pipeline = self.run(family, base_url, fields).instrument(span.clone());

        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, pipeline)
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => pipeline.await,
        };

        if let Ok(response) = &result {
            record_response(&span, response.status, response.retries.attempts);
        }
        result
    }

    async fn run(
        &self,
        family: OperationFamily,
        base_url: &str,
        fields: &SemanticFieldBag,
    ) -> Result<ChuteResponse> {
        let plan = self.plan(family, base_url, fields).await?;

        let span = tracing::Span::current();
        span.record(CHUTE_PATH, plan.endpoint.as_str());
        span.record(HTTP_REQUEST_METHOD, plan.method.as_str());
        debug!(
            body = %safe_serialize(&plan.body),
            "Invoking {} at {}{}",
            family,
            base_url,
            plan.endpoint
        );

        self.send(&plan, base_url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chutes_core::testing::{ScriptedExecutor, ScriptedReply, json_response};
    use chutes_core::{HttpRequest, HttpResponse};
    use serde_json::{Value, json};

    const BASE: &str = "https://chutes-lightricks-ltx-video.chutes.ai";

    fn client(executor: Arc<ScriptedExecutor>) -> ChuteClient {
        ChuteClient::with_executor(executor, "cpk_test", &ChutesConfig::test_defaults())
    }

    fn video_schema() -> Value {
        json!({
            "openapi": "3.0.3",
            "info": {"title": "ltx", "version": "1"},
            "paths": {
                "/generate": {
                    "post": {
                        "requestBody": {"content": {"application/json": {"schema": {
                            "type": "object",
                            "properties": {
                                "prompt": {"type": "string"},
                                "num_frames": {"type": "integer"},
                                "fps": {"type": "integer"}
                            }
                        }}}},
                        "responses": {"200": {"description": "ok"}}
                    }
                }
            }
        })
    }

    #[tokio::test]
    async fn test_execute_text_to_video_with_discovery() {
        let executor = Arc::new(
            ScriptedExecutor::new()
                .route("GET", "/openapi.json", [ScriptedReply::from(json_response(200, video_schema()))])
                .route(
                    "POST",
                    "/generate",
                    [ScriptedReply::from(
                        HttpResponse::new(200, b"MP4".to_vec()).with_header("content-type", "video/mp4"),
                    )],
                ),
        );

        let fields = SemanticFieldBag::new()
            .with("prompt", "ocean at dusk")
            .with("frames", 100)
            .with("temperature", 0.3);
        let response = client(executor.clone())
            .execute(OperationFamily::TextToVideo, BASE, &fields)
            .await
            .unwrap();

        assert_eq!(response.body, b"MP4");
        assert_eq!(response.content_type(), Some("video/mp4"));

        let requests = executor.requests();
        assert_eq!(requests.len(), 2);
        let body = requests[1].body.clone().unwrap();
        assert_eq!(
            body,
            json!({"prompt": "ocean at dusk", "num_frames": 105, "chunked_decode": false})
        );
    }

    #[tokio::test]
    async fn test_unsupported_family_never_invokes() {
        let executor = Arc::new(ScriptedExecutor::new().route(
            "GET",
            "/openapi.json",
            [ScriptedReply::from(json_response(200, video_schema()))],
        ));

        let fields = SemanticFieldBag::new().with("image", "aW1n");
        let err = client(executor.clone())
            .execute(OperationFamily::ImageEdit, BASE, &fields)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::UnsupportedOperation {
                family: OperationFamily::ImageEdit,
                ..
            }
        ));
        assert_eq!(executor.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_invocation_recovers() {
        let executor = Arc::new(
            ScriptedExecutor::new()
                .route("GET", "/openapi.json", [ScriptedReply::from(HttpResponse::new(404, Vec::new()))])
                .route(
                    "POST",
                    "/generate",
                    [
                        ScriptedReply::from(HttpResponse::new(429, Vec::new())),
                        ScriptedReply::from(HttpResponse::new(429, Vec::new())),
                        ScriptedReply::from(json_response(200, json!({"ok": true}))),
                    ],
                ),
        );

        let fields = SemanticFieldBag::new().with("prompt", "a cat");
        let response = client(executor.clone())
            .execute(OperationFamily::TextToVideo, "https://c.chutes.ai", &fields)
            .await
            .unwrap();

        assert_eq!(response.json::<Value>().unwrap()["ok"], true);
        assert_eq!(
            response.retries.delays,
            vec![Duration::from_millis(10), Duration::from_millis(20)]
        );
        assert_eq!(executor.count("/generate"), 3);
    }

    struct SlowExecutor;

    #[async_trait]
    impl HttpExecutor for SlowExecutor {
        async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse> {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Ok(HttpResponse::new(404, Vec::new()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pipeline_timeout() {
        let client = ChuteClient::with_executor(
            Arc::new(SlowExecutor),
            "cpk_test",
            &ChutesConfig::test_defaults(),
        )
        .with_timeout(Duration::from_secs(4));

        let err = client
            .execute(
                OperationFamily::Generate,
                "https://c.chutes.ai",
                &SemanticFieldBag::new().with("prompt", "x"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Timeout(d) if d == Duration::from_secs(4)));
    }

    #[tokio::test]
    async fn test_plan_on_fallback() {
        let executor = Arc::new(ScriptedExecutor::new().then_status(503));
        let plan = client(executor)
            .plan(
                OperationFamily::ImageToVideo,
                "https://c.chutes.ai",
                &SemanticFieldBag::new().with("images", vec!["YQ==", "Yg=="]),
            )
            .await
            .unwrap();

        assert_eq!(plan.endpoint, "/generate");
        assert_eq!(plan.body, json!({"image_b64s": ["YQ==", "Yg=="]}));
    }
}
