//! HTTP executor seam shared by the schema fetcher and the transport.
//!
//! Everything that talks to a chute goes through [`HttpExecutor`], so tests can
//! swap the network for a scripted sequence of responses.

use crate::{AuthConfig, Error, Result, RetryMetadata};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// A fully resolved outgoing request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute URL, base and path already joined
    pub url: String,
    /// Headers in insertion order; duplicates are sent as-is
    pub headers: Vec<(String, String)>,
    /// JSON body, if any
    pub body: Option<Value>,
    /// Per-request timeout applied by the executor
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// POST with a JSON body and matching `Content-Type`.
    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, url).with_json(body)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the JSON body and the `Content-Type` header.
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self.with_header("Content-Type", "application/json")
    }

    /// Attach the credential header for `auth`, if it has one.
    pub fn with_auth(self, auth: &AuthConfig) -> Self {
        match auth.header() {
            Some((name, value)) => self.with_header(name, value),
            None => self,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// First header value with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Raw response from a chute.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names are stored lowercase
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Executes one HTTP request without any retry logic.
///
/// Schema fetches and invocations both go through this seam, so tests can
/// substitute [`crate::testing::ScriptedExecutor`] for the network.
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    /// Send `request` and return whatever the server answered.
    ///
    /// Non-2xx statuses are returned as responses, not errors. Connection
    /// failures map to [`crate::Error::Unavailable`] and an elapsed request
    /// timeout to [`crate::Error::Timeout`].
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// [`HttpExecutor`] backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestExecutor {
    client: reqwest::Client,
}

impl ReqwestExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse an existing client and its connection pool.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpExecutor for ReqwestExecutor {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self.client.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(serde_json::to_vec(body)?);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(e, request.timeout))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(e, request.timeout))?
            .to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn transport_error(err: reqwest::Error, timeout: Option<Duration>) -> Error {
    match timeout {
        Some(timeout) if err.is_timeout() => Error::Timeout(timeout),
        _ => Error::Unavailable {
            status: None,
            message: err.to_string(),
            retries: RetryMetadata::default(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builder() {
        let request = HttpRequest::post("https://x.chutes.ai/generate", json!({"prompt": "a"}))
            .with_auth(&AuthConfig::bearer("k"))
            .with_timeout(Duration::from_secs(2));

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("authorization"), Some("Bearer k"));
        assert_eq!(request.timeout, Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_response_helpers() {
        let response = HttpResponse::new(200, br#"{"ok": true}"#.to_vec())
            .with_header("Content-Type", "application/json");
        assert!(response.is_success());
        assert_eq!(response.content_type(), Some("application/json"));
        let value: Value = response.json().unwrap();
        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn test_reqwest_executor_sends_headers_and_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/generate")
            .match_header("authorization", "Bearer k")
            .match_body(mockito::Matcher::Json(json!({"prompt": "a cat"})))
            .with_status(200)
            .with_header("x-ratelimit-remaining", "42")
            .with_body("done")
            .create_async()
            .await;

        let executor = ReqwestExecutor::new();
        let request = HttpRequest::post(
            format!("{}/generate", server.url()),
            json!({"prompt": "a cat"}),
        )
        .with_auth(&AuthConfig::bearer("k"));
        let response = executor.execute(request).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.header("X-RateLimit-Remaining"), Some("42"));
        assert_eq!(response.text(), "done");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_connection_failure_is_unavailable() {
        let executor = ReqwestExecutor::new();
        let err = executor
            .execute(HttpRequest::get("http://127.0.0.1:1/openapi.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unavailable { status: None, .. }));
    }
}
