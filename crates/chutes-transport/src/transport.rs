//! One authenticated call to a chute, retried on rate limiting.

use crate::retry::RetryPolicy;
use chutes_core::{
    AuthConfig, Error, HttpExecutor, HttpRequest, HttpResponse, ReqwestExecutor, Result,
    RetryMetadata, TransportConfig, error_message_from_body,
};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Header carrying the remaining request budget.
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Successful chute response.
///
/// The body may be JSON or raw media bytes; deciding which is up to the caller.
#[derive(Debug, Clone)]
pub struct ChuteResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub retries: RetryMetadata,
}

impl ChuteResponse {
    fn new(response: HttpResponse, retries: RetryMetadata) -> Self {
        Self {
            status: response.status,
            headers: response.headers,
            body: response.body,
            retries,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Whether the content type announces JSON.
    pub fn is_json(&self) -> bool {
        self.content_type()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"))
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends requests to chutes with auth, a fixed client identifier and
/// bounded 429 retries.
#[derive(Clone)]
pub struct ResilientTransport {
    executor: Arc<dyn HttpExecutor>,
    policy: RetryPolicy,
    rate_limit_low_water: u64,
    client_id: String,
}

impl ResilientTransport {
    pub fn new(executor: Arc<dyn HttpExecutor>, config: &TransportConfig) -> Self {
        Self {
            executor,
            policy: RetryPolicy::from(config),
            rate_limit_low_water: config.rate_limit_low_water,
            client_id: config.client_id.clone(),
        }
    }

    /// Override the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Issue `method {base_url}{path}` with the given JSON body.
    ///
    /// 429 responses are retried up to the policy bound with exponential
    /// backoff; any other failure is returned immediately. When retries run
    /// out the last rate-limit error is returned.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        base_url: &str,
        api_key: &str,
    ) -> Result<ChuteResponse> {
        let url = join_url(base_url, path);
        let auth = AuthConfig::from_api_key(api_key);
        let mut retries = RetryMetadata::default();

        loop {
            let request = self.build_request(method.clone(), &url, body, &auth);
            debug!("{} {} (retry {})", method, url, retries.attempts);

            let response = match self.executor.execute(request).await {
                Ok(response) => response,
                Err(e) => return Err(attach_retries(e, retries)),
            };

            self.check_rate_limit(&url, &response);

            if response.is_success() {
                return Ok(ChuteResponse::new(response, retries));
            }

            if self.policy.should_retry(response.status, retries.attempts) {
                let delay = self.policy.backoff_delay(retries.attempts);
                warn!(
                    "{} rate limited, retrying in {:?} ({}/{})",
                    url,
                    delay,
                    retries.attempts + 1,
                    self.policy.max_retries
                );
                tokio::time::sleep(delay).await;
                retries.record(delay);
                continue;
            }

            let message = error_message_from_body(&response.body);
            return Err(Error::from_status(response.status, message, retries));
        }
    }

    fn build_request(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        auth: &AuthConfig,
    ) -> HttpRequest {
        let request = HttpRequest::new(method, url)
            .with_header("User-Agent", self.client_id.as_str())
            .with_auth(auth);
        match body {
            Some(body) => request.with_json(body.clone()),
            None => request.with_header("Content-Type", "application/json"),
        }
    }

    fn check_rate_limit(&self, url: &str, response: &HttpResponse) {
        if let Some(remaining) = rate_limit_remaining(response) {
            if remaining < self.rate_limit_low_water {
                warn!(
                    "Rate limit nearly exhausted for {}: {} requests remaining",
                    url, remaining
                );
            }
        }
    }
}

impl Default for ResilientTransport {
    fn default() -> Self {
        Self::new(Arc::new(ReqwestExecutor::new()), &TransportConfig::default())
    }
}

/// Parsed `x-ratelimit-remaining`, if the chute sent one.
pub fn rate_limit_remaining(response: &HttpResponse) -> Option<u64> {
    response
        .header(RATE_LIMIT_REMAINING_HEADER)
        .and_then(|v| v.trim().parse().ok())
}

fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if path.is_empty() {
        base.to_string()
    } else if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

fn attach_retries(err: Error, retries: RetryMetadata) -> Error {
    match err {
        Error::Unavailable {
            status, message, ..
        } => Error::Unavailable {
            status,
            message,
            retries,
        },
        Error::Rejected {
            status, message, ..
        } => Error::Rejected {
            status,
            message,
            retries,
        },
        Error::RateLimited { message, .. } => Error::RateLimited { message, retries },
        other => other,
    }
}
