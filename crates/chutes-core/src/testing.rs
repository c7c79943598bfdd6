//! Shared test utilities
//!
//! [`ScriptedExecutor`] replays a fixed sequence of responses and records every
//! request it sees, so retry and discovery behaviour can be tested without a
//! network.

use crate::{Error, HttpExecutor, HttpRequest, HttpResponse, Result, RetryMetadata};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One scripted outcome.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Response(HttpResponse),
    /// Simulated network failure with the given message
    NetworkError(String),
}

impl From<HttpResponse> for ScriptedReply {
    fn from(response: HttpResponse) -> Self {
        ScriptedReply::Response(response)
    }
}

/// Mock executor that answers requests from a script.
///
/// Requests are matched by `(method, path suffix)` when a route is registered
/// with [`ScriptedExecutor::route`]; otherwise the default queue is used.
/// An exhausted script answers with a network error.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    routes: Mutex<Vec<(String, String, VecDeque<ScriptedReply>)>>,
    default: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue replies for any request not matched by a route.
    pub fn with_responses(self, replies: impl IntoIterator<Item = HttpResponse>) -> Self {
        if let Ok(mut queue) = self.default.lock() {
            queue.extend(replies.into_iter().map(ScriptedReply::Response));
        }
        self
    }

    /// Queue a status-only reply for unmatched requests.
    pub fn then_status(self, status: u16) -> Self {
        self.with_responses([HttpResponse::new(status, Vec::new())])
    }

    /// Queue replies for requests whose method and URL path suffix match.
    pub fn route(
        self,
        method: &str,
        path: &str,
        replies: impl IntoIterator<Item = ScriptedReply>,
    ) -> Self {
        if let Ok(mut routes) = self.routes.lock() {
            routes.push((
                method.to_ascii_uppercase(),
                path.to_string(),
                replies.into_iter().collect(),
            ));
        }
        self
    }

    /// Every request executed so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Number of requests whose URL ends with `path`.
    pub fn count(&self, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.url.ends_with(path))
            .count()
    }

    fn next_reply(&self, request: &HttpRequest) -> Option<ScriptedReply> {
        if let Ok(mut routes) = self.routes.lock() {
            let method = request.method.as_str();
            if let Some((_, _, queue)) = routes
                .iter_mut()
                .find(|(m, p, _)| m == method && request.url.ends_with(p.as_str()))
            {
                return queue.pop_front();
            }
        }
        self.default.lock().ok().and_then(|mut q| q.pop_front())
    }
}

#[async_trait]
impl HttpExecutor for ScriptedExecutor {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let reply = self.next_reply(&request);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        match reply {
            Some(ScriptedReply::Response(response)) => Ok(response),
            Some(ScriptedReply::NetworkError(message)) => Err(Error::Unavailable {
                status: None,
                message,
                retries: RetryMetadata::default(),
            }),
            None => Err(Error::Unavailable {
                status: None,
                message: "script exhausted".to_string(),
                retries: RetryMetadata::default(),
            }),
        }
    }
}

/// JSON response helper.
pub fn json_response(status: u16, body: serde_json::Value) -> HttpResponse {
    HttpResponse::new(status, body.to_string().into_bytes())
        .with_header("content-type", "application/json")
}
