//! Span helpers for chute requests

use crate::attributes::*;
use tracing::field::Empty;
use tracing::Span;

/// Span covering one discover, plan and send pipeline.
///
/// Path, status and retry count start empty; fill them in with
/// [`record_response`] or `Span::record` as they become known.
pub fn chute_request_span(base_url: &str, family: &str) -> Span {
    tracing::info_span!(
        "chute_request",
        { CHUTE_BASE_URL } = %base_url,
        { CHUTE_FAMILY } = %family,
        { CHUTE_PATH } = Empty,
        { HTTP_REQUEST_METHOD } = Empty,
        { HTTP_RESPONSE_STATUS_CODE } = Empty,
        { CHUTE_RETRIES } = Empty,
    )
}

/// Record the outcome of the invocation on `span`.
pub fn record_response(span: &Span, status: u16, retries: u32) {
    span.record(HTTP_RESPONSE_STATUS_CODE, status);
    span.record(CHUTE_RETRIES, retries);
}

/// Serialize to a JSON string for span attributes, never failing.
pub fn safe_serialize<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "<not serializable>".to_string())
}
