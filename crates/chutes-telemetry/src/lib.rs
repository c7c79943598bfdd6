//! # Chutes Telemetry
//!
//! Tracing setup for chute pipelines: a `tracing-subscriber` registry with an
//! OpenTelemetry layer, plus span helpers carrying chute-specific attributes.

mod spans;
mod tracer;

pub use spans::{chute_request_span, record_response, safe_serialize};
pub use tracer::{init_telemetry, tracer_provider};

/// Span attribute names.
///
/// HTTP attributes follow the OpenTelemetry semantic conventions; the
/// `chute.*` ones are specific to this engine.
pub mod attributes {
    /// Base URL of the chute being invoked
    pub const CHUTE_BASE_URL: &str = "chute.base_url";
    /// Canonical operation family name, e.g. `text2video`
    pub const CHUTE_FAMILY: &str = "chute.family";
    /// Resolved invocation path
    pub const CHUTE_PATH: &str = "chute.path";
    /// Number of 429 retries before the final response
    pub const CHUTE_RETRIES: &str = "chute.retries";
    pub const HTTP_REQUEST_METHOD: &str = "http.request.method";
    pub const HTTP_RESPONSE_STATUS_CODE: &str = "http.response.status_code";

    /// Instrumentation scope name for the tracer
    pub const SYSTEM_NAME: &str = "chutes";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_constants() {
        assert_eq!(attributes::CHUTE_FAMILY, "chute.family");
        assert_eq!(attributes::HTTP_RESPONSE_STATUS_CODE, "http.response.status_code");
        assert_eq!(attributes::SYSTEM_NAME, "chutes");
    }
}
