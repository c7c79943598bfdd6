//! Subscriber and tracer provider setup

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::TracerProvider;
use std::sync::{Arc, OnceLock};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Provider shared by every subscriber this process installs.
static PROVIDER: OnceLock<Arc<TracerProvider>> = OnceLock::new();

/// Install the global subscriber: OpenTelemetry layer, fmt output and an
/// `EnvFilter`.
///
/// `RUST_LOG` takes precedence over `default_filter`. Set
/// `CHUTES_LOG_FORMAT=json` for one JSON object per line. Returns `false`
/// when a global subscriber already exists.
///
/// ```rust,no_run
/// chutes_telemetry::init_telemetry("info,chutes_engine=debug");
/// ```
pub fn init_telemetry(default_filter: &str) -> bool {
    let provider = PROVIDER.get_or_init(|| Arc::new(TracerProvider::builder().build()));
    let otel = tracing_opentelemetry::layer().with_tracer(provider.tracer(crate::attributes::SYSTEM_NAME));

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let json = std::env::var("CHUTES_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let output = if json {
        tracing_subscriber::fmt::layer().json().with_target(true).boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(otel)
        .with(output)
        .with(filter)
        .try_init()
        .is_ok()
}

/// The tracer provider, once [`init_telemetry`] has run.
pub fn tracer_provider() -> Option<Arc<TracerProvider>> {
    PROVIDER.get().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_rejected() {
        init_telemetry("warn");
        assert!(!init_telemetry("warn"));
        assert!(tracer_provider().is_some());
    }
}
