//! Resilient HTTP transport for chute invocations
//!
//! Adds authentication and a client identifier to every call, retries on
//! HTTP 429 with exponential backoff, warns when the remaining rate-limit
//! budget runs low, and normalizes failures into [`chutes_core::Error`].

mod retry;
mod transport;

pub use retry::{RATE_LIMITED, RetryPolicy};
pub use transport::{
    ChuteResponse, RATE_LIMIT_REMAINING_HEADER, ResilientTransport, rate_limit_remaining,
};
