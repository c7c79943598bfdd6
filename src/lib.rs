//! Chutes engine workspace.
//!
//! Re-exports the member crates under one roof:
//!
//! - [`core`]: shared types, configuration, errors and the HTTP seam
//! - [`openapi`]: schema fetching and parsing
//! - [`transport`]: authenticated, rate-limit aware invocation
//! - [`telemetry`]: subscriber setup and span helpers
//! - [`engine`]: capability discovery, request adaptation and [`ChuteClient`]

pub use chutes_core as core;
pub use chutes_engine as engine;
pub use chutes_openapi as openapi;
pub use chutes_telemetry as telemetry;
pub use chutes_transport as transport;

pub use chutes_core::{ChutesConfig, Error, OperationFamily, Result, SemanticFieldBag};
pub use chutes_engine::{ChuteCapabilities, ChuteClient, RequestPlan, build_request_body};
