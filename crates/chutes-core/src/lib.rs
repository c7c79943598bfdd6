//! Core types for the chutes engine
//!
//! This crate provides the shared error type, configuration, authentication,
//! the HTTP executor seam and the caller-facing input vocabulary.

pub mod auth;
pub mod config;
pub mod error;
pub mod family;
pub mod fields;
pub mod http;
pub mod testing;

// Re-exports
pub use auth::AuthConfig;
pub use config::{ChutesConfig, PipelineConfig, TransportConfig, resolve_base_url};
pub use error::{Error, Result, RetryMetadata, error_message_from_body};
pub use family::OperationFamily;
pub use fields::{SEMANTIC_FIELDS, SemanticFieldBag};
pub use http::{HttpExecutor, HttpRequest, HttpResponse, ReqwestExecutor};
