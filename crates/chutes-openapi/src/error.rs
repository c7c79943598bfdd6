//! Error types for schema document parsing.

use thiserror::Error;

/// Result type for schema parsing.
pub type Result<T> = std::result::Result<T, OpenApiError>;

/// Errors that can occur while reading a chute's schema document.
///
/// These never leave the fetcher: they are folded into
/// [`SchemaFetch::Unavailable`](crate::SchemaFetch::Unavailable).
#[derive(Error, Debug)]
pub enum OpenApiError {
    /// Body is neither JSON nor YAML
    #[error("Failed to parse schema document: {0}")]
    ParseError(String),

    /// Parsed, but not shaped like an OpenAPI document
    #[error("Invalid schema document: {0}")]
    InvalidSpec(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
