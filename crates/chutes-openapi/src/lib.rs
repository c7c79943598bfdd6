//! # Chutes schema discovery
//!
//! Fetches a chute's self-describing interface document and reduces it to the
//! list of POST endpoints and the fields each one declares.
//!
//! ## Example
//!
//! ```no_run
//! use chutes_openapi::SchemaFetcher;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let fetcher = SchemaFetcher::default();
//! let fetch = fetcher
//!     .fetch_schema("https://chutes-wan2-1-14b.chutes.ai", "cpk_...")
//!     .await;
//! if let Some(doc) = fetch.document() {
//!     for endpoint in &doc.endpoints {
//!         println!("{} {:?}", endpoint.path, endpoint.declared_fields);
//!     }
//! }
//! # }
//! ```

mod error;
mod fetcher;
mod parser;
mod types;

pub use error::{OpenApiError, Result};
pub use fetcher::{SCHEMA_PATH, SCHEMA_TIMEOUT, SchemaFetch, SchemaFetcher};
pub use parser::SchemaParser;
pub use types::{EndpointDescriptor, SchemaDocument};
