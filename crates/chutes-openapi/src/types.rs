//! Data structures produced from a chute's schema document.

use serde::{Deserialize, Serialize};

/// One declared invocation endpoint of a chute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    /// URL path (e.g. "/generate")
    pub path: String,
    /// Field names the request schema accepts, in declaration order
    #[serde(default)]
    pub declared_fields: Vec<String>,
    /// Container key when the real inputs are nested one level down
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrapper: Option<String>,
}

impl EndpointDescriptor {
    /// Endpoint with no declared fields.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            declared_fields: Vec::new(),
            wrapper: None,
        }
    }

    /// Add declared fields, skipping duplicates.
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for field in fields {
            let field = field.into();
            if !self.declared_fields.contains(&field) {
                self.declared_fields.push(field);
            }
        }
        self
    }

    pub fn with_wrapper(mut self, wrapper: impl Into<String>) -> Self {
        self.wrapper = Some(wrapper.into());
        self
    }

    pub fn declares(&self, field: &str) -> bool {
        self.declared_fields.iter().any(|f| f == field)
    }

    pub fn declares_any(&self, fields: &[&str]) -> bool {
        fields.iter().any(|f| self.declares(f))
    }

    /// First of `candidates` this endpoint declares.
    pub fn first_declared<'a>(&self, candidates: &[&'a str]) -> Option<&'a str> {
        candidates.iter().copied().find(|c| self.declares(c))
    }

    pub fn has_declared_fields(&self) -> bool {
        !self.declared_fields.is_empty()
    }
}

/// The parts of a chute's schema document the engine cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDocument {
    /// `info.title`, when present
    pub title: Option<String>,
    /// `info.version`, when present
    pub version: Option<String>,
    /// POST endpoints in declaration order
    pub endpoints: Vec<EndpointDescriptor>,
}

impl SchemaDocument {
    pub fn endpoint(&self, path: &str) -> Option<&EndpointDescriptor> {
        self.endpoints.iter().find(|e| e.path == path)
    }
}
