//! Authentication headers for chute requests.
//!
//! Chutes authenticate with a bearer token; some self-hosted deployments put
//! the key in a custom header instead.

use serde::{Deserialize, Serialize};

/// Authentication configuration for chute requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// No authentication
    #[default]
    None,

    /// Bearer token authentication (Authorization: Bearer <token>)
    Bearer {
        /// The bearer token
        token: String,
    },

    /// API key in a named header
    ApiKeyHeader {
        /// Header name
        name: String,
        /// The API key value
        key: String,
    },
}

impl AuthConfig {
    /// Create bearer token authentication.
    ///
    /// # Example
    ///
    /// ```
    /// use chutes_core::AuthConfig;
    ///
    /// let auth = AuthConfig::bearer("cpk_secret");
    /// ```
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    /// Create API key authentication in a header.
    pub fn api_key_header(header_name: impl Into<String>, key: impl Into<String>) -> Self {
        Self::ApiKeyHeader {
            name: header_name.into(),
            key: key.into(),
        }
    }

    /// Bearer auth for a non-empty key, no auth otherwise.
    pub fn from_api_key(api_key: &str) -> Self {
        if api_key.trim().is_empty() {
            Self::None
        } else {
            Self::bearer(api_key.trim())
        }
    }

    /// Header pair to attach, if any.
    pub fn header(&self) -> Option<(String, String)> {
        match self {
            AuthConfig::None => None,
            AuthConfig::Bearer { token } => {
                Some(("Authorization".to_string(), format!("Bearer {}", token)))
            }
            AuthConfig::ApiKeyHeader { name, key } => Some((name.clone(), key.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_header() {
        let auth = AuthConfig::bearer("cpk_123");
        assert_eq!(
            auth.header(),
            Some(("Authorization".to_string(), "Bearer cpk_123".to_string()))
        );
    }

    #[test]
    fn test_from_api_key() {
        assert_eq!(AuthConfig::from_api_key("  "), AuthConfig::None);
        assert_eq!(AuthConfig::from_api_key(" k "), AuthConfig::bearer("k"));
        assert!(AuthConfig::None.header().is_none());
    }

    #[test]
    fn test_custom_header() {
        let auth = AuthConfig::api_key_header("X-API-Key", "secret");
        assert_eq!(
            auth.header(),
            Some(("X-API-Key".to_string(), "secret".to_string()))
        );
    }
}
