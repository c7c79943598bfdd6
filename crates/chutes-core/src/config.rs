//! Configuration management for the chutes engine
//!
//! Loads configuration with priority:
//! 1. chutes.toml (or specified config file)
//! 2. Environment variables (fallback)
//! 3. Defaults

use crate::AuthConfig;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Environment variable consulted when no API key is configured.
pub const API_KEY_ENV: &str = "CHUTES_API_KEY";

/// Environment variable consulted when no chute is configured.
pub const BASE_URL_ENV: &str = "CHUTES_BASE_URL";

const CONFIG_FILE_NAME: &str = "chutes.toml";
const CHUTES_DOMAIN: &str = "chutes.ai";

/// Engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChutesConfig {
    #[serde(default)]
    pub auth: AuthSection,

    #[serde(default)]
    pub chute: ChuteSection,

    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthSection {
    /// API key (can reference env var with ${VAR_NAME})
    pub api_key: Option<String>,
}

/// Default chute to talk to
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChuteSection {
    /// Absolute URL (`https://user-model.chutes.ai`) or bare slug (`user-model`)
    pub base_url: Option<String>,
}

/// Retry and header settings for the resilient transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Warn when `x-ratelimit-remaining` drops below this value
    #[serde(default = "default_rate_limit_low_water")]
    pub rate_limit_low_water: u64,

    #[serde(default = "default_client_id")]
    pub client_id: String,
}

/// Whole-pipeline settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Abort discover + build + send after this many seconds
    pub timeout_secs: Option<u64>,
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// `tracing_subscriber::EnvFilter` directive
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            rate_limit_low_water: default_rate_limit_low_water(),
            client_id: default_client_id(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
        }
    }
}

impl TransportConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl PipelineConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl ChutesConfig {
    /// Load configuration with the following priority:
    /// 1. chutes.toml in current directory or a parent
    /// 2. Environment variables (fallback)
    /// 3. Defaults
    pub fn load() -> Result<Self> {
        match Self::find_config_file() {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::debug!("No {} found, using environment", CONFIG_FILE_NAME);
                let mut config = Self::default();
                config.resolve_env_vars();
                Ok(config)
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        tracing::debug!("Loading configuration from: {:?}", path);

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config = Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        config.resolve_env_vars();
        Ok(config)
    }

    /// Parse a TOML document without touching the environment
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Find chutes.toml by searching current directory and parents
    fn find_config_file() -> Option<PathBuf> {
        let mut current = env::current_dir().ok()?;

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Some(config_path);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Resolve ${VAR_NAME} references and fill gaps from the environment
    fn resolve_env_vars(&mut self) {
        self.auth.api_key = match self.auth.api_key.take() {
            Some(key) => Self::resolve_env_var(&key).or_else(|| env::var(API_KEY_ENV).ok()),
            None => env::var(API_KEY_ENV).ok(),
        };

        self.chute.base_url = match self.chute.base_url.take() {
            Some(url) => Self::resolve_env_var(&url),
            None => env::var(BASE_URL_ENV).ok(),
        };
    }

    /// Resolve a single ${VAR_NAME} reference
    fn resolve_env_var(value: &str) -> Option<String> {
        if value.starts_with("${") && value.ends_with('}') {
            let var_name = &value[2..value.len() - 1];
            env::var(var_name).ok()
        } else {
            Some(value.to_string())
        }
    }

    /// API key with a clear error message
    pub fn api_key(&self) -> Result<String> {
        self.auth
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "API key not found. Configure it in {}:\n\
                    [auth]\n\
                    api_key = \"${{{}}}\"\n\
                    \n\
                    Or set environment variable:\n\
                    export {}=\"your-key\"",
                    CONFIG_FILE_NAME,
                    API_KEY_ENV,
                    API_KEY_ENV
                )
            })
    }

    /// Auth header configuration derived from the API key
    pub fn auth(&self) -> AuthConfig {
        self.auth
            .api_key
            .as_deref()
            .map(AuthConfig::from_api_key)
            .unwrap_or_default()
    }

    /// Resolved base URL of the configured chute
    pub fn base_url(&self) -> crate::Result<String> {
        let raw = self
            .chute
            .base_url
            .as_deref()
            .ok_or_else(|| crate::Error::config_error("No chute base_url configured"))?;
        resolve_base_url(raw)
    }

    /// Create test-friendly defaults (no environment access)
    pub fn test_defaults() -> Self {
        Self {
            auth: AuthSection {
                api_key: Some("test-api-key".to_string()),
            },
            chute: ChuteSection {
                base_url: Some("https://test-chute.chutes.ai".to_string()),
            },
            transport: TransportConfig {
                base_delay_ms: 10,
                ..TransportConfig::default()
            },
            pipeline: PipelineConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Turn a configured chute reference into an absolute base URL.
///
/// Absolute URLs are validated and returned without a trailing slash; a bare
/// slug becomes `https://{slug}.chutes.ai`.
pub fn resolve_base_url(raw: &str) -> crate::Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(crate::Error::config_error("Chute base URL is empty"));
    }

    let candidate = if raw.contains("://") {
        raw.to_string()
    } else if raw.contains('.') {
        format!("https://{}", raw)
    } else {
        format!("https://{}.{}", raw, CHUTES_DOMAIN)
    };

    let url = Url::parse(&candidate)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(crate::Error::config_error(format!(
            "Unsupported URL scheme '{}'",
            url.scheme()
        )));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_rate_limit_low_water() -> u64 {
    10
}

fn default_client_id() -> String {
    format!("chutes-engine/{}", env!("CARGO_PKG_VERSION"))
}

fn default_log_filter() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ChutesConfig::test_defaults();
        assert_eq!(config.api_key().unwrap(), "test-api-key");
        assert_eq!(config.transport.max_retries, 3);
        assert_eq!(
            config.base_url().unwrap(),
            "https://test-chute.chutes.ai"
        );
    }

    #[test]
    fn test_parse_toml_sections() {
        let config = ChutesConfig::from_toml(
            r#"
[auth]
api_key = "cpk_abc"

[chute]
base_url = "someone-ltx-video"

[transport]
max_retries = 5
base_delay_ms = 250

[pipeline]
timeout_secs = 600
"#,
        )
        .unwrap();

        assert_eq!(config.transport.max_retries, 5);
        assert_eq!(config.transport.base_delay(), Duration::from_millis(250));
        assert_eq!(config.transport.rate_limit_low_water, 10);
        assert_eq!(config.pipeline.timeout(), Some(Duration::from_secs(600)));
        assert_eq!(
            config.base_url().unwrap(),
            "https://someone-ltx-video.chutes.ai"
        );
        assert_eq!(config.auth(), AuthConfig::bearer("cpk_abc"));
    }

    #[test]
    fn test_resolve_env_var() {
        unsafe {
            env::set_var("CHUTES_TEST_VAR", "test_value");
        }

        let resolved = ChutesConfig::resolve_env_var("${CHUTES_TEST_VAR}");
        assert_eq!(resolved, Some("test_value".to_string()));

        let not_var = ChutesConfig::resolve_env_var("plain_value");
        assert_eq!(not_var, Some("plain_value".to_string()));

        unsafe {
            env::remove_var("CHUTES_TEST_VAR");
        }
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chutes.toml");
        fs::write(
            &path,
            "[auth]\napi_key = \"from-file\"\n[chute]\nbase_url = \"https://a.example.com/\"\n",
        )
        .unwrap();

        let config = ChutesConfig::load_from(&path).unwrap();
        assert_eq!(config.api_key().unwrap(), "from-file");
        assert_eq!(config.base_url().unwrap(), "https://a.example.com");
    }

    #[test]
    fn test_api_key_error_message() {
        let config = ChutesConfig::default();
        let err = config.api_key().unwrap_err().to_string();
        assert!(err.contains("CHUTES_API_KEY"));
    }

    #[test]
    fn test_resolve_base_url() {
        assert_eq!(
            resolve_base_url("https://chutes-wan2-1-14b.chutes.ai/").unwrap(),
            "https://chutes-wan2-1-14b.chutes.ai"
        );
        assert_eq!(
            resolve_base_url("chutes-flux").unwrap(),
            "https://chutes-flux.chutes.ai"
        );
        assert_eq!(
            resolve_base_url("localhost.example:8000").unwrap(),
            "https://localhost.example:8000"
        );
        assert!(resolve_base_url("").is_err());
        assert!(resolve_base_url("ftp://x.chutes.ai").is_err());
    }
}
