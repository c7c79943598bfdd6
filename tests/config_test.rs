//! Configuration file handling across crates.

use chutes_workspace::{ChuteClient, ChutesConfig, Error};
use std::fs;
use std::time::Duration;

#[test]
fn test_client_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chutes.toml");
    fs::write(
        &path,
        r#"
[auth]
api_key = "cpk_from_file"

[chute]
base_url = "someone-wan2-1-14b"

[transport]
max_retries = 1
base_delay_ms = 500
client_id = "my-app/2.0"

[pipeline]
timeout_secs = 120
"#,
    )
    .unwrap();

    let config = ChutesConfig::load_from(&path).unwrap();
    assert_eq!(config.base_url().unwrap(), "https://someone-wan2-1-14b.chutes.ai");
    assert_eq!(config.pipeline.timeout(), Some(Duration::from_secs(120)));

    let client = ChuteClient::from_config(&config).unwrap();
    assert_eq!(client.transport().policy().max_retries, 1);
    assert_eq!(client.transport().policy().base_delay, Duration::from_millis(500));
}

#[test]
fn test_client_requires_api_key() {
    let config = ChutesConfig::from_toml("[chute]\nbase_url = \"chutes-flux\"\n").unwrap();

    match ChuteClient::from_config(&config) {
        Err(Error::Config(message)) => assert!(message.contains("API key not found")),
        Err(other) => panic!("unexpected error: {other:?}"),
        Ok(_) => panic!("client built without an API key"),
    }
}

#[test]
fn test_invalid_base_url_is_rejected() {
    let config = ChutesConfig::from_toml("[chute]\nbase_url = \"ftp://files.example.com\"\n").unwrap();
    assert!(config.base_url().is_err());
}
