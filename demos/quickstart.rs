//! Quickstart: invoke a chute by operation family
//!
//! Setup:
//! ```bash
//! cp chutes.toml.example chutes.toml
//! export CHUTES_API_KEY="cpk_..."
//!
//! cargo run --example quickstart -- text2video "a red fox running through snow"
//! ```

use anyhow::{Context, Result};
use chutes_workspace::telemetry::init_telemetry;
use chutes_workspace::{ChuteClient, ChutesConfig, OperationFamily, SemanticFieldBag};
use std::env;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ChutesConfig::load()?;
    init_telemetry(&config.observability.log_filter);

    let mut args = env::args().skip(1);
    let family: OperationFamily = args
        .next()
        .unwrap_or_else(|| "text2video".to_string())
        .parse()?;
    let prompt = args
        .next()
        .unwrap_or_else(|| "a cat surfing a wave at sunset".to_string());

    let base_url = config
        .base_url()
        .context("set [chute] base_url in chutes.toml or CHUTES_BASE_URL")?;
    let client = ChuteClient::from_config(&config)?;

    let capabilities = client.discover(&base_url).await;
    info!(
        "{} ({:?}): {} -> {}",
        base_url,
        capabilities.source(),
        family,
        capabilities.path(family)
    );

    let fields = SemanticFieldBag::new().with("prompt", prompt).with("frames", 97);
    let response = client.execute(family, &base_url, &fields).await?;

    println!(
        "{} bytes ({}) after {} retries",
        response.body.len(),
        response.content_type().unwrap_or("unknown"),
        response.retries.attempts
    );
    Ok(())
}
