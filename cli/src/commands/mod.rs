//! CLI Commands

pub mod check;
pub mod export;
pub mod render;
pub mod serve;

use anyhow::Context;
use contact_form::{Config, ConfigLoader, ConfigSource};

/// Load and validate the configuration at `source`
pub async fn load_config(source: &ConfigSource) -> anyhow::Result<Config> {
    ConfigLoader::new()
        .load(source)
        .await
        .with_context(|| format!("loading configuration from {}", source.describe()))
}
