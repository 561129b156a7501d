//! Command handlers -- one module per subcommand

pub mod config;
pub mod list;
pub mod render;
pub mod run;

use std::path::Path;
use std::sync::Arc;

use tracing::warn;

use driftwatch_cdn::{InMemoryCdnClient, PublicKeySuite};
use driftwatch_core::config::DriftwatchConfig;
use driftwatch_core::error::{ConfigError, DriftwatchError};

use crate::error::CliError;

/// Load the effective configuration for scenario commands.
///
/// A missing file falls back to defaults plus environment overrides;
/// any other load or validation failure is returned.
pub async fn load_config(config_path: &Path) -> Result<DriftwatchConfig, CliError> {
    match DriftwatchConfig::load(config_path).await {
        Ok(config) => Ok(config),
        Err(DriftwatchError::Config(ConfigError::FileNotFound { path })) => {
            warn!(path = %path, "config file not found, using defaults");
            let mut config = DriftwatchConfig::default();
            config.apply_env_overrides();
            config.validate()?;
            Ok(config)
        }
        Err(e) => Err(e.into()),
    }
}

/// Build the CDN public key suite backed by a fresh in-memory control plane.
pub fn build_suite(config: &DriftwatchConfig) -> PublicKeySuite<InMemoryCdnClient> {
    let client = Arc::new(InMemoryCdnClient::from_config(&config.cdn));
    PublicKeySuite::from_config(client, &config.harness)
}
