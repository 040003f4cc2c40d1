//! Configuration loading utilities

use crate::settings::ConfigValidationError;
use crate::Settings;
use config::{Config, ConfigError, Environment, File};
use std::path::Path;
use thiserror::Error;

/// Prefix for environment overrides, e.g. `MA__NETWORK__RPC_URL`
pub const ENV_PREFIX: &str = "MA";

#[derive(Debug, Error)]
pub enum ConfigLoadError {
	#[error("Failed to read configuration: {0}")]
	Config(#[from] ConfigError),

	#[error("Invalid configuration: {0}")]
	Validation(#[from] ConfigValidationError),
}

/// Load `config/config.{toml,json,yaml}` (optional) layered with environment overrides
pub fn load_config() -> Result<Settings, ConfigLoadError> {
	let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/config".to_string());
	load_config_from(path)
}

/// Load from a specific file stem or path; the file may be absent
pub fn load_config_from(path: impl AsRef<Path>) -> Result<Settings, ConfigLoadError> {
	let name = path.as_ref().to_string_lossy().into_owned();
	let s = Config::builder()
		.add_source(File::with_name(&name).required(false))
		.add_source(
			Environment::with_prefix(ENV_PREFIX)
				.prefix_separator("__")
				.separator("__"),
		)
		.build()?;

	let settings: Settings = s.try_deserialize()?;
	settings.validate()?;
	Ok(settings)
}
