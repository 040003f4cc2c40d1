//! Configuration settings structures

use alloy_primitives::{address, Address};
use ma_types::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::configurable_value::{ConfigurableValue, ConfigurableValueError};

/// Tokens that refuse to change a non-zero allowance to another non-zero value
pub const DEFAULT_RESET_REQUIRED_TOKENS: [Address; 2] = [
	// USDT (mainnet)
	address!("dac17f958d2ee523a2206206994597c13d831ec7"),
	// USDT (sepolia test deployment)
	address!("4e1acc8699618cf4b487346c5dd7c6dec4e11321"),
];

/// Main application settings
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Settings {
	#[serde(default)]
	pub logging: LoggingSettings,
	#[serde(default)]
	pub network: NetworkSettings,
	#[serde(default)]
	pub execution: ExecutionSettings,
	#[serde(default)]
	pub relay: RelaySettings,
	#[serde(default)]
	pub allowance: AllowanceSettings,
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingSettings {
	pub level: String,
	pub format: LogFormat,
	pub structured: bool,
}

/// Log format options
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	Json,
	Pretty,
	Compact,
}

impl Default for LoggingSettings {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
			format: LogFormat::Pretty,
			structured: false,
		}
	}
}

/// Chain and indexer endpoints
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NetworkSettings {
	pub chain_id: u64,
	pub rpc_url: String,
	pub subgraph_url: String,
}

impl Default for NetworkSettings {
	fn default() -> Self {
		Self {
			chain_id: 1,
			rpc_url: "http://localhost:8545".to_string(),
			subgraph_url: "http://localhost:8000/subgraphs/name/markets".to_string(),
		}
	}
}

/// Confirmation and index-sync timing
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExecutionSettings {
	/// Receipt polling interval
	pub confirmation_poll_ms: u64,
	/// Upper bound on waiting for one receipt
	pub confirmation_timeout_ms: u64,
	/// Index height polling interval
	pub index_poll_ms: u64,
	/// Upper bound on waiting for the index after confirmation
	pub index_sync_timeout_ms: u64,
	/// Timeout for individual HTTP requests
	pub request_timeout_ms: u64,
}

impl Default for ExecutionSettings {
	fn default() -> Self {
		Self {
			confirmation_poll_ms: 1_000,
			confirmation_timeout_ms: 180_000,
			index_poll_ms: 2_000,
			index_sync_timeout_ms: 60_000,
			request_timeout_ms: 10_000,
		}
	}
}

impl ExecutionSettings {
	pub fn confirmation_poll_interval(&self) -> Duration {
		Duration::from_millis(self.confirmation_poll_ms)
	}

	pub fn confirmation_timeout(&self) -> Duration {
		Duration::from_millis(self.confirmation_timeout_ms)
	}

	pub fn index_poll_interval(&self) -> Duration {
		Duration::from_millis(self.index_poll_ms)
	}

	pub fn index_sync_timeout(&self) -> Duration {
		Duration::from_millis(self.index_sync_timeout_ms)
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_millis(self.request_timeout_ms)
	}
}

/// Multi-owner bundle relay
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RelaySettings {
	pub enabled: bool,
	pub endpoint: Option<String>,
	/// Example: `{"type": "env", "value": "RELAY_API_KEY"}`
	pub api_key: Option<ConfigurableValue>,
	pub poll_ms: u64,
	pub timeout_ms: u64,
}

impl Default for RelaySettings {
	fn default() -> Self {
		Self {
			enabled: false,
			endpoint: None,
			api_key: None,
			poll_ms: 3_000,
			timeout_ms: 900_000,
		}
	}
}

/// Allowance handling
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AllowanceSettings {
	/// Tokens whose allowance must be reset to zero before it is changed
	pub reset_required_tokens: Vec<Address>,
}

impl Default for AllowanceSettings {
	fn default() -> Self {
		Self {
			reset_required_tokens: DEFAULT_RESET_REQUIRED_TOKENS.to_vec(),
		}
	}
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigValidationError {
	#[error("Invalid URL for {field}: {value} ({reason})")]
	InvalidUrl {
		field: String,
		value: String,
		reason: String,
	},

	#[error("Invalid value for {field}: {reason}")]
	OutOfRange { field: String, reason: String },

	#[error("Relay is enabled but no endpoint is configured")]
	MissingRelayEndpoint,

	#[error("Unknown log level: {level}")]
	InvalidLogLevel { level: String },
}

impl Settings {
	/// Check ranges, URLs and relay consistency
	pub fn validate(&self) -> Result<(), ConfigValidationError> {
		const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
		if !LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
			return Err(ConfigValidationError::InvalidLogLevel {
				level: self.logging.level.clone(),
			});
		}

		check_url("network.rpc_url", &self.network.rpc_url)?;
		check_url("network.subgraph_url", &self.network.subgraph_url)?;
		if self.network.chain_id == 0 {
			return Err(ConfigValidationError::OutOfRange {
				field: "network.chain_id".to_string(),
				reason: "must be non-zero".to_string(),
			});
		}

		let execution = &self.execution;
		check_interval(
			"execution.confirmation_poll_ms",
			execution.confirmation_poll_ms,
			execution.confirmation_timeout_ms,
		)?;
		check_interval(
			"execution.index_poll_ms",
			execution.index_poll_ms,
			execution.index_sync_timeout_ms,
		)?;
		if execution.request_timeout_ms == 0 {
			return Err(ConfigValidationError::OutOfRange {
				field: "execution.request_timeout_ms".to_string(),
				reason: "must be non-zero".to_string(),
			});
		}

		if self.relay.enabled {
			let endpoint = self
				.relay
				.endpoint
				.as_deref()
				.ok_or(ConfigValidationError::MissingRelayEndpoint)?;
			check_url("relay.endpoint", endpoint)?;
			check_interval("relay.poll_ms", self.relay.poll_ms, self.relay.timeout_ms)?;
		}

		Ok(())
	}

	/// Relay API key, if one is configured
	pub fn relay_api_key(&self) -> Result<Option<SecretString>, ConfigurableValueError> {
		self.relay.api_key.as_ref().map(|v| v.resolve()).transpose()
	}
}

fn check_url(field: &str, value: &str) -> Result<(), ConfigValidationError> {
	url::Url::parse(value)
		.map(|_| ())
		.map_err(|e| ConfigValidationError::InvalidUrl {
			field: field.to_string(),
			value: value.to_string(),
			reason: e.to_string(),
		})
}

/// Poll interval must be non-zero and fit inside its timeout
fn check_interval(field: &str, poll_ms: u64, timeout_ms: u64) -> Result<(), ConfigValidationError> {
	if poll_ms == 0 || poll_ms > timeout_ms {
		return Err(ConfigValidationError::OutOfRange {
			field: field.to_string(),
			reason: format!(
				"poll interval {}ms must be between 1 and the timeout ({}ms)",
				poll_ms, timeout_ms
			),
		});
	}
	Ok(())
}
