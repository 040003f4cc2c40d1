//! Configurable value types that can load from environment variables or plain values

use ma_types::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A value read either from an environment variable or taken verbatim from config
///
/// ```toml
/// api_key = { type = "env", value = "RELAY_API_KEY" }
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ConfigurableValue {
	#[serde(rename = "type")]
	pub value_type: ValueType,
	/// Environment variable name or the literal value
	pub value: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
	Env,
	Plain,
}

impl ConfigurableValue {
	pub fn from_env(env_var_name: &str) -> Self {
		Self {
			value_type: ValueType::Env,
			value: env_var_name.to_string(),
		}
	}

	pub fn from_plain(plain_value: &str) -> Self {
		Self {
			value_type: ValueType::Plain,
			value: plain_value.to_string(),
		}
	}

	/// Resolve into a secret; plain values are used as-is
	pub fn resolve(&self) -> Result<SecretString, ConfigurableValueError> {
		match self.value_type {
			ValueType::Env => match std::env::var(&self.value) {
				Ok(value) if !value.is_empty() => Ok(SecretString::new(value)),
				Ok(_) => Err(ConfigurableValueError::EmptyValue(self.value.clone())),
				Err(_) => Err(ConfigurableValueError::EnvironmentVariableNotFound(
					self.value.clone(),
				)),
			},
			ValueType::Plain if self.value.is_empty() => {
				Err(ConfigurableValueError::EmptyValue("plain".to_string()))
			},
			ValueType::Plain => Ok(SecretString::from(self.value.as_str())),
		}
	}

	/// Secrets written directly into a config file
	pub fn is_plain(&self) -> bool {
		self.value_type == ValueType::Plain
	}

	/// Where the value comes from, safe for logs
	pub fn description(&self) -> String {
		match self.value_type {
			ValueType::Env => format!("environment variable '{}'", self.value),
			ValueType::Plain => "plain value from config".to_string(),
		}
	}
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigurableValueError {
	#[error("Environment variable '{0}' not found")]
	EnvironmentVariableNotFound(String),

	#[error("Configured value '{0}' is empty")]
	EmptyValue(String),
}

// Never print plain values
impl fmt::Display for ConfigurableValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.value_type {
			ValueType::Env => write!(f, "env:{}", self.value),
			ValueType::Plain => write!(f, "plain:[REDACTED]"),
		}
	}
}

/// `"env:NAME"` selects an environment variable, anything else is plain
impl From<&str> for ConfigurableValue {
	fn from(value: &str) -> Self {
		if let Some(env_var) = value.strip_prefix("env:") {
			Self::from_env(env_var)
		} else {
			Self::from_plain(value)
		}
	}
}

impl From<String> for ConfigurableValue {
	fn from(value: String) -> Self {
		ConfigurableValue::from(value.as_str())
	}
}
