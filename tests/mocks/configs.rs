//! Configuration mocks and builders for tests

use market_actions::config::*;

/// Configuration builders for tests
#[allow(dead_code)]
pub struct MockConfigs;

#[allow(dead_code)]
impl MockConfigs {
	/// Default settings with fast polling
	pub fn test_settings() -> Settings {
		Settings {
			logging: LoggingSettings {
				level: "debug".to_string(),
				format: LogFormat::Compact,
				structured: false,
			},
			execution: ExecutionSettings {
				confirmation_poll_ms: 10,
				confirmation_timeout_ms: 1_000,
				index_poll_ms: 10,
				index_sync_timeout_ms: 100,
				request_timeout_ms: 1_000,
			},
			..Default::default()
		}
	}

	/// Test settings with the bundle relay switched on
	pub fn test_settings_with_relay(endpoint: &str) -> Settings {
		let mut settings = Self::test_settings();
		settings.relay = RelaySettings {
			enabled: true,
			endpoint: Some(endpoint.to_string()),
			api_key: Some(ConfigurableValue::from_plain("test-relay-key")),
			poll_ms: 10,
			timeout_ms: 1_000,
		};
		settings
	}
}
