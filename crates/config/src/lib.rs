//! Market actions configuration
//!
//! Settings, loading and startup utilities.

pub mod configurable_value;
pub mod loader;
pub mod settings;
pub mod startup_logger;

pub use configurable_value::{ConfigurableValue, ConfigurableValueError, ValueType};
pub use loader::{load_config, load_config_from, ConfigLoadError, ENV_PREFIX};
pub use settings::{
	AllowanceSettings, ConfigValidationError, ExecutionSettings, LogFormat, LoggingSettings,
	NetworkSettings, RelaySettings, Settings, DEFAULT_RESET_REQUIRED_TOKENS,
};
pub use startup_logger::{log_service_info, log_service_shutdown};
