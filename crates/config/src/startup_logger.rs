//! Startup and shutdown banners

use std::env;
use tracing::info;

use crate::Settings;

/// Logs service, platform and configuration details at startup
pub fn log_service_info(settings: &Settings) {
	let service_name = "market-actions";
	let service_version = env!("CARGO_PKG_VERSION");

	info!("=== Market Actions Starting ===");
	info!("🚀 Service: {} v{}", service_name, service_version);
	info!("💻 Platform: {} ({})", env::consts::OS, env::consts::ARCH);

	if let Ok(cwd) = env::current_dir() {
		info!("📁 Working Directory: {}", cwd.display());
	}

	if let Ok(rust_log) = env::var("RUST_LOG") {
		info!("🔧 Log Level: {}", rust_log);
	}

	if let Ok(config_path) = env::var("CONFIG_PATH") {
		info!("📋 Config Path: {}", config_path);
	}

	info!("⛓️ Chain: {}", settings.network.chain_id);
	info!("📡 Index: {}", settings.network.subgraph_url);
	match (&settings.relay.endpoint, settings.relay.enabled) {
		(Some(endpoint), true) => info!("📦 Bundle relay: {}", endpoint),
		_ => info!("📦 Bundle relay: disabled"),
	}
	if let Some(api_key) = &settings.relay.api_key {
		info!("🔑 Relay API key from {}", api_key.description());
	}
	info!(
		"🪙 Allowance reset required for {} token(s)",
		settings.allowance.reset_required_tokens.len()
	);

	info!(
		"🕒 Started at: {}",
		chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
	);
}

/// Logs service shutdown information
pub fn log_service_shutdown() {
	info!("🛑 Market Actions Shutting Down");
	info!(
		"🕒 Shutdown at: {}",
		chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
	);
}
