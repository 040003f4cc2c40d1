//! Market Actions CLI
//!
//! Dry-run entry point: reads an action request and prints the readiness
//! status and the transaction plan that would be submitted.

use market_actions::{
	init_tracing, load_config, log_service_info, log_service_shutdown, ActionRequest, Settings,
};
use tracing::warn;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let settings = match load_config() {
		Ok(settings) => settings,
		Err(e) => {
			eprintln!("Failed to load configuration, using defaults: {}", e);
			Settings::default()
		},
	};
	init_tracing(&settings.logging)?;
	log_service_info(&settings);

	let path = std::env::args()
		.nth(1)
		.ok_or("usage: market-actions <request.json>")?;
	let request = ActionRequest::from_file(&path)?;

	match request.preview(&settings) {
		Ok(preview) => println!("{}", serde_json::to_string_pretty(&preview)?),
		Err(e) => {
			warn!(request = %path, error = %e, "Action cannot be planned");
			log_service_shutdown();
			return Err(e.into());
		},
	}

	log_service_shutdown();
	Ok(())
}
