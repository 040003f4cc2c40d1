//! Tests for the Builder Pattern implementation

mod mocks;

use std::sync::Arc;

use market_actions::mocks::{FixedIndex, RecordingNotifier, RecordingWallet, StaticStateProvider};
use market_actions::{BuildError, ConnectionMode, OrchestratorBuilder};
use mocks::{MockConfigs, MockEntities, TestConstants};

fn state() -> Arc<StaticStateProvider> {
	Arc::new(StaticStateProvider::new(MockEntities::lender_snapshot(
		MockEntities::usdc(),
		1_000,
	)))
}

#[test]
fn test_builder_requires_state_provider() {
	let result = OrchestratorBuilder::new()
		.with_wallet(Arc::new(RecordingWallet::new()))
		.build();
	assert!(matches!(result, Err(BuildError::MissingStateProvider)));
}

#[test]
fn test_builder_requires_wallet_or_account() {
	let result = OrchestratorBuilder::new().with_state_provider(state()).build();
	assert!(matches!(result, Err(BuildError::MissingWallet)));
}

#[test]
fn test_builder_defaults_to_direct_mode() {
	let orchestrator = OrchestratorBuilder::from_config(MockConfigs::test_settings())
		.with_state_provider(state())
		.with_account(TestConstants::LENDER)
		.build()
		.unwrap();
	assert_eq!(orchestrator.connection_mode(), ConnectionMode::Direct);
}

#[test]
fn test_builder_with_relay_settings_is_batched() {
	let orchestrator = OrchestratorBuilder::from_config(MockConfigs::test_settings_with_relay(
		"http://localhost:9000/relay",
	))
	.with_state_provider(state())
	.with_account(TestConstants::LENDER)
	.with_index(Arc::new(FixedIndex::synced()))
	.build()
	.unwrap();
	assert_eq!(orchestrator.connection_mode(), ConnectionMode::Batched);
}

#[test]
fn test_builder_relay_without_endpoint_fails() {
	let mut settings = MockConfigs::test_settings_with_relay("http://localhost:9000/relay");
	settings.relay.endpoint = None;

	let result = OrchestratorBuilder::from_config(settings)
		.with_state_provider(state())
		.with_account(TestConstants::LENDER)
		.build();
	assert!(matches!(result, Err(BuildError::MissingRelayEndpoint)));
}

#[test]
fn test_builder_rejects_invalid_rpc_url() {
	let mut settings = MockConfigs::test_settings();
	settings.network.rpc_url = "not a url".to_string();

	let result = OrchestratorBuilder::from_config(settings)
		.with_state_provider(state())
		.with_account(TestConstants::LENDER)
		.build();
	assert!(matches!(result, Err(BuildError::Wallet(_))));
}

#[test]
fn test_builder_keeps_settings() {
	let builder = OrchestratorBuilder::from_config(MockConfigs::test_settings());
	assert_eq!(
		builder.settings().map(|s| s.execution.index_poll_ms),
		Some(10)
	);
	assert!(OrchestratorBuilder::new().settings().is_none());
}

#[tokio::test]
async fn test_built_service_uses_supplied_collaborators() {
	let notifier = Arc::new(RecordingNotifier::new());
	let orchestrator = OrchestratorBuilder::from_config(MockConfigs::test_settings())
		.with_state_provider(state())
		.with_wallet(Arc::new(RecordingWallet::new()))
		.with_index(Arc::new(FixedIndex::synced()))
		.with_notifier(notifier.clone())
		.build()
		.unwrap();

	orchestrator
		.submit(
			&MockEntities::deposit("1"),
			&market_actions::CancelSignal::never(),
		)
		.await
		.unwrap();
	assert_eq!(
		notifier.messages().last().map(String::as_str),
		Some("Successfully Deposited 1 USDC!")
	);
}
