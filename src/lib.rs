//! Market Actions Library
//!
//! Transaction orchestration for lending-market borrower and lender actions:
//! readiness classification, allowance handling, direct or batched
//! execution, lifecycle notifications, index sync and cache invalidation.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

// Core domain types
pub use ma_types::{
	chrono,
	// External dependencies for convenience
	serde_json,
	ActionIntent,
	ActionKind,
	ActionParams,
	CacheKey,
	CacheNamespace,
	ConnectionMode,
	ExecutionError,
	ExecutionMode,
	ExecutionReport,
	MarketAccountSnapshot,
	Notice,
	NoticeStage,
	OperationStep,
	ReadinessStatus,
	Receipt,
	TransactionPlan,
};

// Collaborator traits
pub use ma_types::{
	BatchRelay, CallEncoder, IndexClient, Notifier, QueryCache, StateProvider, WalletClient,
};

// Service layer
pub use ma_service::{
	cancel_pair, preview_action, ActionOutcome, ActionPreview, ActionService, ActionServiceError,
	AllowancePolicy, CacheInvalidator, CancelHandle, CancelSignal, IndexSyncPolicy, PlanExecutor,
	TracingNotifier, TransactionComposer,
};

// Adapters and cache
pub use ma_adapters::{HttpBundleRelay, JsonRpcWallet, SolCallEncoder, SubgraphIndexClient};
pub use ma_cache::MemoryQueryCache;

// Config
pub use ma_config::{load_config, log_service_info, log_service_shutdown, Settings};

pub mod models {
	pub use ma_types::*;
}

pub mod config {
	pub use ma_config::*;
}

pub mod adapters {
	pub use ma_adapters::*;
}

pub mod cache {
	pub use ma_cache::*;
}

pub mod service {
	pub use ma_service::*;
}

pub mod mocks;

/// Errors raised while assembling an [`Orchestrator`]
#[derive(Debug, Error)]
pub enum BuildError {
	#[error("a state provider is required")]
	MissingStateProvider,
	#[error("a wallet or a connected account is required")]
	MissingWallet,
	#[error("relay is enabled but no endpoint is configured")]
	MissingRelayEndpoint,
	#[error("failed to resolve relay API key: {0}")]
	Secret(#[from] ma_config::ConfigurableValueError),
	#[error("wallet setup failed: {0}")]
	Wallet(#[from] ma_types::WalletError),
	#[error("relay setup failed: {0}")]
	Relay(#[from] ma_types::RelayError),
	#[error("index setup failed: {0}")]
	Index(#[from] ma_types::IndexError),
	#[error("tracing setup failed: {0}")]
	Tracing(String),
}

/// A wired action service plus the cache it invalidates
pub struct Orchestrator {
	service: ActionService,
	cache: Arc<dyn QueryCache>,
	mode: ConnectionMode,
}

impl Orchestrator {
	pub fn service(&self) -> &ActionService {
		&self.service
	}

	pub fn cache(&self) -> Arc<dyn QueryCache> {
		Arc::clone(&self.cache)
	}

	/// Connection mode derived from the relay configuration
	pub fn connection_mode(&self) -> ConnectionMode {
		self.mode
	}

	/// Submit with the orchestrator's connection mode
	pub async fn submit(
		&self,
		intent: &ActionIntent,
		cancel: &CancelSignal,
	) -> Result<ActionOutcome, ActionServiceError> {
		self.service.submit(intent, self.mode, cancel).await
	}
}

/// Builder for an [`Orchestrator`]
///
/// Collaborators that are not supplied are created from [`Settings`]: a
/// JSON-RPC wallet for the connected account, a subgraph index client, the
/// ABI encoder, an in-memory query cache, a tracing notifier and, when
/// `relay.enabled`, an HTTP bundle relay.
#[derive(Default)]
pub struct OrchestratorBuilder {
	settings: Option<Settings>,
	account: Option<Address>,
	state: Option<Arc<dyn StateProvider>>,
	wallet: Option<Arc<dyn WalletClient>>,
	relay: Option<Arc<dyn BatchRelay>>,
	index: Option<Arc<dyn IndexClient>>,
	encoder: Option<Arc<dyn CallEncoder>>,
	cache: Option<Arc<dyn QueryCache>>,
	notifier: Option<Arc<dyn Notifier>>,
}

impl OrchestratorBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_config(settings: Settings) -> Self {
		Self::new().with_settings(settings)
	}

	pub fn with_settings(mut self, settings: Settings) -> Self {
		self.settings = Some(settings);
		self
	}

	/// Connected account; used for the default wallet and relay
	pub fn with_account(mut self, account: Address) -> Self {
		self.account = Some(account);
		self
	}

	pub fn with_state_provider(mut self, state: Arc<dyn StateProvider>) -> Self {
		self.state = Some(state);
		self
	}

	pub fn with_wallet(mut self, wallet: Arc<dyn WalletClient>) -> Self {
		self.wallet = Some(wallet);
		self
	}

	/// Switches the connection mode to batched
	pub fn with_relay(mut self, relay: Arc<dyn BatchRelay>) -> Self {
		self.relay = Some(relay);
		self
	}

	pub fn with_index(mut self, index: Arc<dyn IndexClient>) -> Self {
		self.index = Some(index);
		self
	}

	pub fn with_encoder(mut self, encoder: Arc<dyn CallEncoder>) -> Self {
		self.encoder = Some(encoder);
		self
	}

	pub fn with_cache(mut self, cache: Arc<dyn QueryCache>) -> Self {
		self.cache = Some(cache);
		self
	}

	pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
		self.notifier = Some(notifier);
		self
	}

	pub fn settings(&self) -> Option<&Settings> {
		self.settings.as_ref()
	}

	pub fn build(self) -> Result<Orchestrator, BuildError> {
		let settings = self.settings.unwrap_or_default();
		let execution = &settings.execution;
		let state = self.state.ok_or(BuildError::MissingStateProvider)?;

		let wallet: Arc<dyn WalletClient> = match (self.wallet, self.account) {
			(Some(wallet), _) => wallet,
			(None, Some(account)) => Arc::new(JsonRpcWallet::new(
				&settings.network.rpc_url,
				account,
				execution.request_timeout(),
				execution.confirmation_poll_interval(),
				execution.confirmation_timeout(),
			)?),
			(None, None) => return Err(BuildError::MissingWallet),
		};

		let relay: Option<Arc<dyn BatchRelay>> = match (self.relay, settings.relay.enabled) {
			(Some(relay), _) => Some(relay),
			(None, true) => {
				let endpoint = settings
					.relay
					.endpoint
					.as_deref()
					.ok_or(BuildError::MissingRelayEndpoint)?;
				let account = self.account.ok_or(BuildError::MissingWallet)?;
				let api_key = settings.relay_api_key()?;
				let relay = HttpBundleRelay::new(
					endpoint,
					settings.network.chain_id,
					account,
					api_key.as_ref(),
					execution.request_timeout(),
				)?
				.with_polling(
					Duration::from_millis(settings.relay.poll_ms),
					Duration::from_millis(settings.relay.timeout_ms),
				);
				Some(Arc::new(relay))
			},
			(None, false) => None,
		};

		let index: Arc<dyn IndexClient> = match self.index {
			Some(index) => index,
			None => Arc::new(SubgraphIndexClient::new(
				&settings.network.subgraph_url,
				execution.request_timeout(),
			)?),
		};
		let encoder = self
			.encoder
			.unwrap_or_else(|| Arc::new(SolCallEncoder::new()));
		let cache = self
			.cache
			.unwrap_or_else(|| Arc::new(MemoryQueryCache::new()));
		let notifier = self.notifier.unwrap_or_else(|| Arc::new(TracingNotifier));

		let mode = if relay.is_some() {
			ConnectionMode::Batched
		} else {
			ConnectionMode::Direct
		};
		let mut executor = PlanExecutor::new(wallet, index, encoder)
			.with_sync_policy(IndexSyncPolicy::from(execution));
		if let Some(relay) = relay {
			executor = executor.with_relay(relay);
		}

		let service = ActionService::new(
			state,
			TransactionComposer::new(AllowancePolicy::from(&settings.allowance)),
			Arc::new(executor),
			CacheInvalidator::new(Arc::clone(&cache)),
			notifier,
		);

		info!(
			mode = ?mode,
			reset_required_tokens = settings.allowance.reset_required_tokens.len(),
			"Orchestrator ready"
		);
		Ok(Orchestrator {
			service,
			cache,
			mode,
		})
	}
}

/// Dry-run input: an intent, the state to judge it by and the wallet kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
	pub intent: ActionIntent,
	pub snapshot: MarketAccountSnapshot,
	#[serde(default)]
	pub connection_mode: ConnectionMode,
}

impl ActionRequest {
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RequestError> {
		let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| RequestError::Read {
			path: path.as_ref().display().to_string(),
			reason: e.to_string(),
		})?;
		Ok(serde_json::from_str(&raw)?)
	}

	/// Classify and compose against the embedded snapshot
	pub fn preview(&self, settings: &Settings) -> Result<ActionPreview, ActionServiceError> {
		let composer = TransactionComposer::new(AllowancePolicy::from(&settings.allowance));
		preview_action(&composer, &self.intent, &self.snapshot, self.connection_mode)
	}
}

#[derive(Debug, Error)]
pub enum RequestError {
	#[error("failed to read {path}: {reason}")]
	Read { path: String, reason: String },
	#[error("invalid request: {0}")]
	Parse(#[from] serde_json::Error),
}

/// Initialize tracing from logging settings; `RUST_LOG` takes precedence
pub fn init_tracing(logging: &ma_config::LoggingSettings) -> Result<(), BuildError> {
	use ma_config::LogFormat;

	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

	let result = match logging.format {
		LogFormat::Json => tracing_subscriber::fmt()
			.json()
			.with_env_filter(env_filter)
			.with_target(logging.structured)
			.with_thread_ids(logging.structured)
			.try_init(),
		LogFormat::Pretty => tracing_subscriber::fmt()
			.pretty()
			.with_env_filter(env_filter)
			.with_target(logging.structured)
			.with_thread_ids(logging.structured)
			.try_init(),
		LogFormat::Compact => tracing_subscriber::fmt()
			.compact()
			.with_env_filter(env_filter)
			.with_target(logging.structured)
			.with_thread_ids(logging.structured)
			.try_init(),
	};
	result.map_err(|e| BuildError::Tracing(e.to_string()))?;

	info!(
		"Logging configuration applied: level={}, format={:?}, structured={}",
		logging.level, logging.format, logging.structured
	);
	Ok(())
}
