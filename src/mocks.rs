//! In-memory collaborators for demos and testing
//!
//! These stand in for the wallet, relay, indexer and state provider without
//! any network access. Wallet and relay record what they were asked to do.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use ma_types::{
	BatchRelay, BundleSubmission, IndexClient, IndexResult, MarketAccountSnapshot, Notice,
	Notifier, PreparedTransaction, Receipt, RelayError, RelayResult, StateError, StateProvider,
	StateResult, WalletClient, WalletError, WalletResult,
};

const FIRST_BLOCK: u64 = 100;

/// Serves queued snapshots in order and then keeps returning the last one
#[derive(Debug)]
pub struct StaticStateProvider {
	snapshots: Mutex<VecDeque<MarketAccountSnapshot>>,
	fetches: AtomicU64,
}

impl StaticStateProvider {
	pub fn new(snapshot: MarketAccountSnapshot) -> Self {
		Self::sequence(vec![snapshot])
	}

	/// One snapshot per fetch, e.g. before and after an approval
	pub fn sequence(snapshots: Vec<MarketAccountSnapshot>) -> Self {
		Self {
			snapshots: Mutex::new(snapshots.into()),
			fetches: AtomicU64::new(0),
		}
	}

	pub fn fetches(&self) -> u64 {
		self.fetches.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl StateProvider for StaticStateProvider {
	async fn snapshot(&self, market: Address, _account: Address) -> StateResult<MarketAccountSnapshot> {
		self.fetches.fetch_add(1, Ordering::SeqCst);
		let mut snapshots = self.snapshots.lock().map_err(|e| StateError::Unavailable {
			reason: e.to_string(),
		})?;
		let next = if snapshots.len() > 1 {
			snapshots.pop_front()
		} else {
			snapshots.front().cloned()
		};
		next.filter(|s| s.market.address == market)
			.ok_or(StateError::MarketNotFound { market })
	}
}

/// Wallet that confirms every transaction in its own block
///
/// Steps listed in `reject` are refused at the signature prompt; steps in
/// `revert` are mined with a failed status. Receipts for steps in `stall`
/// never arrive.
#[derive(Debug, Default)]
pub struct RecordingWallet {
	reject: HashSet<String>,
	revert: HashSet<String>,
	stall: HashSet<String>,
	sent: Mutex<Vec<PreparedTransaction>>,
	events: Mutex<Vec<String>>,
}

impl RecordingWallet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn rejecting(mut self, step: &str) -> Self {
		self.reject.insert(step.to_string());
		self
	}

	pub fn reverting(mut self, step: &str) -> Self {
		self.revert.insert(step.to_string());
		self
	}

	pub fn stalling(mut self, step: &str) -> Self {
		self.stall.insert(step.to_string());
		self
	}

	/// Transactions broadcast so far
	pub fn sent(&self) -> Vec<PreparedTransaction> {
		self.sent.lock().map(|s| s.clone()).unwrap_or_default()
	}

	/// `send:<step>` and `confirm:<step>` in the order they happened
	pub fn events(&self) -> Vec<String> {
		self.events.lock().map(|e| e.clone()).unwrap_or_default()
	}

	fn record(&self, event: String) {
		if let Ok(mut events) = self.events.lock() {
			events.push(event);
		}
	}
}

#[async_trait]
impl WalletClient for RecordingWallet {
	async fn send_transaction(&self, tx: &PreparedTransaction) -> WalletResult<B256> {
		if self.reject.contains(&tx.label) {
			return Err(WalletError::Rejected);
		}
		let mut sent = self.sent.lock().map_err(|e| WalletError::Transport(e.to_string()))?;
		sent.push(tx.clone());
		let nonce = sent.len() as u64;
		drop(sent);

		self.record(format!("send:{}", tx.label));
		Ok(B256::left_padding_from(&nonce.to_be_bytes()))
	}

	async fn wait_for_receipt(&self, tx_hash: B256) -> WalletResult<Receipt> {
		let nonce = u64::from_be_bytes(tx_hash[24..].try_into().map_err(|_| {
			WalletError::InvalidResponse {
				reason: "unknown transaction".to_string(),
			}
		})?);
		let label = self
			.sent
			.lock()
			.map_err(|e| WalletError::Transport(e.to_string()))?
			.get(nonce.saturating_sub(1) as usize)
			.map(|tx| tx.label.clone())
			.ok_or(WalletError::Dropped { tx_hash })?;
		if self.stall.contains(&label) {
			return Err(WalletError::Timeout {
				tx_hash,
				timeout_ms: 0,
			});
		}

		self.record(format!("confirm:{}", label));
		Ok(Receipt {
			transaction_hash: tx_hash,
			block_number: FIRST_BLOCK + nonce - 1,
			success: !self.revert.contains(&label),
			gas_used: 50_000,
		})
	}
}

/// Relay that executes every bundle in one block
#[derive(Debug, Default)]
pub struct RecordingRelay {
	reject: bool,
	bundles: Mutex<Vec<Vec<PreparedTransaction>>>,
}

impl RecordingRelay {
	pub fn new() -> Self {
		Self::default()
	}

	/// Owners refuse to sign every bundle
	pub fn rejecting() -> Self {
		Self {
			reject: true,
			..Default::default()
		}
	}

	pub fn bundles(&self) -> Vec<Vec<PreparedTransaction>> {
		self.bundles.lock().map(|b| b.clone()).unwrap_or_default()
	}
}

#[async_trait]
impl BatchRelay for RecordingRelay {
	async fn submit_bundle(&self, txs: &[PreparedTransaction]) -> RelayResult<BundleSubmission> {
		if self.reject {
			return Err(RelayError::Rejected {
				reason: "owners declined".to_string(),
			});
		}
		let mut bundles = self.bundles.lock().map_err(|e| RelayError::Transport(e.to_string()))?;
		bundles.push(txs.to_vec());
		Ok(BundleSubmission {
			bundle_id: format!("bundle-{}", bundles.len()),
		})
	}

	async fn wait_for_bundle(&self, submission: &BundleSubmission) -> RelayResult<Receipt> {
		let index = submission
			.bundle_id
			.trim_start_matches("bundle-")
			.parse::<u64>()
			.map_err(|e| RelayError::InvalidResponse {
				reason: e.to_string(),
			})?;
		Ok(Receipt {
			transaction_hash: B256::left_padding_from(&index.to_be_bytes()),
			block_number: FIRST_BLOCK + index - 1,
			success: true,
			gas_used: 120_000,
		})
	}
}

/// Index that reports a settable height
#[derive(Debug)]
pub struct FixedIndex {
	height: AtomicU64,
	polls: AtomicU64,
}

impl FixedIndex {
	pub fn at(height: u64) -> Self {
		Self {
			height: AtomicU64::new(height),
			polls: AtomicU64::new(0),
		}
	}

	/// Always ahead of any receipt
	pub fn synced() -> Self {
		Self::at(u64::MAX)
	}

	pub fn set_height(&self, height: u64) {
		self.height.store(height, Ordering::SeqCst);
	}

	pub fn polls(&self) -> u64 {
		self.polls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl IndexClient for FixedIndex {
	async fn indexed_block(&self) -> IndexResult<u64> {
		self.polls.fetch_add(1, Ordering::SeqCst);
		Ok(self.height.load(Ordering::SeqCst))
	}
}

/// Keeps every notice for inspection
#[derive(Debug, Default)]
pub struct RecordingNotifier {
	notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn notices(&self) -> Vec<Notice> {
		self.notices.lock().map(|n| n.clone()).unwrap_or_default()
	}

	pub fn messages(&self) -> Vec<String> {
		self.notices().into_iter().map(|n| n.message).collect()
	}
}

impl Notifier for RecordingNotifier {
	fn notify(&self, notice: Notice) {
		if let Ok(mut notices) = self.notices.lock() {
			notices.push(notice);
		}
	}
}
