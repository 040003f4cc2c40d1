//! Plan execution
//!
//! Runs a [`TransactionPlan`] against the wallet or the bundle relay, then
//! waits for the indexer to observe the terminal receipt's block. Approval
//! plans wait too, so a re-read after approval sees the new allowance.
//!
//! Direct plans are strictly sequential: a step is only submitted after the
//! previous step's receipt was observed. The first failing step aborts the plan
//! and nothing is rolled back.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::B256;
use async_trait::async_trait;
use ma_config::ExecutionSettings;
use ma_types::{
	BatchRelay, CallEncoder, ExecutionError, ExecutionMode, ExecutionReport, ExecutionResult,
	IndexClient, PreparedTransaction, Receipt, RelayError, TransactionPlan, WalletClient,
	WalletError,
};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cancel::CancelSignal;

const TRACING_TARGET: &str = "ma_service::executor";

const BUNDLE_STEP: &str = "bundle";

/// Bounds for the post-confirmation index poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSyncPolicy {
	pub poll_interval: Duration,
	pub timeout: Duration,
}

impl Default for IndexSyncPolicy {
	fn default() -> Self {
		Self::from(&ExecutionSettings::default())
	}
}

impl From<&ExecutionSettings> for IndexSyncPolicy {
	fn from(settings: &ExecutionSettings) -> Self {
		Self {
			poll_interval: settings.index_poll_interval(),
			timeout: settings.index_sync_timeout(),
		}
	}
}

/// Trait for plan execution (enables mocking in the action service)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlanExecutorTrait: Send + Sync {
	/// Run every step, then wait for the index to reach the last receipt's block
	async fn execute(
		&self,
		plan: &TransactionPlan,
		cancel: &CancelSignal,
	) -> ExecutionResult<ExecutionReport>;
}

#[derive(Debug, Clone)]
pub struct PlanExecutor {
	wallet: Arc<dyn WalletClient>,
	relay: Option<Arc<dyn BatchRelay>>,
	index: Arc<dyn IndexClient>,
	encoder: Arc<dyn CallEncoder>,
	sync: IndexSyncPolicy,
}

impl PlanExecutor {
	pub fn new(
		wallet: Arc<dyn WalletClient>,
		index: Arc<dyn IndexClient>,
		encoder: Arc<dyn CallEncoder>,
	) -> Self {
		Self {
			wallet,
			relay: None,
			index,
			encoder,
			sync: IndexSyncPolicy::default(),
		}
	}

	pub fn with_relay(mut self, relay: Arc<dyn BatchRelay>) -> Self {
		self.relay = Some(relay);
		self
	}

	pub fn with_sync_policy(mut self, sync: IndexSyncPolicy) -> Self {
		self.sync = sync;
		self
	}

	async fn run_direct(
		&self,
		txs: &[PreparedTransaction],
		cancel: &CancelSignal,
	) -> ExecutionResult<Vec<Receipt>> {
		let mut receipts = Vec::with_capacity(txs.len());
		for tx in txs {
			let tx_hash = until_cancelled(cancel, self.wallet.send_transaction(tx))
				.await?
				.map_err(|e| wallet_failure(&tx.label, None, e))?;
			debug!(target: TRACING_TARGET, step = %tx.label, tx_hash = %tx_hash, "Transaction broadcast");

			let receipt = until_cancelled(cancel, self.wallet.wait_for_receipt(tx_hash))
				.await?
				.map_err(|e| wallet_failure(&tx.label, Some(tx_hash), e))?;
			if !receipt.success {
				return Err(ExecutionError::TransactionFailed {
					step: tx.label.clone(),
					tx_hash: Some(tx_hash),
					reason: "transaction reverted".to_string(),
				});
			}
			debug!(
				target: TRACING_TARGET,
				step = %tx.label,
				block_number = receipt.block_number,
				"Transaction confirmed"
			);
			receipts.push(receipt);
		}
		Ok(receipts)
	}

	async fn run_batched(
		&self,
		txs: &[PreparedTransaction],
		cancel: &CancelSignal,
	) -> ExecutionResult<Receipt> {
		let relay = self.relay.as_ref().ok_or(ExecutionError::RelayUnavailable)?;
		if !relay.can_batch(txs) {
			return Err(ExecutionError::NotBatchable {
				steps: txs.iter().map(|tx| tx.label.clone()).collect(),
			});
		}

		let submission = until_cancelled(cancel, relay.submit_bundle(txs))
			.await?
			.map_err(relay_failure)?;
		debug!(
			target: TRACING_TARGET,
			bundle_id = %submission.bundle_id,
			calls = txs.len(),
			"Bundle proposed"
		);

		let receipt = until_cancelled(cancel, relay.wait_for_bundle(&submission))
			.await?
			.map_err(relay_failure)?;
		if !receipt.success {
			return Err(ExecutionError::TransactionFailed {
				step: BUNDLE_STEP.to_string(),
				tx_hash: Some(receipt.transaction_hash),
				reason: "bundle reverted".to_string(),
			});
		}
		Ok(receipt)
	}

	/// Poll the index until it reaches `receipt.block_number`
	///
	/// Poll errors are logged and retried until the deadline.
	async fn wait_for_index(&self, receipt: &Receipt, cancel: &CancelSignal) -> ExecutionResult<u64> {
		let started = Instant::now();
		let target_block = receipt.block_number;
		let mut last_seen: Option<u64> = None;

		let poll = async {
			loop {
				match self.index.indexed_block().await {
					Ok(height) => {
						last_seen = Some(height);
						if height >= target_block {
							return height;
						}
						debug!(target: TRACING_TARGET, indexed_block = height, target_block, "Index behind");
					},
					Err(e) => {
						warn!(target: TRACING_TARGET, error = %e, "Index height poll failed");
					},
				}
				tokio::time::sleep(self.sync.poll_interval).await;
			}
		};

		let outcome = tokio::select! {
			biased;
			_ = cancel.cancelled() => return Err(ExecutionError::Cancelled),
			outcome = tokio::time::timeout(self.sync.timeout, poll) => outcome,
		};

		match outcome {
			Ok(height) => Ok(height),
			Err(_) => Err(ExecutionError::SyncTimeout {
				tx_hash: receipt.transaction_hash,
				block_number: target_block,
				indexed_block: last_seen,
				waited_ms: started.elapsed().as_millis() as u64,
			}),
		}
	}
}

#[async_trait]
impl PlanExecutorTrait for PlanExecutor {
	async fn execute(
		&self,
		plan: &TransactionPlan,
		cancel: &CancelSignal,
	) -> ExecutionResult<ExecutionReport> {
		let txs = plan
			.steps()
			.iter()
			.map(|step| self.encoder.encode(step))
			.collect::<Result<Vec<_>, _>>()?;

		info!(
			target: TRACING_TARGET,
			kind = %plan.kind(),
			mode = ?plan.mode(),
			steps = ?plan.step_names(),
			"Executing plan"
		);

		let receipts = match plan.mode() {
			ExecutionMode::Direct => self.run_direct(&txs, cancel).await?,
			ExecutionMode::Batched => vec![self.run_batched(&txs, cancel).await?],
		};
		let Some(receipt) = receipts.last().cloned() else {
			return Err(ExecutionError::TransactionFailed {
				step: plan.kind().to_string(),
				tx_hash: None,
				reason: "plan has no steps".to_string(),
			});
		};

		let indexed_block = Some(self.wait_for_index(&receipt, cancel).await?);

		info!(
			target: TRACING_TARGET,
			kind = %plan.kind(),
			tx_hash = %receipt.transaction_hash,
			block_number = receipt.block_number,
			indexed_block = ?indexed_block,
			"Plan executed"
		);
		Ok(ExecutionReport {
			receipt,
			receipts,
			indexed_block,
		})
	}
}

async fn until_cancelled<F: Future>(cancel: &CancelSignal, fut: F) -> ExecutionResult<F::Output> {
	tokio::select! {
		biased;
		_ = cancel.cancelled() => Err(ExecutionError::Cancelled),
		output = fut => Ok(output),
	}
}

fn wallet_failure(step: &str, tx_hash: Option<B256>, error: WalletError) -> ExecutionError {
	match error {
		WalletError::Rejected => ExecutionError::UserRejected {
			step: step.to_string(),
		},
		WalletError::Dropped { tx_hash: dropped } => ExecutionError::TransactionFailed {
			step: step.to_string(),
			tx_hash: Some(dropped),
			reason: "transaction dropped".to_string(),
		},
		WalletError::Timeout {
			tx_hash: pending,
			timeout_ms,
		} => ExecutionError::ConfirmationTimeout {
			step: step.to_string(),
			tx_hash: Some(pending),
			timeout_ms,
		},
		other => ExecutionError::TransactionFailed {
			step: step.to_string(),
			tx_hash,
			reason: other.to_string(),
		},
	}
}

fn relay_failure(error: RelayError) -> ExecutionError {
	match error {
		RelayError::Rejected { .. } => ExecutionError::UserRejected {
			step: BUNDLE_STEP.to_string(),
		},
		RelayError::Timeout { timeout_ms, .. } => ExecutionError::ConfirmationTimeout {
			step: BUNDLE_STEP.to_string(),
			tx_hash: None,
			timeout_ms,
		},
		other => ExecutionError::TransactionFailed {
			step: BUNDLE_STEP.to_string(),
			tx_hash: None,
			reason: other.to_string(),
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::cancel::cancel_pair;
	use crate::test_support::{units, MARKET, USDT};
	use alloy_primitives::{Bytes, U256};
	use ma_types::{
		ActionKind, BundleSubmission, EncodeError, IndexError, IndexResult, OperationStep,
		RelayResult, WalletResult,
	};
	use pretty_assertions::assert_eq;
	use std::collections::VecDeque;
	use std::sync::Mutex;

	#[derive(Debug, Default)]
	struct LabelEncoder;

	impl CallEncoder for LabelEncoder {
		fn encode(&self, step: &OperationStep) -> Result<PreparedTransaction, EncodeError> {
			Ok(PreparedTransaction {
				to: MARKET,
				data: Bytes::new(),
				value: U256::ZERO,
				label: step.name().to_string(),
			})
		}
	}

	/// Records every call; sends and receipts are interleaved in `events`
	#[derive(Debug, Default)]
	struct FakeWallet {
		events: Mutex<Vec<String>>,
		reject: Option<String>,
		revert: Option<String>,
		stall: Option<String>,
		sent: Mutex<Vec<String>>,
	}

	impl FakeWallet {
		fn events(&self) -> Vec<String> {
			self.events.lock().unwrap().clone()
		}
	}

	#[async_trait]
	impl WalletClient for FakeWallet {
		async fn send_transaction(&self, tx: &PreparedTransaction) -> WalletResult<B256> {
			if self.reject.as_deref() == Some(tx.label.as_str()) {
				return Err(WalletError::Rejected);
			}
			let mut sent = self.sent.lock().unwrap();
			sent.push(tx.label.clone());
			self.events.lock().unwrap().push(format!("send:{}", tx.label));
			Ok(B256::with_last_byte(sent.len() as u8))
		}

		async fn wait_for_receipt(&self, tx_hash: B256) -> WalletResult<Receipt> {
			let index = tx_hash[31] as usize - 1;
			let label = self.sent.lock().unwrap()[index].clone();
			if self.stall.as_deref() == Some(label.as_str()) {
				return Err(WalletError::Timeout {
					tx_hash,
					timeout_ms: 30_000,
				});
			}
			self.events.lock().unwrap().push(format!("confirm:{}", label));
			Ok(Receipt {
				transaction_hash: tx_hash,
				block_number: 100 + index as u64,
				success: self.revert.as_deref() != Some(label.as_str()),
				gas_used: 21_000,
			})
		}
	}

	#[derive(Debug, Default)]
	struct FakeRelay {
		bundles: Mutex<Vec<Vec<String>>>,
		max_calls: Option<usize>,
		stall: bool,
	}

	#[async_trait]
	impl BatchRelay for FakeRelay {
		fn can_batch(&self, txs: &[PreparedTransaction]) -> bool {
			self.max_calls.map_or(true, |max| txs.len() <= max)
		}

		async fn submit_bundle(&self, txs: &[PreparedTransaction]) -> RelayResult<BundleSubmission> {
			self.bundles
				.lock()
				.unwrap()
				.push(txs.iter().map(|tx| tx.label.clone()).collect());
			Ok(BundleSubmission {
				bundle_id: "bundle-1".to_string(),
			})
		}

		async fn wait_for_bundle(&self, submission: &BundleSubmission) -> RelayResult<Receipt> {
			if self.stall {
				return Err(RelayError::Timeout {
					bundle_id: submission.bundle_id.clone(),
					timeout_ms: 120_000,
				});
			}
			Ok(Receipt {
				transaction_hash: B256::with_last_byte(0xbb),
				block_number: 500,
				success: true,
				gas_used: 90_000,
			})
		}
	}

	/// Returns queued heights, then repeats the last one
	#[derive(Debug)]
	struct FakeIndex {
		heights: Mutex<VecDeque<IndexResult<u64>>>,
		polls: Mutex<usize>,
	}

	impl FakeIndex {
		fn new(heights: Vec<IndexResult<u64>>) -> Self {
			Self {
				heights: Mutex::new(heights.into()),
				polls: Mutex::new(0),
			}
		}

		fn at(height: u64) -> Self {
			Self::new(vec![Ok(height)])
		}

		fn polls(&self) -> usize {
			*self.polls.lock().unwrap()
		}
	}

	#[async_trait]
	impl IndexClient for FakeIndex {
		async fn indexed_block(&self) -> IndexResult<u64> {
			*self.polls.lock().unwrap() += 1;
			let mut heights = self.heights.lock().unwrap();
			if heights.len() > 1 {
				heights.pop_front().unwrap_or(Ok(0))
			} else {
				heights.front().cloned().unwrap_or(Ok(0))
			}
		}
	}

	fn policy() -> IndexSyncPolicy {
		IndexSyncPolicy {
			poll_interval: Duration::from_millis(100),
			timeout: Duration::from_secs(1),
		}
	}

	fn executor(wallet: Arc<FakeWallet>, index: Arc<FakeIndex>) -> PlanExecutor {
		PlanExecutor::new(wallet, index, Arc::new(LabelEncoder)).with_sync_policy(policy())
	}

	fn approve() -> OperationStep {
		OperationStep::Approve {
			token: USDT,
			spender: MARKET,
			amount: units(100),
		}
	}

	fn reset() -> OperationStep {
		OperationStep::ResetApproval {
			token: USDT,
			spender: MARKET,
		}
	}

	fn deposit() -> OperationStep {
		OperationStep::Deposit {
			market: MARKET,
			amount: units(100),
		}
	}

	#[tokio::test]
	async fn test_direct_steps_confirm_before_next_submission() {
		let wallet = Arc::new(FakeWallet::default());
		let index = Arc::new(FakeIndex::at(1_000));
		let plan =
			TransactionPlan::approval_only(ActionKind::Deposit, vec![reset(), approve()]).unwrap();

		let report = executor(wallet.clone(), index.clone())
			.execute(&plan, &CancelSignal::never())
			.await
			.unwrap();

		assert_eq!(
			wallet.events(),
			vec![
				"send:reset-approve",
				"confirm:reset-approve",
				"send:approve",
				"confirm:approve"
			]
		);
		assert_eq!(report.receipts.len(), 2);
		assert_eq!(report.receipt.block_number, 101);
		assert_eq!(report.indexed_block, Some(1_000));
		assert_eq!(index.polls(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn test_approval_plan_waits_for_index() {
		let wallet = Arc::new(FakeWallet::default());
		let index = Arc::new(FakeIndex::new(vec![Ok(99), Ok(100)]));
		let plan = TransactionPlan::approval_only(ActionKind::Deposit, vec![approve()]).unwrap();

		let report = executor(wallet, index.clone())
			.execute(&plan, &CancelSignal::never())
			.await
			.unwrap();

		assert_eq!(report.receipt.block_number, 100);
		assert_eq!(report.indexed_block, Some(100));
		assert_eq!(index.polls(), 2);
	}

	#[tokio::test]
	async fn test_receipt_timeout_is_not_a_failure() {
		let wallet = Arc::new(FakeWallet {
			stall: Some("deposit".to_string()),
			..Default::default()
		});
		let index = Arc::new(FakeIndex::at(1_000));
		let plan = TransactionPlan::direct(ActionKind::Deposit, vec![deposit()]).unwrap();

		let err = executor(wallet, index.clone())
			.execute(&plan, &CancelSignal::never())
			.await
			.unwrap_err();

		assert_eq!(
			err,
			ExecutionError::ConfirmationTimeout {
				step: "deposit".to_string(),
				tx_hash: Some(B256::with_last_byte(1)),
				timeout_ms: 30_000,
			}
		);
		assert!(err.may_have_landed());
		assert_eq!(index.polls(), 0);
	}

	#[tokio::test]
	async fn test_bundle_timeout_is_not_a_failure() {
		let relay = Arc::new(FakeRelay {
			stall: true,
			..Default::default()
		});
		let plan =
			TransactionPlan::batched(ActionKind::Deposit, vec![approve(), deposit()]).unwrap();

		let err = executor(
			Arc::new(FakeWallet::default()),
			Arc::new(FakeIndex::at(500)),
		)
		.with_relay(relay)
		.execute(&plan, &CancelSignal::never())
		.await
		.unwrap_err();

		assert!(matches!(
			err,
			ExecutionError::ConfirmationTimeout { ref step, tx_hash: None, .. } if step == "bundle"
		));
	}

	#[tokio::test]
	async fn test_user_rejection_aborts_remaining_steps() {
		let wallet = Arc::new(FakeWallet {
			reject: Some("reset-approve".to_string()),
			..Default::default()
		});
		let plan =
			TransactionPlan::approval_only(ActionKind::Deposit, vec![reset(), approve()]).unwrap();

		let err = executor(wallet.clone(), Arc::new(FakeIndex::at(1_000)))
			.execute(&plan, &CancelSignal::never())
			.await
			.unwrap_err();

		assert_eq!(
			err,
			ExecutionError::UserRejected {
				step: "reset-approve".to_string()
			}
		);
		assert!(wallet.events().is_empty());
	}

	#[tokio::test]
	async fn test_revert_is_transaction_failure() {
		let wallet = Arc::new(FakeWallet {
			revert: Some("deposit".to_string()),
			..Default::default()
		});
		let index = Arc::new(FakeIndex::at(1_000));
		let plan = TransactionPlan::direct(ActionKind::Deposit, vec![deposit()]).unwrap();

		let err = executor(wallet, index.clone())
			.execute(&plan, &CancelSignal::never())
			.await
			.unwrap_err();

		assert!(matches!(
			err,
			ExecutionError::TransactionFailed { ref step, tx_hash: Some(_), .. } if step == "deposit"
		));
		assert_eq!(index.polls(), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn test_waits_for_index_to_reach_receipt_block() {
		let wallet = Arc::new(FakeWallet::default());
		let index = Arc::new(FakeIndex::new(vec![
			Ok(98),
			Err(IndexError::Transport("connection reset".to_string())),
			Ok(99),
			Ok(100),
		]));
		let plan = TransactionPlan::direct(ActionKind::Deposit, vec![deposit()]).unwrap();

		let report = executor(wallet, index.clone())
			.execute(&plan, &CancelSignal::never())
			.await
			.unwrap();

		assert_eq!(report.indexed_block, Some(100));
		assert_eq!(index.polls(), 4);
	}

	#[tokio::test(start_paused = true)]
	async fn test_sync_timeout_is_distinct_from_failure() {
		let wallet = Arc::new(FakeWallet::default());
		let index = Arc::new(FakeIndex::at(42));
		let plan = TransactionPlan::direct(ActionKind::Deposit, vec![deposit()]).unwrap();

		let err = executor(wallet, index)
			.execute(&plan, &CancelSignal::never())
			.await
			.unwrap_err();

		assert!(err.state_changed());
		match err {
			ExecutionError::SyncTimeout {
				block_number,
				indexed_block,
				waited_ms,
				..
			} => {
				assert_eq!(block_number, 100);
				assert_eq!(indexed_block, Some(42));
				assert!(waited_ms >= 1_000);
			},
			other => panic!("expected sync timeout, got {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_cancel_stops_index_wait() {
		let wallet = Arc::new(FakeWallet::default());
		let index = Arc::new(FakeIndex::at(0));
		let plan = TransactionPlan::direct(ActionKind::Deposit, vec![deposit()]).unwrap();
		let executor = executor(wallet.clone(), index).with_sync_policy(IndexSyncPolicy {
			poll_interval: Duration::from_millis(5),
			timeout: Duration::from_secs(60),
		});

		let (handle, signal) = cancel_pair();
		let run = tokio::spawn(async move { executor.execute(&plan, &signal).await });
		tokio::time::sleep(Duration::from_millis(30)).await;
		handle.cancel();

		assert_eq!(run.await.unwrap().unwrap_err(), ExecutionError::Cancelled);
		// The broadcast transaction stays broadcast
		assert_eq!(wallet.events(), vec!["send:deposit", "confirm:deposit"]);
	}

	#[tokio::test]
	async fn test_batched_plan_is_one_bundle() {
		let wallet = Arc::new(FakeWallet::default());
		let relay = Arc::new(FakeRelay::default());
		let plan =
			TransactionPlan::batched(ActionKind::Deposit, vec![approve(), deposit()]).unwrap();

		let report = executor(wallet.clone(), Arc::new(FakeIndex::at(500)))
			.with_relay(relay.clone())
			.execute(&plan, &CancelSignal::never())
			.await
			.unwrap();

		assert_eq!(
			*relay.bundles.lock().unwrap(),
			vec![vec!["approve".to_string(), "deposit".to_string()]]
		);
		assert!(wallet.events().is_empty());
		assert_eq!(report.receipts.len(), 1);
		assert_eq!(report.indexed_block, Some(500));
	}

	#[tokio::test]
	async fn test_batched_without_relay_or_capacity() {
		let plan =
			TransactionPlan::batched(ActionKind::Deposit, vec![approve(), deposit()]).unwrap();

		let err = executor(
			Arc::new(FakeWallet::default()),
			Arc::new(FakeIndex::at(500)),
		)
		.execute(&plan, &CancelSignal::never())
		.await
		.unwrap_err();
		assert_eq!(err, ExecutionError::RelayUnavailable);

		let relay = Arc::new(FakeRelay {
			max_calls: Some(1),
			..Default::default()
		});
		let err = executor(
			Arc::new(FakeWallet::default()),
			Arc::new(FakeIndex::at(500)),
		)
		.with_relay(relay.clone())
		.execute(&plan, &CancelSignal::never())
		.await
		.unwrap_err();
		assert_eq!(
			err,
			ExecutionError::NotBatchable {
				steps: vec!["approve".to_string(), "deposit".to_string()]
			}
		);
		assert!(relay.bundles.lock().unwrap().is_empty());
	}
}
