//! Action service
//!
//! Single entry point for every action kind. A submission runs
//! classify -> compose -> execute -> notify -> invalidate. Direct-mode
//! approvals run as their own plan; once the index has caught up, the main
//! step is composed from a fresh snapshot.

use std::sync::Arc;

use alloy_primitives::U256;
use ma_types::{
	ActionIntent, ActionKind, AmountError, ComposeError, ConnectionMode, ExecutionError,
	ExecutionReport, MarketAccountSnapshot, Notice, NoticeStage, Notifier, OperationStep,
	ReadinessStatus, StateError, StateProvider, TokenAmount, TransactionPlan,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cancel::CancelSignal;
use crate::classifier::{classify, preview_apr, resolve_amount, AprPreview};
use crate::composer::TransactionComposer;
use crate::executor::PlanExecutorTrait;
use crate::invalidator::CacheInvalidator;
use crate::notifier::{
	ActionMessages, ApprovalMessages, CONFIRMATION_TIMEOUT_MESSAGE, SYNC_TIMEOUT_MESSAGE,
};

const TRACING_TARGET: &str = "ma_service::action";

#[derive(Debug, Error)]
pub enum ActionServiceError {
	#[error("state unavailable: {0}")]
	State(#[from] StateError),
	#[error("invalid amount: {0}")]
	Amount(#[from] AmountError),
	#[error("{0}")]
	Compose(#[from] ComposeError),
	#[error("execution failed: {0}")]
	Execution(#[from] ExecutionError),
	#[error("allowance for {kind} still insufficient after approval")]
	AllowanceNotApplied { kind: ActionKind },
	#[error("nothing left to submit for {kind} after approval")]
	NothingAfterApproval { kind: ActionKind },
}

impl ActionServiceError {
	/// Inline message for validation failures
	pub fn status_message(&self) -> Option<&str> {
		match self {
			ActionServiceError::Compose(ComposeError::NotReady {
				message: Some(message),
				..
			}) => Some(message.as_str()),
			_ => None,
		}
	}
}

/// Classification and plan for a form that has not been submitted yet
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionPreview {
	pub status: ReadinessStatus,
	pub message: Option<String>,
	/// `None` when nothing would be submitted or the status blocks execution
	pub plan: Option<TransactionPlan>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
	/// Nothing needed submitting; the wallet was never prompted
	NoOp,
	Completed {
		/// Report of the standalone approval plan, in direct mode
		approval: Option<ExecutionReport>,
		report: ExecutionReport,
	},
}

pub struct ActionService {
	state: Arc<dyn StateProvider>,
	composer: TransactionComposer,
	executor: Arc<dyn PlanExecutorTrait>,
	invalidator: CacheInvalidator,
	notifier: Arc<dyn Notifier>,
}

impl ActionService {
	pub fn new(
		state: Arc<dyn StateProvider>,
		composer: TransactionComposer,
		executor: Arc<dyn PlanExecutorTrait>,
		invalidator: CacheInvalidator,
		notifier: Arc<dyn Notifier>,
	) -> Self {
		Self {
			state,
			composer,
			executor,
			invalidator,
			notifier,
		}
	}

	/// Classify and compose against freshly fetched state, without submitting
	pub async fn preview(
		&self,
		intent: &ActionIntent,
		mode: ConnectionMode,
	) -> Result<ActionPreview, ActionServiceError> {
		let snapshot = self.snapshot(intent).await?;
		self.preview_with_snapshot(intent, &snapshot, mode)
	}

	/// Same as [`ActionService::preview`] for a snapshot the caller already holds
	pub fn preview_with_snapshot(
		&self,
		intent: &ActionIntent,
		snapshot: &MarketAccountSnapshot,
		mode: ConnectionMode,
	) -> Result<ActionPreview, ActionServiceError> {
		preview_action(&self.composer, intent, snapshot, mode)
	}

	/// Status and resulting reserve ratio for a prospective APR
	pub async fn preview_apr(
		&self,
		intent: &ActionIntent,
		apr_percent: &str,
	) -> Result<AprPreview, ActionServiceError> {
		let snapshot = self.snapshot(intent).await?;
		Ok(preview_apr(intent, &snapshot, apr_percent))
	}

	/// Submit one intent
	///
	/// Validation failures before anything is submitted return an error
	/// without notices. Once an approval went through, every error ends in a
	/// failure notice. Execution failures notify and skip invalidation; sync
	/// and confirmation timeouts notify with their own stage and still
	/// invalidate, since the chain state may have moved.
	pub async fn submit(
		&self,
		intent: &ActionIntent,
		mode: ConnectionMode,
		cancel: &CancelSignal,
	) -> Result<ActionOutcome, ActionServiceError> {
		let kind = intent.kind();
		let snapshot = self.snapshot(intent).await?;
		let Some(plan) = self.compose(intent, &snapshot, mode)? else {
			debug!(target: TRACING_TARGET, kind = %kind, market = %intent.market, "Nothing to submit");
			return Ok(ActionOutcome::NoOp);
		};

		let (approval, plan, snapshot) = if plan.completes_intent() {
			(None, plan, snapshot)
		} else {
			let report = self.run_approval(intent, &plan, &snapshot, cancel).await?;
			match self.compose_after_approval(intent).await {
				Ok((main, fresh)) => (Some(report), main, fresh),
				Err(e) => {
					warn!(
						target: TRACING_TARGET,
						kind = %kind,
						error = %e,
						"Action stopped after approval"
					);
					let amount = entered_amount(intent, &snapshot).ok().flatten();
					let messages = ActionMessages::new(kind, amount.as_ref(), &snapshot.market.name);
					self.notify(kind, NoticeStage::Failure, messages.failure());
					return Err(e);
				},
			}
		};

		let amount = entered_amount(intent, &snapshot)?;
		let messages = ActionMessages::new(kind, amount.as_ref(), &snapshot.market.name);
		self.notify(kind, NoticeStage::Pending, messages.pending());

		match self.executor.execute(&plan, cancel).await {
			Ok(report) => {
				self.notify(kind, NoticeStage::Success, messages.success());
				self.invalidator.invalidate(kind, &intent.market, &intent.account);
				info!(
					target: TRACING_TARGET,
					kind = %kind,
					market = %intent.market,
					tx_hash = %report.receipt.transaction_hash,
					"Action completed"
				);
				Ok(ActionOutcome::Completed { approval, report })
			},
			Err(e) if e.may_have_landed() => Err(self.unsettled(intent, e)),
			Err(ExecutionError::Cancelled) => {
				info!(target: TRACING_TARGET, kind = %kind, "Stopped waiting for action");
				Err(ExecutionError::Cancelled.into())
			},
			Err(e) => {
				warn!(target: TRACING_TARGET, kind = %kind, error = %e, "Action failed");
				self.notify(kind, NoticeStage::Failure, messages.failure());
				Err(e.into())
			},
		}
	}

	async fn snapshot(&self, intent: &ActionIntent) -> Result<MarketAccountSnapshot, StateError> {
		self.state.snapshot(intent.market, intent.account).await
	}

	/// Re-read state after an approval and compose the main step
	async fn compose_after_approval(
		&self,
		intent: &ActionIntent,
	) -> Result<(TransactionPlan, MarketAccountSnapshot), ActionServiceError> {
		let kind = intent.kind();
		let snapshot = self.snapshot(intent).await?;
		match self.compose(intent, &snapshot, ConnectionMode::Direct)? {
			Some(main) if main.completes_intent() => Ok((main, snapshot)),
			Some(_) => Err(ActionServiceError::AllowanceNotApplied { kind }),
			None => Err(ActionServiceError::NothingAfterApproval { kind }),
		}
	}

	fn compose(
		&self,
		intent: &ActionIntent,
		snapshot: &MarketAccountSnapshot,
		mode: ConnectionMode,
	) -> Result<Option<TransactionPlan>, ActionServiceError> {
		let amount = entered_amount(intent, snapshot)?;
		let status = classify(intent, snapshot, amount.as_ref());
		debug!(
			target: TRACING_TARGET,
			kind = %intent.kind(),
			status = %status,
			mode = ?mode,
			"Classified intent"
		);
		Ok(self
			.composer
			.compose(intent, snapshot, amount.as_ref(), status, mode)?)
	}

	/// Run a direct approval plan with its own notices
	async fn run_approval(
		&self,
		intent: &ActionIntent,
		plan: &TransactionPlan,
		snapshot: &MarketAccountSnapshot,
		cancel: &CancelSignal,
	) -> Result<ExecutionReport, ActionServiceError> {
		let kind = intent.kind();
		let approved = approved_amount(plan).unwrap_or(U256::ZERO);
		let amount = snapshot.market.underlying.amount(approved);
		let resets_first = matches!(
			plan.steps().first(),
			Some(OperationStep::ResetApproval { .. })
		);
		let messages = ApprovalMessages::new(&amount, resets_first);

		self.notify(kind, NoticeStage::Pending, messages.pending());
		match self.executor.execute(plan, cancel).await {
			Ok(report) => {
				self.notify(kind, NoticeStage::Success, messages.success());
				Ok(report)
			},
			Err(e) if e.may_have_landed() => Err(self.unsettled(intent, e)),
			Err(ExecutionError::Cancelled) => Err(ExecutionError::Cancelled.into()),
			Err(e) => {
				warn!(target: TRACING_TARGET, kind = %kind, error = %e, "Approval failed");
				let step = failed_step(&e).unwrap_or("approve");
				self.notify(kind, NoticeStage::Failure, messages.failure(step));
				Err(e.into())
			},
		}
	}

	/// Timed out after broadcast: its own notice, no failure, caches dropped
	fn unsettled(&self, intent: &ActionIntent, error: ExecutionError) -> ActionServiceError {
		let kind = intent.kind();
		let (stage, message) = match &error {
			ExecutionError::SyncTimeout { .. } => (NoticeStage::SyncTimeout, SYNC_TIMEOUT_MESSAGE),
			_ => (NoticeStage::ConfirmationTimeout, CONFIRMATION_TIMEOUT_MESSAGE),
		};
		warn!(target: TRACING_TARGET, kind = %kind, error = %error, "Action outcome not yet known");
		self.notify(kind, stage, message.to_string());
		self.invalidator.invalidate(kind, &intent.market, &intent.account);
		error.into()
	}

	fn notify(&self, kind: ActionKind, stage: NoticeStage, message: String) {
		self.notifier.notify(Notice::new(kind, stage, message));
	}
}

impl std::fmt::Debug for ActionService {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ActionService")
			.field("composer", &self.composer)
			.field("invalidator", &self.invalidator)
			.finish_non_exhaustive()
	}
}

/// Classify and compose without any collaborators
pub fn preview_action(
	composer: &TransactionComposer,
	intent: &ActionIntent,
	snapshot: &MarketAccountSnapshot,
	mode: ConnectionMode,
) -> Result<ActionPreview, ActionServiceError> {
	let kind = intent.kind();
	let amount = entered_amount(intent, snapshot)?;
	let status = classify(intent, snapshot, amount.as_ref());
	let plan = if status.is_actionable() {
		composer.compose(intent, snapshot, amount.as_ref(), status, mode)?
	} else {
		None
	};
	Ok(ActionPreview {
		status,
		message: status.message(kind).map(str::to_string),
		plan,
	})
}

/// Parsed amount, with empty or negative input treated as zero
fn entered_amount(
	intent: &ActionIntent,
	snapshot: &MarketAccountSnapshot,
) -> Result<Option<TokenAmount>, AmountError> {
	match resolve_amount(intent, &snapshot.market) {
		Err(e) if e.is_non_positive() => Ok(Some(snapshot.market.underlying.amount(U256::ZERO))),
		other => other,
	}
}

fn approved_amount(plan: &TransactionPlan) -> Option<U256> {
	plan.steps().iter().find_map(|step| match step {
		OperationStep::Approve { amount, .. } => Some(*amount),
		_ => None,
	})
}

fn failed_step(error: &ExecutionError) -> Option<&str> {
	match error {
		ExecutionError::UserRejected { step } | ExecutionError::TransactionFailed { step, .. } => {
			Some(step)
		},
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::allowance::AllowancePolicy;
	use crate::executor::MockPlanExecutorTrait;
	use crate::test_support::{lender_intent, snapshot, units, MARKET, USDT};
	use alloy_primitives::{Address, B256};
	use async_trait::async_trait;
	use ma_cache::MemoryQueryCache;
	use ma_types::{ActionParams, CacheKey, CacheNamespace, ExecutionMode, QueryCache, Receipt};
	use pretty_assertions::assert_eq;
	use std::collections::VecDeque;
	use std::sync::Mutex;

	/// Hands out queued snapshots, repeating the last one
	struct QueuedState {
		snapshots: Mutex<VecDeque<MarketAccountSnapshot>>,
		fail_when_drained: bool,
	}

	impl QueuedState {
		fn new(snapshots: Vec<MarketAccountSnapshot>) -> Self {
			Self {
				snapshots: Mutex::new(snapshots.into()),
				fail_when_drained: false,
			}
		}

		/// Serves `first` once, then reports the provider as unavailable
		fn failing_after(first: MarketAccountSnapshot) -> Self {
			Self {
				snapshots: Mutex::new(vec![first].into()),
				fail_when_drained: true,
			}
		}
	}

	#[async_trait]
	impl StateProvider for QueuedState {
		async fn snapshot(
			&self,
			market: Address,
			_account: Address,
		) -> Result<MarketAccountSnapshot, StateError> {
			let mut snapshots = self.snapshots.lock().unwrap();
			let next = if snapshots.len() > 1 || self.fail_when_drained {
				snapshots.pop_front()
			} else {
				snapshots.front().cloned()
			};
			if next.is_none() && self.fail_when_drained {
				return Err(StateError::Unavailable {
					reason: "rpc down".to_string(),
				});
			}
			next.ok_or(StateError::MarketNotFound { market })
		}
	}

	#[derive(Default)]
	struct RecordingNotifier {
		notices: Mutex<Vec<(NoticeStage, String)>>,
	}

	impl RecordingNotifier {
		fn notices(&self) -> Vec<(NoticeStage, String)> {
			self.notices.lock().unwrap().clone()
		}
	}

	impl Notifier for RecordingNotifier {
		fn notify(&self, notice: Notice) {
			self.notices
				.lock()
				.unwrap()
				.push((notice.stage, notice.message));
		}
	}

	struct Harness {
		service: ActionService,
		notifier: Arc<RecordingNotifier>,
		cache: MemoryQueryCache,
	}

	fn harness(snapshots: Vec<MarketAccountSnapshot>, executor: MockPlanExecutorTrait) -> Harness {
		harness_with_state(Arc::new(QueuedState::new(snapshots)), executor)
	}

	fn harness_with_state(
		state: Arc<dyn StateProvider>,
		executor: MockPlanExecutorTrait,
	) -> Harness {
		let notifier = Arc::new(RecordingNotifier::default());
		let cache = MemoryQueryCache::new();
		for namespace in [
			CacheNamespace::Market,
			CacheNamespace::MarketAccount,
			CacheNamespace::BorrowerMarketAccount,
			CacheNamespace::LendersByMarket,
		] {
			cache
				.put(CacheKey::new(namespace, MARKET), serde_json::json!({}))
				.unwrap();
		}
		let service = ActionService::new(
			state,
			TransactionComposer::new(AllowancePolicy::new([USDT])),
			Arc::new(executor),
			CacheInvalidator::new(Arc::new(cache.clone())),
			notifier.clone(),
		);
		Harness {
			service,
			notifier,
			cache,
		}
	}

	fn report(block_number: u64) -> ExecutionReport {
		let receipt = Receipt {
			transaction_hash: B256::with_last_byte(1),
			block_number,
			success: true,
			gas_used: 0,
		};
		ExecutionReport {
			receipt: receipt.clone(),
			receipts: vec![receipt],
			indexed_block: Some(block_number),
		}
	}

	fn deposit(amount: &str) -> ActionIntent {
		lender_intent(ActionParams::Deposit {
			amount: amount.to_string(),
		})
	}

	fn stale(cache: &MemoryQueryCache, namespace: CacheNamespace) -> bool {
		cache.is_stale(&CacheKey::new(namespace, MARKET))
	}

	#[tokio::test]
	async fn test_zero_amount_never_reaches_executor() {
		let mut executor = MockPlanExecutorTrait::new();
		executor.expect_execute().never();
		let h = harness(vec![snapshot()], executor);

		for amount in ["0", "", "-5"] {
			let outcome = h
				.service
				.submit(&deposit(amount), ConnectionMode::Direct, &CancelSignal::never())
				.await
				.unwrap();
			assert_eq!(outcome, ActionOutcome::NoOp);
		}
		assert!(h.notifier.notices().is_empty());
	}

	#[tokio::test]
	async fn test_amount_finer_than_token_decimals_is_rejected() {
		let mut executor = MockPlanExecutorTrait::new();
		executor.expect_execute().never();
		let h = harness(vec![snapshot()], executor);

		for amount in ["100.0000009", "0.0000001"] {
			let err = h
				.service
				.submit(&deposit(amount), ConnectionMode::Direct, &CancelSignal::never())
				.await
				.unwrap_err();
			assert!(matches!(err, ActionServiceError::Amount(AmountError::Invalid { .. })));
		}
		assert!(h.notifier.notices().is_empty());
	}

	#[tokio::test]
	async fn test_not_ready_is_rejected_without_notices() {
		let mut snap = snapshot();
		snap.market.is_closed = true;
		let mut executor = MockPlanExecutorTrait::new();
		executor.expect_execute().never();
		let h = harness(vec![snap], executor);

		let err = h
			.service
			.submit(&deposit("10"), ConnectionMode::Direct, &CancelSignal::never())
			.await
			.unwrap_err();
		assert_eq!(err.status_message(), Some("Market is closed"));
		assert!(h.notifier.notices().is_empty());
	}

	#[tokio::test]
	async fn test_success_notifies_and_invalidates() {
		let mut executor = MockPlanExecutorTrait::new();
		executor
			.expect_execute()
			.times(1)
			.withf(|plan, _| plan.step_names() == vec!["deposit"])
			.returning(|_, _| Ok(report(100)));
		let h = harness(vec![snapshot()], executor);

		let outcome = h
			.service
			.submit(&deposit("100"), ConnectionMode::Direct, &CancelSignal::never())
			.await
			.unwrap();

		assert!(matches!(outcome, ActionOutcome::Completed { approval: None, .. }));
		assert_eq!(
			h.notifier.notices(),
			vec![
				(NoticeStage::Pending, "Depositing 100 USDT...".to_string()),
				(
					NoticeStage::Success,
					"Successfully Deposited 100 USDT!".to_string()
				),
			]
		);
		assert!(stale(&h.cache, CacheNamespace::Market));
		assert!(stale(&h.cache, CacheNamespace::MarketAccount));
		assert!(!stale(&h.cache, CacheNamespace::LendersByMarket));
		assert!(!stale(&h.cache, CacheNamespace::BorrowerMarketAccount));
	}

	#[tokio::test]
	async fn test_direct_approval_then_fresh_classification() {
		let mut before = snapshot();
		before.account.underlying_approval = units(50);
		let mut after = snapshot();
		after.account.underlying_approval = units(100);

		let mut executor = MockPlanExecutorTrait::new();
		let mut seq = mockall::Sequence::new();
		executor
			.expect_execute()
			.times(1)
			.in_sequence(&mut seq)
			.withf(|plan, _| {
				plan.step_names() == vec!["reset-approve", "approve"] && !plan.completes_intent()
			})
			.returning(|_, _| Ok(report(10)));
		executor
			.expect_execute()
			.times(1)
			.in_sequence(&mut seq)
			.withf(|plan, _| plan.step_names() == vec!["deposit"] && plan.completes_intent())
			.returning(|_, _| Ok(report(11)));
		let h = harness(vec![before, after], executor);

		let outcome = h
			.service
			.submit(&deposit("100"), ConnectionMode::Direct, &CancelSignal::never())
			.await
			.unwrap();

		match outcome {
			ActionOutcome::Completed { approval, report } => {
				assert_eq!(approval.map(|r| r.receipt.block_number), Some(10));
				assert_eq!(report.receipt.block_number, 11);
			},
			other => panic!("unexpected outcome {:?}", other),
		}
		let messages: Vec<String> = h.notifier.notices().into_iter().map(|(_, m)| m).collect();
		assert_eq!(
			messages,
			vec![
				"Step 1/2: Resetting allowance for USDT...",
				"Successfully Approved 100 USDT!",
				"Depositing 100 USDT...",
				"Successfully Deposited 100 USDT!",
			]
		);
	}

	#[tokio::test]
	async fn test_allowance_still_missing_after_approval_ends_in_failure() {
		let mut snap = snapshot();
		snap.account.underlying_approval = units(50);

		let mut executor = MockPlanExecutorTrait::new();
		executor
			.expect_execute()
			.times(1)
			.returning(|_, _| Ok(report(10)));
		let h = harness(vec![snap], executor);

		let err = h
			.service
			.submit(&deposit("100"), ConnectionMode::Direct, &CancelSignal::never())
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			ActionServiceError::AllowanceNotApplied {
				kind: ActionKind::Deposit
			}
		));
		assert_eq!(
			h.notifier.notices(),
			vec![
				(
					NoticeStage::Pending,
					"Step 1/2: Resetting allowance for USDT...".to_string()
				),
				(
					NoticeStage::Success,
					"Successfully Approved 100 USDT!".to_string()
				),
				(NoticeStage::Failure, "Error: Deposit Failed".to_string()),
			]
		);
		assert!(!stale(&h.cache, CacheNamespace::MarketAccount));
	}

	#[tokio::test]
	async fn test_state_error_after_approval_ends_in_failure() {
		let mut before = snapshot();
		before.account.underlying_approval = U256::ZERO;

		let mut executor = MockPlanExecutorTrait::new();
		executor
			.expect_execute()
			.times(1)
			.returning(|_, _| Ok(report(10)));
		let h = harness_with_state(Arc::new(QueuedState::failing_after(before)), executor);

		let err = h
			.service
			.submit(&deposit("100"), ConnectionMode::Direct, &CancelSignal::never())
			.await
			.unwrap_err();
		assert!(matches!(err, ActionServiceError::State(_)));
		let stages: Vec<NoticeStage> = h.notifier.notices().into_iter().map(|(s, _)| s).collect();
		assert_eq!(
			stages,
			vec![NoticeStage::Pending, NoticeStage::Success, NoticeStage::Failure]
		);
	}

	#[tokio::test]
	async fn test_batched_mode_submits_single_plan() {
		let mut snap = snapshot();
		snap.account.underlying_approval = U256::ZERO;

		let mut executor = MockPlanExecutorTrait::new();
		executor
			.expect_execute()
			.times(1)
			.withf(|plan, _| {
				plan.mode() == ExecutionMode::Batched
					&& plan.step_names() == vec!["approve", "deposit"]
			})
			.returning(|_, _| Ok(report(12)));
		let h = harness(vec![snap], executor);

		let outcome = h
			.service
			.submit(&deposit("100"), ConnectionMode::Batched, &CancelSignal::never())
			.await
			.unwrap();
		assert!(matches!(outcome, ActionOutcome::Completed { approval: None, .. }));
	}

	#[tokio::test]
	async fn test_failure_notifies_without_invalidating() {
		let mut executor = MockPlanExecutorTrait::new();
		executor.expect_execute().times(1).returning(|_, _| {
			Err(ExecutionError::TransactionFailed {
				step: "repay".to_string(),
				tx_hash: None,
				reason: "transaction reverted".to_string(),
			})
		});
		let mut snap = snapshot();
		snap.account.address = crate::test_support::BORROWER;
		let h = harness(vec![snap], executor);

		let intent = crate::test_support::borrower_intent(ActionParams::Repay {
			amount: "100".to_string(),
		});
		let err = h
			.service
			.submit(&intent, ConnectionMode::Direct, &CancelSignal::never())
			.await
			.unwrap_err();

		assert!(matches!(err, ActionServiceError::Execution(_)));
		assert_eq!(
			h.notifier.notices().last(),
			Some(&(
				NoticeStage::Failure,
				"Error: Repayment Attempt Failed".to_string()
			))
		);
		assert!(!stale(&h.cache, CacheNamespace::BorrowerMarketAccount));
	}

	#[tokio::test]
	async fn test_sync_timeout_has_own_notice_and_invalidates() {
		let mut executor = MockPlanExecutorTrait::new();
		executor.expect_execute().times(1).returning(|_, _| {
			Err(ExecutionError::SyncTimeout {
				tx_hash: B256::ZERO,
				block_number: 100,
				indexed_block: Some(90),
				waited_ms: 60_000,
			})
		});
		let h = harness(vec![snapshot()], executor);

		let err = h
			.service
			.submit(&deposit("100"), ConnectionMode::Direct, &CancelSignal::never())
			.await
			.unwrap_err();

		assert!(matches!(
			err,
			ActionServiceError::Execution(ExecutionError::SyncTimeout { .. })
		));
		assert_eq!(
			h.notifier.notices().last(),
			Some(&(NoticeStage::SyncTimeout, SYNC_TIMEOUT_MESSAGE.to_string()))
		);
		assert!(stale(&h.cache, CacheNamespace::Market));
	}

	#[tokio::test]
	async fn test_confirmation_timeout_is_not_reported_as_failure() {
		let mut executor = MockPlanExecutorTrait::new();
		executor.expect_execute().times(1).returning(|_, _| {
			Err(ExecutionError::ConfirmationTimeout {
				step: "deposit".to_string(),
				tx_hash: Some(B256::with_last_byte(7)),
				timeout_ms: 30_000,
			})
		});
		let h = harness(vec![snapshot()], executor);

		let err = h
			.service
			.submit(&deposit("100"), ConnectionMode::Direct, &CancelSignal::never())
			.await
			.unwrap_err();

		assert!(matches!(
			err,
			ActionServiceError::Execution(ExecutionError::ConfirmationTimeout { .. })
		));
		assert_eq!(
			h.notifier.notices(),
			vec![
				(NoticeStage::Pending, "Depositing 100 USDT...".to_string()),
				(
					NoticeStage::ConfirmationTimeout,
					CONFIRMATION_TIMEOUT_MESSAGE.to_string()
				),
			]
		);
		assert!(stale(&h.cache, CacheNamespace::Market));
		assert!(stale(&h.cache, CacheNamespace::MarketAccount));
	}

	#[tokio::test]
	async fn test_approval_sync_timeout_stops_before_main_step() {
		let mut snap = snapshot();
		snap.account.underlying_approval = U256::ZERO;

		let mut executor = MockPlanExecutorTrait::new();
		executor.expect_execute().times(1).returning(|_, _| {
			Err(ExecutionError::SyncTimeout {
				tx_hash: B256::ZERO,
				block_number: 10,
				indexed_block: Some(9),
				waited_ms: 60_000,
			})
		});
		let h = harness(vec![snap], executor);

		let err = h
			.service
			.submit(&deposit("100"), ConnectionMode::Direct, &CancelSignal::never())
			.await
			.unwrap_err();

		assert!(matches!(
			err,
			ActionServiceError::Execution(ExecutionError::SyncTimeout { .. })
		));
		assert_eq!(
			h.notifier.notices(),
			vec![
				(NoticeStage::Pending, "Approving 100 USDT...".to_string()),
				(NoticeStage::SyncTimeout, SYNC_TIMEOUT_MESSAGE.to_string()),
			]
		);
	}

	#[tokio::test]
	async fn test_preview_reports_status_message_and_plan() {
		let mut closed = snapshot();
		closed.market.is_closed = true;
		let h = harness(vec![closed.clone()], MockPlanExecutorTrait::new());

		let preview = h
			.service
			.preview(&deposit("10"), ConnectionMode::Direct)
			.await
			.unwrap();
		assert_eq!(preview.status, ReadinessStatus::MarketClosed);
		assert_eq!(preview.message.as_deref(), Some("Market is closed"));
		assert_eq!(preview.plan, None);

		let preview = h
			.service
			.preview_with_snapshot(&deposit("10"), &snapshot(), ConnectionMode::Direct)
			.unwrap();
		assert_eq!(preview.status, ReadinessStatus::Ready);
		assert_eq!(preview.plan.map(|p| p.step_names()), Some(vec!["deposit"]));
	}
}
