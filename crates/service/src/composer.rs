//! Transaction composer
//!
//! Builds the ordered step list for one intent. Approvals are prepended only
//! when the classifier reported `InsufficientAllowance`; in direct mode they
//! form a plan of their own and the main step is composed after they confirm.

use alloy_primitives::U256;
use ma_types::{
	ActionIntent, ActionKind, ActionParams, ComposeError, ComposeResult, ConnectionMode,
	MarketAccountSnapshot, OperationStep, ReadinessStatus, TokenAmount, TransactionPlan,
};
use tracing::debug;

use crate::allowance::AllowancePolicy;
use crate::classifier::{parse_apr_bips, requires_amount};

const TRACING_TARGET: &str = "ma_service::composer";

#[derive(Debug, Clone, Default)]
pub struct TransactionComposer {
	allowance: AllowancePolicy,
}

impl TransactionComposer {
	pub fn new(allowance: AllowancePolicy) -> Self {
		Self { allowance }
	}

	pub fn allowance_policy(&self) -> &AllowancePolicy {
		&self.allowance
	}

	/// Compose a plan for `intent`
	///
	/// Returns `Ok(None)` when there is nothing to submit: a zero amount, an
	/// empty lender list or no matured withdrawals. Statuses other than
	/// `Ready` and `InsufficientAllowance` are rejected with
	/// [`ComposeError::NotReady`].
	pub fn compose(
		&self,
		intent: &ActionIntent,
		snapshot: &MarketAccountSnapshot,
		amount: Option<&TokenAmount>,
		status: ReadinessStatus,
		mode: ConnectionMode,
	) -> ComposeResult<Option<TransactionPlan>> {
		let kind = intent.kind();

		let raw = match amount {
			Some(amount) => amount.raw,
			None if requires_amount(kind) => return Err(ComposeError::MissingAmount { kind }),
			None => U256::ZERO,
		};
		if requires_amount(kind) && raw.is_zero() {
			debug!(target: TRACING_TARGET, kind = %kind, "Zero amount, nothing to compose");
			return Ok(None);
		}

		if !status.is_actionable() {
			return Err(ComposeError::NotReady {
				kind,
				status,
				message: status.message(kind).map(str::to_string),
			});
		}

		let Some(main) = self.main_step(intent, snapshot, raw)? else {
			debug!(target: TRACING_TARGET, kind = %kind, "Nothing to submit");
			return Ok(None);
		};

		if status.is_ready() {
			return TransactionPlan::direct(kind, vec![main]).map(Some);
		}

		let approvals = self.allowance.plan_approval(
			status,
			snapshot.market.underlying.address,
			snapshot.market.address,
			snapshot.account.underlying_approval,
			approval_amount(kind, snapshot, raw),
		);

		let plan = match mode {
			ConnectionMode::Direct => TransactionPlan::approval_only(kind, approvals)?,
			ConnectionMode::Batched => {
				let mut steps = approvals;
				steps.push(main);
				TransactionPlan::batched(kind, steps)?
			},
		};
		debug!(
			target: TRACING_TARGET,
			kind = %kind,
			mode = ?plan.mode(),
			steps = ?plan.step_names(),
			"Composed plan with approvals"
		);
		Ok(Some(plan))
	}

	fn main_step(
		&self,
		intent: &ActionIntent,
		snapshot: &MarketAccountSnapshot,
		amount: U256,
	) -> ComposeResult<Option<OperationStep>> {
		let market = intent.market;
		let controller = snapshot.market.controller;

		let step = match &intent.params {
			ActionParams::Deposit { .. } => OperationStep::Deposit { market, amount },
			ActionParams::Withdraw { .. } => OperationStep::QueueWithdrawal { market, amount },
			ActionParams::Claim => {
				let expiries = snapshot.account.claimable_expiries();
				if expiries.is_empty() {
					return Ok(None);
				}
				OperationStep::Claim {
					market,
					lender: intent.account,
					expiries,
				}
			},
			ActionParams::Repay { .. } => OperationStep::Repay { market, amount },
			ActionParams::ProcessUnpaidBatch { max_batches, .. } => {
				OperationStep::RepayAndProcessUnpaidBatches {
					market,
					amount,
					max_batches: *max_batches,
				}
			},
			ActionParams::Borrow { .. } => OperationStep::Borrow { market, amount },
			ActionParams::AdjustApr { apr } => {
				let bips = parse_apr_bips(apr).ok_or_else(|| ComposeError::Invalid {
					reason: format!("unparseable APR '{}'", apr),
				})?;
				OperationStep::SetApr {
					controller,
					market,
					bips,
				}
			},
			ActionParams::SetMaxSupply { .. } => OperationStep::SetMaxSupply { market, amount },
			ActionParams::CloseMarket => OperationStep::CloseMarket { market },
			ActionParams::AuthorizeLenders { lenders } => {
				if lenders.is_empty() {
					return Ok(None);
				}
				OperationStep::AuthorizeLenders {
					controller,
					lenders: lenders.clone(),
					markets: vec![market],
				}
			},
			ActionParams::DeauthorizeLenders { lenders } => {
				if lenders.is_empty() {
					return Ok(None);
				}
				OperationStep::DeauthorizeLenders {
					controller,
					lenders: lenders.clone(),
					markets: vec![market],
				}
			},
			ActionParams::ResetReserveRatio => OperationStep::ResetReserveRatio { controller, market },
		};
		Ok(Some(step))
	}
}

/// Allowance the market needs to pull for this action
fn approval_amount(kind: ActionKind, snapshot: &MarketAccountSnapshot, amount: U256) -> U256 {
	match kind {
		ActionKind::CloseMarket => snapshot.market.outstanding_debt,
		_ => amount,
	}
}
