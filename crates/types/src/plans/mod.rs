//! Operation steps and transaction plans

pub mod errors;

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::actions::ActionKind;

pub use errors::{ComposeError, ComposeResult};

/// One contract call in a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum OperationStep {
	/// `approve(spender, 0)` before changing a non-zero allowance
	ResetApproval { token: Address, spender: Address },
	Approve {
		token: Address,
		spender: Address,
		amount: U256,
	},
	Deposit { market: Address, amount: U256 },
	QueueWithdrawal { market: Address, amount: U256 },
	Claim {
		market: Address,
		lender: Address,
		expiries: Vec<u32>,
	},
	Repay { market: Address, amount: U256 },
	RepayAndProcessUnpaidBatches {
		market: Address,
		amount: U256,
		#[serde(rename = "maxBatches")]
		max_batches: u32,
	},
	Borrow { market: Address, amount: U256 },
	SetApr {
		controller: Address,
		market: Address,
		bips: u16,
	},
	SetMaxSupply { market: Address, amount: U256 },
	CloseMarket { market: Address },
	AuthorizeLenders {
		controller: Address,
		lenders: Vec<Address>,
		markets: Vec<Address>,
	},
	DeauthorizeLenders {
		controller: Address,
		lenders: Vec<Address>,
		markets: Vec<Address>,
	},
	ResetReserveRatio { controller: Address, market: Address },
}

impl OperationStep {
	pub fn name(&self) -> &'static str {
		match self {
			OperationStep::ResetApproval { .. } => "reset-approve",
			OperationStep::Approve { .. } => "approve",
			OperationStep::Deposit { .. } => "deposit",
			OperationStep::QueueWithdrawal { .. } => "withdraw-queue",
			OperationStep::Claim { .. } => "claim",
			OperationStep::Repay { .. } => "repay",
			OperationStep::RepayAndProcessUnpaidBatches { .. } => {
				"repay-and-process-unpaid-batches"
			},
			OperationStep::Borrow { .. } => "borrow",
			OperationStep::SetApr { .. } => "set-apr",
			OperationStep::SetMaxSupply { .. } => "set-max-supply",
			OperationStep::CloseMarket { .. } => "close-market",
			OperationStep::AuthorizeLenders { .. } => "authorize",
			OperationStep::DeauthorizeLenders { .. } => "deauthorize",
			OperationStep::ResetReserveRatio { .. } => "reset-reserve-ratio",
		}
	}

	pub fn is_approval(&self) -> bool {
		matches!(
			self,
			OperationStep::ResetApproval { .. } | OperationStep::Approve { .. }
		)
	}
}

impl fmt::Display for OperationStep {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// How a plan reaches the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExecutionMode {
	/// One wallet transaction per step, strictly sequential
	Direct,
	/// All steps in one atomic multi-owner bundle
	Batched,
}

/// Kind of wallet connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionMode {
	/// Externally owned account
	#[default]
	Direct,
	/// Multi-owner smart account that accepts call bundles
	Batched,
}

/// Ordered steps plus a fixed execution mode
///
/// A plan always has at least one step. Construct through [`TransactionPlan::direct`],
/// [`TransactionPlan::approval_only`] or [`TransactionPlan::batched`];
/// deserialization goes through the same checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "PlanFields")]
pub struct TransactionPlan {
	kind: ActionKind,
	steps: Vec<OperationStep>,
	mode: ExecutionMode,
	completes_intent: bool,
}

impl TransactionPlan {
	/// Single-signer plan that completes the intent
	pub fn direct(kind: ActionKind, steps: Vec<OperationStep>) -> ComposeResult<Self> {
		Self::build(kind, steps, ExecutionMode::Direct, true)
	}

	/// Approval steps that must confirm before the main action is composed
	pub fn approval_only(kind: ActionKind, steps: Vec<OperationStep>) -> ComposeResult<Self> {
		if steps.iter().any(|s| !s.is_approval()) {
			return Err(ComposeError::Invalid {
				reason: "approval plan contains a non-approval step".to_string(),
			});
		}
		Self::build(kind, steps, ExecutionMode::Direct, false)
	}

	/// Atomic bundle for a multi-owner account
	pub fn batched(kind: ActionKind, steps: Vec<OperationStep>) -> ComposeResult<Self> {
		Self::build(kind, steps, ExecutionMode::Batched, true)
	}

	fn build(
		kind: ActionKind,
		steps: Vec<OperationStep>,
		mode: ExecutionMode,
		completes_intent: bool,
	) -> ComposeResult<Self> {
		if steps.is_empty() {
			return Err(ComposeError::EmptyPlan { kind });
		}
		Ok(Self {
			kind,
			steps,
			mode,
			completes_intent,
		})
	}

	pub fn kind(&self) -> ActionKind {
		self.kind
	}

	pub fn steps(&self) -> &[OperationStep] {
		&self.steps
	}

	pub fn mode(&self) -> ExecutionMode {
		self.mode
	}

	/// False for direct approval plans, whose main step is still outstanding
	pub fn completes_intent(&self) -> bool {
		self.completes_intent
	}

	pub fn len(&self) -> usize {
		self.steps.len()
	}

	pub fn is_empty(&self) -> bool {
		self.steps.is_empty()
	}

	/// Step names in order, for logs
	pub fn step_names(&self) -> Vec<&'static str> {
		self.steps.iter().map(OperationStep::name).collect()
	}
}

/// Wire shape of a plan before validation
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanFields {
	kind: ActionKind,
	steps: Vec<OperationStep>,
	mode: ExecutionMode,
	completes_intent: bool,
}

impl TryFrom<PlanFields> for TransactionPlan {
	type Error = ComposeError;

	fn try_from(fields: PlanFields) -> ComposeResult<Self> {
		match (fields.mode, fields.completes_intent) {
			(ExecutionMode::Direct, true) => Self::direct(fields.kind, fields.steps),
			(ExecutionMode::Direct, false) => Self::approval_only(fields.kind, fields.steps),
			(ExecutionMode::Batched, true) => Self::batched(fields.kind, fields.steps),
			(ExecutionMode::Batched, false) => Err(ComposeError::Invalid {
				reason: "batched plans always complete the intent".to_string(),
			}),
		}
	}
}

/// Encoded call ready for a wallet or bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedTransaction {
	pub to: Address,
	pub data: Bytes,
	pub value: U256,
	/// Name of the step this call was encoded from
	pub label: String,
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;

	const TOKEN: Address = address!("dac17f958d2ee523a2206206994597c13d831ec7");
	const MARKET: Address = address!("1111111111111111111111111111111111111111");

	#[test]
	fn test_empty_plan_is_rejected() {
		let err = TransactionPlan::direct(ActionKind::Deposit, vec![]).unwrap_err();
		assert_eq!(
			err,
			ComposeError::EmptyPlan {
				kind: ActionKind::Deposit
			}
		);
	}

	#[test]
	fn test_approval_only_rejects_main_step() {
		let steps = vec![
			OperationStep::Approve {
				token: TOKEN,
				spender: MARKET,
				amount: U256::from(1),
			},
			OperationStep::Deposit {
				market: MARKET,
				amount: U256::from(1),
			},
		];
		assert!(TransactionPlan::approval_only(ActionKind::Deposit, steps).is_err());
	}

	#[test]
	fn test_approval_only_does_not_complete_intent() {
		let plan = TransactionPlan::approval_only(
			ActionKind::Repay,
			vec![OperationStep::Approve {
				token: TOKEN,
				spender: MARKET,
				amount: U256::from(1),
			}],
		)
		.unwrap();
		assert_eq!(plan.mode(), ExecutionMode::Direct);
		assert!(!plan.completes_intent());
		assert_eq!(plan.step_names(), vec!["approve"]);
	}

	#[test]
	fn test_deserialize_rejects_empty_plan() {
		let json = serde_json::json!({
			"kind": "deposit",
			"steps": [],
			"mode": "direct",
			"completesIntent": true,
		});
		let err = serde_json::from_value::<TransactionPlan>(json).unwrap_err();
		assert!(err.to_string().contains("has no steps"), "{}", err);
	}

	#[test]
	fn test_deserialize_checks_approval_plans() {
		let json = serde_json::json!({
			"kind": "deposit",
			"steps": [{ "step": "deposit", "market": MARKET, "amount": "0x1" }],
			"mode": "direct",
			"completesIntent": false,
		});
		assert!(serde_json::from_value::<TransactionPlan>(json).is_err());
	}

	#[test]
	fn test_serialized_plan_reads_back() {
		let plan = TransactionPlan::batched(
			ActionKind::Deposit,
			vec![OperationStep::Deposit {
				market: MARKET,
				amount: U256::from(1),
			}],
		)
		.unwrap();
		let json = serde_json::to_value(&plan).unwrap();
		assert_eq!(json["completesIntent"], true);
		assert_eq!(serde_json::from_value::<TransactionPlan>(json).unwrap(), plan);
	}

	#[test]
	fn test_step_serializes_with_tag() {
		let step = OperationStep::CloseMarket { market: MARKET };
		let json = serde_json::to_value(&step).unwrap();
		assert_eq!(json["step"], "closeMarket");
	}
}
