//! Allowance policy
//!
//! Some tokens (USDT among them) revert when a non-zero allowance is changed to
//! another non-zero value. For those the approval is preceded by a reset to zero.

use alloy_primitives::{Address, U256};
use ma_config::AllowanceSettings;
use ma_types::{OperationStep, ReadinessStatus};
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct AllowancePolicy {
	reset_required: HashSet<Address>,
}

impl AllowancePolicy {
	pub fn new(reset_required: impl IntoIterator<Item = Address>) -> Self {
		Self {
			reset_required: reset_required.into_iter().collect(),
		}
	}

	/// Whether `token` is on the reset deny-list
	pub fn requires_reset(&self, token: &Address) -> bool {
		self.reset_required.contains(token)
	}

	/// True only for deny-listed tokens with a non-zero current allowance
	pub fn needs_reset(&self, token: &Address, current_allowance: U256) -> bool {
		self.requires_reset(token) && !current_allowance.is_zero()
	}

	/// Approval steps that must precede the main action
	///
	/// Empty unless `status` is `InsufficientAllowance`. The reset, when
	/// needed, is always ordered before the approval.
	pub fn plan_approval(
		&self,
		status: ReadinessStatus,
		token: Address,
		spender: Address,
		current_allowance: U256,
		amount: U256,
	) -> Vec<OperationStep> {
		if status != ReadinessStatus::InsufficientAllowance {
			return Vec::new();
		}

		let mut steps = Vec::with_capacity(2);
		if self.needs_reset(&token, current_allowance) {
			steps.push(OperationStep::ResetApproval { token, spender });
		}
		steps.push(OperationStep::Approve {
			token,
			spender,
			amount,
		});
		steps
	}
}

impl From<&AllowanceSettings> for AllowancePolicy {
	fn from(settings: &AllowanceSettings) -> Self {
		Self::new(settings.reset_required_tokens.iter().copied())
	}
}
