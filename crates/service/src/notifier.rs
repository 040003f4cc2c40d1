//! Notification templates and the default tracing sink

use ma_types::{ActionKind, Notice, NoticeStage, Notifier, TokenAmount};
use tracing::{info, warn};

const TRACING_TARGET: &str = "ma_service::notifier";

pub const SYNC_TIMEOUT_MESSAGE: &str = "Transaction confirmed, market data is still syncing";

pub const CONFIRMATION_TIMEOUT_MESSAGE: &str =
	"Transaction submitted, confirmation is taking longer than expected";

/// Fixed messages for one action
///
/// `amount` is the entered amount for kinds that carry one; `market_name` is
/// only used by failure messages that name the market.
#[derive(Debug, Clone, Copy)]
pub struct ActionMessages<'a> {
	kind: ActionKind,
	amount: Option<&'a TokenAmount>,
	market_name: &'a str,
}

impl<'a> ActionMessages<'a> {
	pub fn new(kind: ActionKind, amount: Option<&'a TokenAmount>, market_name: &'a str) -> Self {
		Self {
			kind,
			amount,
			market_name,
		}
	}

	fn amount(&self) -> String {
		self.amount.map(ToString::to_string).unwrap_or_default()
	}

	pub fn pending(&self) -> String {
		match self.kind {
			ActionKind::Deposit => format!("Depositing {}...", self.amount()),
			ActionKind::Withdraw => format!("Adding {} to withdrawal queue", self.amount()),
			ActionKind::Claim => "Executing Claim...".to_string(),
			ActionKind::Repay => format!("{} Repayment In Progress...", self.amount()),
			ActionKind::ProcessUnpaidBatch => "Closing unpaid withdrawal batch...".to_string(),
			ActionKind::Borrow => format!("Borrowing {}...", self.amount()),
			ActionKind::AdjustApr => "Adjusting Lender APR...".to_string(),
			ActionKind::SetMaxSupply => "Setting Maximum Capacity...".to_string(),
			ActionKind::CloseMarket => "Terminating Market...".to_string(),
			ActionKind::AuthorizeLenders => "Authorising Lenders...".to_string(),
			ActionKind::DeauthorizeLenders => "Removing Lenders...".to_string(),
			ActionKind::ResetReserveRatio => "Resetting Reserve Ratio...".to_string(),
		}
	}

	pub fn success(&self) -> String {
		match self.kind {
			ActionKind::Deposit => format!("Successfully Deposited {}!", self.amount()),
			ActionKind::Withdraw => {
				format!("{} successfully added to withdrawal queue", self.amount())
			},
			ActionKind::Claim => "Claim Successful!".to_string(),
			ActionKind::Repay => format!("Successfully Repaid {}!", self.amount()),
			ActionKind::ProcessUnpaidBatch => "Successfully closed batch!".to_string(),
			ActionKind::Borrow => format!("Borrowed {}!", self.amount()),
			ActionKind::AdjustApr => "Lender APR Successfully Adjusted".to_string(),
			ActionKind::SetMaxSupply => "Maximum Capacity successfully Adjusted".to_string(),
			ActionKind::CloseMarket => "Successfully Terminated Market!".to_string(),
			ActionKind::AuthorizeLenders => "Lenders Successfully Authorised!".to_string(),
			ActionKind::DeauthorizeLenders => "Lenders successfully removed!".to_string(),
			ActionKind::ResetReserveRatio => "Reserve Ratio successfully reset!".to_string(),
		}
	}

	pub fn failure(&self) -> String {
		match self.kind {
			ActionKind::Deposit => "Error: Deposit Failed".to_string(),
			ActionKind::Withdraw => "Error adding to withdrawal queue".to_string(),
			ActionKind::Claim => "Error: Claim Execution Failed".to_string(),
			ActionKind::Repay => "Error: Repayment Attempt Failed".to_string(),
			ActionKind::ProcessUnpaidBatch => {
				format!("Error: Closing withdrawal batch for {} failed", self.market_name)
			},
			ActionKind::Borrow => "Error: Borrow Failed".to_string(),
			ActionKind::AdjustApr => "Error adjusting Lender APR".to_string(),
			ActionKind::SetMaxSupply => "Error setting Maximum Capacity".to_string(),
			ActionKind::CloseMarket => "Error Terminating Market".to_string(),
			ActionKind::AuthorizeLenders => "Error authorising lenders".to_string(),
			ActionKind::DeauthorizeLenders => "Error removing lenders".to_string(),
			ActionKind::ResetReserveRatio => "Error resetting reserve ratio".to_string(),
		}
	}
}

/// Messages for a standalone approval plan
#[derive(Debug, Clone, Copy)]
pub struct ApprovalMessages<'a> {
	amount: &'a TokenAmount,
	resets_first: bool,
}

impl<'a> ApprovalMessages<'a> {
	pub fn new(amount: &'a TokenAmount, resets_first: bool) -> Self {
		Self {
			amount,
			resets_first,
		}
	}

	pub fn pending(&self) -> String {
		if self.resets_first {
			format!(
				"Step 1/2: Resetting allowance for {}...",
				self.amount.token.symbol
			)
		} else {
			format!("Approving {}...", self.amount)
		}
	}

	pub fn success(&self) -> String {
		format!("Successfully Approved {}!", self.amount)
	}

	/// `failed_step` is the name of the step that failed
	pub fn failure(&self, failed_step: &str) -> String {
		if failed_step == "reset-approve" {
			format!("Error: Reset allowance for {} failed", self.amount.token.symbol)
		} else {
			format!("Error: {} Approval Failed", self.amount.token.symbol)
		}
	}
}

/// Writes notices to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
	fn notify(&self, notice: Notice) {
		match notice.stage {
			NoticeStage::Failure | NoticeStage::SyncTimeout | NoticeStage::ConfirmationTimeout => warn!(
				target: TRACING_TARGET,
				action = %notice.action,
				stage = ?notice.stage,
				"{}",
				notice.message
			),
			NoticeStage::Pending | NoticeStage::Success => info!(
				target: TRACING_TARGET,
				action = %notice.action,
				stage = ?notice.stage,
				"{}",
				notice.message
			),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::USDT;
	use ma_types::Token;
	use pretty_assertions::assert_eq;

	fn usdt(amount: &str) -> TokenAmount {
		Token::new(USDT, "USDT", 6).parse_amount(amount).unwrap()
	}

	#[test]
	fn test_amount_templates() {
		let amount = usdt("100");
		let messages = ActionMessages::new(ActionKind::Deposit, Some(&amount), "Test Market");
		assert_eq!(messages.pending(), "Depositing 100 USDT...");
		assert_eq!(messages.success(), "Successfully Deposited 100 USDT!");
		assert_eq!(messages.failure(), "Error: Deposit Failed");

		let amount = usdt("12.5");
		let messages = ActionMessages::new(ActionKind::Repay, Some(&amount), "Test Market");
		assert_eq!(messages.pending(), "12.5 USDT Repayment In Progress...");
		assert_eq!(messages.failure(), "Error: Repayment Attempt Failed");
	}

	#[test]
	fn test_batch_failure_names_market() {
		let messages = ActionMessages::new(ActionKind::ProcessUnpaidBatch, None, "Blue Market");
		assert_eq!(
			messages.failure(),
			"Error: Closing withdrawal batch for Blue Market failed"
		);
	}

	#[test]
	fn test_approval_templates() {
		let amount = usdt("100");
		let with_reset = ApprovalMessages::new(&amount, true);
		assert_eq!(
			with_reset.pending(),
			"Step 1/2: Resetting allowance for USDT..."
		);
		assert_eq!(
			with_reset.failure("reset-approve"),
			"Error: Reset allowance for USDT failed"
		);
		assert_eq!(with_reset.failure("approve"), "Error: USDT Approval Failed");

		let plain = ApprovalMessages::new(&amount, false);
		assert_eq!(plain.pending(), "Approving 100 USDT...");
		assert_eq!(plain.success(), "Successfully Approved 100 USDT!");
	}
}
