//! User action intents
//!
//! An intent is created for every submission, consumed immediately by the
//! classifier and composer, and never persisted.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::status::ReadinessStatus;

/// Every action a borrower or lender can initiate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
	Deposit,
	/// Queue a withdrawal into the current withdrawal batch
	Withdraw,
	/// Execute matured withdrawals
	Claim,
	Repay,
	/// Repay and process unpaid withdrawal batches in one call
	ProcessUnpaidBatch,
	Borrow,
	AdjustApr,
	SetMaxSupply,
	CloseMarket,
	AuthorizeLenders,
	DeauthorizeLenders,
	ResetReserveRatio,
}

impl ActionKind {
	pub const ALL: [ActionKind; 12] = [
		ActionKind::Deposit,
		ActionKind::Withdraw,
		ActionKind::Claim,
		ActionKind::Repay,
		ActionKind::ProcessUnpaidBatch,
		ActionKind::Borrow,
		ActionKind::AdjustApr,
		ActionKind::SetMaxSupply,
		ActionKind::CloseMarket,
		ActionKind::AuthorizeLenders,
		ActionKind::DeauthorizeLenders,
		ActionKind::ResetReserveRatio,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			ActionKind::Deposit => "deposit",
			ActionKind::Withdraw => "withdraw",
			ActionKind::Claim => "claim",
			ActionKind::Repay => "repay",
			ActionKind::ProcessUnpaidBatch => "processUnpaidBatch",
			ActionKind::Borrow => "borrow",
			ActionKind::AdjustApr => "adjustApr",
			ActionKind::SetMaxSupply => "setMaxSupply",
			ActionKind::CloseMarket => "closeMarket",
			ActionKind::AuthorizeLenders => "authorizeLenders",
			ActionKind::DeauthorizeLenders => "deauthorizeLenders",
			ActionKind::ResetReserveRatio => "resetReserveRatio",
		}
	}

	/// Whether the action moves underlying tokens from the caller into the market
	/// and may therefore need an ERC-20 approval first
	pub fn pulls_underlying(&self) -> bool {
		matches!(
			self,
			ActionKind::Deposit
				| ActionKind::Repay
				| ActionKind::ProcessUnpaidBatch
				| ActionKind::CloseMarket
		)
	}

	/// Statuses the classifier may return for this kind
	pub fn allowed_statuses(&self) -> &'static [ReadinessStatus] {
		use ReadinessStatus::*;
		match self {
			ActionKind::Deposit => &[
				Ready,
				MarketClosed,
				Blocked,
				InsufficientRole,
				RequiresAccess,
				BelowMinimumDeposit,
				ExceedsMaximumDeposit,
				InsufficientBalance,
				InsufficientAllowance,
			],
			ActionKind::Withdraw => &[
				Ready,
				InsufficientRole,
				RequiresAccess,
				MarketInClosedTerm,
				InsufficientBalance,
			],
			ActionKind::Claim => &[Ready],
			ActionKind::Repay => &[
				Ready,
				MarketClosed,
				ExceedsOutstandingDebt,
				InsufficientBalance,
				InsufficientAllowance,
			],
			ActionKind::ProcessUnpaidBatch => &[
				Ready,
				NotBorrower,
				InsufficientBalance,
				InsufficientAllowance,
			],
			ActionKind::Borrow => &[Ready, NotBorrower, MarketClosed, InsufficientReserves],
			ActionKind::AdjustApr => &[
				Ready,
				NotBorrower,
				InvalidApr,
				DecreaseDuringFixedTerm,
				InsufficientReserves,
			],
			ActionKind::SetMaxSupply => &[Ready, NotBorrower, MarketClosed],
			ActionKind::CloseMarket => &[
				Ready,
				NotBorrower,
				MarketClosed,
				UnpaidWithdrawalBatches,
				EarlyClosureNotAllowed,
				InsufficientBalance,
				InsufficientAllowance,
			],
			ActionKind::AuthorizeLenders
			| ActionKind::DeauthorizeLenders
			| ActionKind::ResetReserveRatio => &[Ready, NotBorrower],
		}
	}
}

impl fmt::Display for ActionKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Kind-specific parameters, as entered by the user
///
/// Amounts stay decimal strings until the token's decimals are known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ActionParams {
	Deposit {
		amount: String,
	},
	Withdraw {
		amount: String,
	},
	Claim,
	Repay {
		amount: String,
	},
	ProcessUnpaidBatch {
		amount: String,
		#[serde(rename = "maxBatches")]
		max_batches: u32,
	},
	Borrow {
		amount: String,
	},
	/// New annual rate in percent ("12.5" for 12.5 %)
	AdjustApr {
		apr: String,
	},
	SetMaxSupply {
		amount: String,
	},
	CloseMarket,
	AuthorizeLenders {
		lenders: Vec<Address>,
	},
	DeauthorizeLenders {
		lenders: Vec<Address>,
	},
	ResetReserveRatio,
}

impl ActionParams {
	pub fn kind(&self) -> ActionKind {
		match self {
			ActionParams::Deposit { .. } => ActionKind::Deposit,
			ActionParams::Withdraw { .. } => ActionKind::Withdraw,
			ActionParams::Claim => ActionKind::Claim,
			ActionParams::Repay { .. } => ActionKind::Repay,
			ActionParams::ProcessUnpaidBatch { .. } => ActionKind::ProcessUnpaidBatch,
			ActionParams::Borrow { .. } => ActionKind::Borrow,
			ActionParams::AdjustApr { .. } => ActionKind::AdjustApr,
			ActionParams::SetMaxSupply { .. } => ActionKind::SetMaxSupply,
			ActionParams::CloseMarket => ActionKind::CloseMarket,
			ActionParams::AuthorizeLenders { .. } => ActionKind::AuthorizeLenders,
			ActionParams::DeauthorizeLenders { .. } => ActionKind::DeauthorizeLenders,
			ActionParams::ResetReserveRatio => ActionKind::ResetReserveRatio,
		}
	}

	/// The entered token amount, for kinds that carry one
	pub fn token_amount_input(&self) -> Option<&str> {
		match self {
			ActionParams::Deposit { amount }
			| ActionParams::Withdraw { amount }
			| ActionParams::Repay { amount }
			| ActionParams::ProcessUnpaidBatch { amount, .. }
			| ActionParams::Borrow { amount }
			| ActionParams::SetMaxSupply { amount } => Some(amount),
			_ => None,
		}
	}
}

/// One user submission against one market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionIntent {
	pub market: Address,
	/// Connected wallet address
	pub account: Address,
	#[serde(flatten)]
	pub params: ActionParams,
}

impl ActionIntent {
	pub fn new(market: Address, account: Address, params: ActionParams) -> Self {
		Self {
			market,
			account,
			params,
		}
	}

	pub fn kind(&self) -> ActionKind {
		self.params.kind()
	}
}
