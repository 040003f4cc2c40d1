//! Readiness statuses and their user-facing explanations

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::actions::ActionKind;

/// Outcome of classifying an intent against the current market/account state
///
/// Exactly one status holds at classification time and only `Ready` permits
/// execution. `InsufficientAllowance` is resolved by prepending an approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReadinessStatus {
	Ready,
	InsufficientBalance,
	InsufficientAllowance,
	InsufficientRole,
	ExceedsMaximumDeposit,
	BelowMinimumDeposit,
	MarketClosed,
	Blocked,
	RequiresAccess,
	MarketInClosedTerm,
	ExceedsOutstandingDebt,
	NotBorrower,
	UnpaidWithdrawalBatches,
	EarlyClosureNotAllowed,
	InvalidApr,
	InsufficientReserves,
	DecreaseDuringFixedTerm,
}

impl ReadinessStatus {
	pub fn is_ready(&self) -> bool {
		matches!(self, ReadinessStatus::Ready)
	}

	/// Statuses that do not block composition
	pub fn is_actionable(&self) -> bool {
		matches!(
			self,
			ReadinessStatus::Ready | ReadinessStatus::InsufficientAllowance
		)
	}

	/// Fixed explanation shown next to the disabled action
	pub fn message(&self, kind: ActionKind) -> Option<&'static str> {
		status_message(kind, *self)
	}
}

impl fmt::Display for ReadinessStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(self, f)
	}
}

const UNDERLYING_BALANCE_LOW: &str = "You don't have enough of the underlying token in your wallet";
const MARKET_CLOSED: &str = "Market is closed";
const DEPOSIT_RESTRICTED: &str =
	"Lender restricted to withdrawing existing debt, no further deposits";

/// Status → message table, per action kind
///
/// `Ready` and `InsufficientAllowance` never carry a message.
pub fn status_message(kind: ActionKind, status: ReadinessStatus) -> Option<&'static str> {
	use ActionKind as K;
	use ReadinessStatus as S;

	let message = match (kind, status) {
		(_, S::Ready) | (_, S::InsufficientAllowance) => return None,

		(K::Deposit, S::InsufficientRole) | (K::Deposit, S::Blocked) => DEPOSIT_RESTRICTED,
		(K::Deposit, S::ExceedsMaximumDeposit) => {
			"You're attempting to deposit more than the maximum capacity"
		},
		(K::Deposit, S::InsufficientBalance) => UNDERLYING_BALANCE_LOW,
		(K::Deposit, S::BelowMinimumDeposit) => "Your deposit is below the minimum for this market",
		(K::Deposit, S::MarketClosed) => MARKET_CLOSED,
		(K::Deposit, S::RequiresAccess) => "Lender lacks the necessary credentials to deposit",

		(K::Withdraw, S::InsufficientRole) => "You can not withdraw funds from this market",
		(K::Withdraw, S::InsufficientBalance) => {
			"You don't have enough of the market token in your wallet"
		},
		(K::Withdraw, S::MarketInClosedTerm) => "Market is in closed term",
		(K::Withdraw, S::RequiresAccess) => "Lender lacks the necessary credentials to withdraw",

		(K::Repay, S::InsufficientBalance) => UNDERLYING_BALANCE_LOW,
		(K::Repay, S::ExceedsOutstandingDebt) => "You're attempting to repay more than you owe",
		(K::Repay, S::MarketClosed) => MARKET_CLOSED,

		(K::CloseMarket, S::NotBorrower) => "Address attempting to close market is not the borrower",
		(K::CloseMarket, S::UnpaidWithdrawalBatches) => "There are unpaid withdrawal batches",
		(K::CloseMarket, S::InsufficientBalance) => {
			"Your wallet's balance of the underlying token is insufficient"
		},
		(K::CloseMarket, S::EarlyClosureNotAllowed) => "Market can not be closed before maturity",
		(K::CloseMarket, S::MarketClosed) => MARKET_CLOSED,

		(K::AdjustApr, S::NotBorrower) => "Address attempting to adjust APR is not the borrower",
		(K::AdjustApr, S::InvalidApr) => "APR must be between 0% and 100%",
		(K::AdjustApr, S::InsufficientReserves) => {
			"Liquid reserves of the market insufficient for increased reserve ratio"
		},
		(K::AdjustApr, S::DecreaseDuringFixedTerm) => {
			"Market is in fixed term, APR can only be increased"
		},

		(K::Borrow, S::NotBorrower) => "Address attempting to borrow is not the borrower",
		(K::Borrow, S::MarketClosed) => MARKET_CLOSED,
		(K::Borrow, S::InsufficientReserves) => {
			"You're attempting to borrow more than the market's borrowable assets"
		},

		(K::ProcessUnpaidBatch, S::NotBorrower) => {
			"Address attempting to process withdrawal batches is not the borrower"
		},
		(K::ProcessUnpaidBatch, S::InsufficientBalance) => UNDERLYING_BALANCE_LOW,

		(K::SetMaxSupply, S::NotBorrower) => {
			"Address attempting to set maximum capacity is not the borrower"
		},
		(K::SetMaxSupply, S::MarketClosed) => MARKET_CLOSED,

		(K::AuthorizeLenders, S::NotBorrower) | (K::DeauthorizeLenders, S::NotBorrower) => {
			"Address attempting to update lender authorization is not the borrower"
		},
		(K::ResetReserveRatio, S::NotBorrower) => {
			"Address attempting to reset the reserve ratio is not the borrower"
		},

		_ => return None,
	};

	Some(message)
}
