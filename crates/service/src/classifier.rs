//! Readiness classification
//!
//! Maps an intent and a reported snapshot to exactly one [`ReadinessStatus`].
//! Rules are checked in a fixed order per action kind and the first failing
//! rule wins. Nothing here performs I/O.

use alloy_primitives::utils::{ParseUnits, Unit};
use alloy_primitives::U256;
use ma_types::{
	fraction_digits, ActionIntent, ActionKind, ActionParams, AmountError, LenderRole,
	MarketAccountSnapshot, MarketState, ReadinessStatus, TokenAmount,
};
use serde::{Deserialize, Serialize};

/// 100% APR in basis points
pub const MAX_APR_BIPS: u16 = 10_000;

/// Reserve ratio a market moves to after a large APR decrease
pub const APR_DECREASE_RESERVE_RATIO_BIPS: u16 = 9_000;

/// A decrease below this share of the current APR (in bips of the current
/// APR) raises the reserve ratio
pub const APR_DECREASE_THRESHOLD_BIPS: u64 = 7_500;

const BIPS: u64 = 10_000;

/// Outcome of previewing an APR change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AprPreview {
	pub status: ReadinessStatus,
	/// Parsed APR, when the input was valid
	pub apr_bips: Option<u16>,
	/// Reserve ratio the market would have after the change
	pub reserve_ratio_bips: u16,
}

/// Parse a user-entered amount for kinds that carry one
///
/// Returns `Ok(None)` for kinds without a token amount.
pub fn resolve_amount(
	intent: &ActionIntent,
	market: &MarketState,
) -> Result<Option<TokenAmount>, AmountError> {
	intent
		.params
		.token_amount_input()
		.map(|input| market.underlying.parse_amount(input))
		.transpose()
}

/// Parse an APR given in percent ("12.5") into basis points
///
/// Returns `None` for malformed, negative or out-of-range input, and for
/// precision finer than one basis point.
pub fn parse_apr_bips(input: &str) -> Option<u16> {
	let unit = Unit::new(2)?;
	let input = input.trim();
	if fraction_digits(input) > 2 {
		return None;
	}
	let parsed = ParseUnits::parse_units(input, unit).ok()?;
	if parsed.is_negative() {
		return None;
	}
	let bips = parsed.get_absolute();
	if bips > U256::from(MAX_APR_BIPS) {
		return None;
	}
	Some(bips.to::<u16>())
}

/// Classify one intent against a snapshot
///
/// `amount` is the parsed token amount for kinds that carry one; a missing
/// amount is treated as zero.
pub fn classify(
	intent: &ActionIntent,
	snapshot: &MarketAccountSnapshot,
	amount: Option<&TokenAmount>,
) -> ReadinessStatus {
	let raw = amount.map(|a| a.raw).unwrap_or(U256::ZERO);
	let status = match &intent.params {
		ActionParams::Deposit { .. } => check_deposit(snapshot, raw),
		ActionParams::Withdraw { .. } => check_withdraw(snapshot, raw),
		ActionParams::Claim => ReadinessStatus::Ready,
		ActionParams::Repay { .. } => check_repay(snapshot, raw),
		ActionParams::ProcessUnpaidBatch { .. } => check_process_unpaid_batch(intent, snapshot, raw),
		ActionParams::Borrow { .. } => check_borrow(intent, snapshot, raw),
		ActionParams::AdjustApr { apr } => preview_apr(intent, snapshot, apr).status,
		ActionParams::SetMaxSupply { .. } => check_set_max_supply(intent, snapshot),
		ActionParams::CloseMarket => check_close_market(intent, snapshot),
		ActionParams::AuthorizeLenders { .. }
		| ActionParams::DeauthorizeLenders { .. }
		| ActionParams::ResetReserveRatio => check_borrower(intent, &snapshot.market),
	};

	debug_assert!(
		intent.kind().allowed_statuses().contains(&status),
		"{} returned {}",
		intent.kind(),
		status
	);
	status
}

/// Status and resulting reserve ratio for an APR change
pub fn preview_apr(
	intent: &ActionIntent,
	snapshot: &MarketAccountSnapshot,
	apr_percent: &str,
) -> AprPreview {
	let market = &snapshot.market;
	let mut preview = AprPreview {
		status: ReadinessStatus::Ready,
		apr_bips: None,
		reserve_ratio_bips: market.reserve_ratio_bips,
	};

	if !market.is_borrower(&intent.account) {
		preview.status = ReadinessStatus::NotBorrower;
		return preview;
	}

	let Some(new_bips) = parse_apr_bips(apr_percent) else {
		preview.status = ReadinessStatus::InvalidApr;
		return preview;
	};
	preview.apr_bips = Some(new_bips);

	let current = market.annual_interest_bips;
	if new_bips < current && market.in_fixed_term(snapshot.timestamp) {
		preview.status = ReadinessStatus::DecreaseDuringFixedTerm;
		return preview;
	}

	preview.reserve_ratio_bips = reserve_ratio_after_apr_change(market, new_bips);
	let required = market
		.total_supply
		.saturating_mul(U256::from(preview.reserve_ratio_bips))
		/ U256::from(BIPS);
	if preview.reserve_ratio_bips > market.reserve_ratio_bips && market.liquid_reserves < required {
		preview.status = ReadinessStatus::InsufficientReserves;
	}
	preview
}

/// Reserve ratio after moving the APR to `new_bips`
///
/// A decrease of more than 25% temporarily raises the ratio to 90%.
pub fn reserve_ratio_after_apr_change(market: &MarketState, new_bips: u16) -> u16 {
	let threshold = u64::from(market.annual_interest_bips) * APR_DECREASE_THRESHOLD_BIPS / BIPS;
	if u64::from(new_bips) < threshold {
		market.reserve_ratio_bips.max(APR_DECREASE_RESERVE_RATIO_BIPS)
	} else {
		market.reserve_ratio_bips
	}
}

fn check_borrower(intent: &ActionIntent, market: &MarketState) -> ReadinessStatus {
	if market.is_borrower(&intent.account) {
		ReadinessStatus::Ready
	} else {
		ReadinessStatus::NotBorrower
	}
}

fn check_deposit(snapshot: &MarketAccountSnapshot, amount: U256) -> ReadinessStatus {
	let market = &snapshot.market;
	let account = &snapshot.account;

	if market.is_closed {
		return ReadinessStatus::MarketClosed;
	}
	match account.role {
		LenderRole::Blocked => return ReadinessStatus::Blocked,
		LenderRole::WithdrawOnly => return ReadinessStatus::InsufficientRole,
		LenderRole::Null if !market.deposit_requires_access => {
			return ReadinessStatus::InsufficientRole
		},
		LenderRole::Null if !account.has_credential => return ReadinessStatus::RequiresAccess,
		_ => {},
	}
	if amount < market.minimum_deposit {
		return ReadinessStatus::BelowMinimumDeposit;
	}
	if amount > market.remaining_capacity() {
		return ReadinessStatus::ExceedsMaximumDeposit;
	}
	if amount > account.underlying_balance {
		return ReadinessStatus::InsufficientBalance;
	}
	if amount > account.underlying_approval {
		return ReadinessStatus::InsufficientAllowance;
	}
	ReadinessStatus::Ready
}

fn check_withdraw(snapshot: &MarketAccountSnapshot, amount: U256) -> ReadinessStatus {
	let market = &snapshot.market;
	let account = &snapshot.account;

	if account.role == LenderRole::Null && account.market_balance.is_zero() {
		return ReadinessStatus::InsufficientRole;
	}
	if market.withdrawal_requires_access
		&& account.role == LenderRole::Null
		&& !account.has_credential
	{
		return ReadinessStatus::RequiresAccess;
	}
	if !market.is_closed && market.in_fixed_term(snapshot.timestamp) {
		return ReadinessStatus::MarketInClosedTerm;
	}
	if amount > account.market_balance {
		return ReadinessStatus::InsufficientBalance;
	}
	ReadinessStatus::Ready
}

fn check_repay(snapshot: &MarketAccountSnapshot, amount: U256) -> ReadinessStatus {
	let market = &snapshot.market;
	let account = &snapshot.account;

	if market.is_closed {
		return ReadinessStatus::MarketClosed;
	}
	if amount > market.outstanding_debt {
		return ReadinessStatus::ExceedsOutstandingDebt;
	}
	pull_check(amount, account.underlying_balance, account.underlying_approval)
}

fn check_process_unpaid_batch(
	intent: &ActionIntent,
	snapshot: &MarketAccountSnapshot,
	amount: U256,
) -> ReadinessStatus {
	if !snapshot.market.is_borrower(&intent.account) {
		return ReadinessStatus::NotBorrower;
	}
	let account = &snapshot.account;
	pull_check(amount, account.underlying_balance, account.underlying_approval)
}

fn check_borrow(
	intent: &ActionIntent,
	snapshot: &MarketAccountSnapshot,
	amount: U256,
) -> ReadinessStatus {
	let market = &snapshot.market;
	if !market.is_borrower(&intent.account) {
		return ReadinessStatus::NotBorrower;
	}
	if market.is_closed {
		return ReadinessStatus::MarketClosed;
	}
	if amount > market.borrowable_assets {
		return ReadinessStatus::InsufficientReserves;
	}
	ReadinessStatus::Ready
}

fn check_set_max_supply(intent: &ActionIntent, snapshot: &MarketAccountSnapshot) -> ReadinessStatus {
	let market = &snapshot.market;
	if !market.is_borrower(&intent.account) {
		return ReadinessStatus::NotBorrower;
	}
	if market.is_closed {
		return ReadinessStatus::MarketClosed;
	}
	ReadinessStatus::Ready
}

fn check_close_market(intent: &ActionIntent, snapshot: &MarketAccountSnapshot) -> ReadinessStatus {
	let market = &snapshot.market;
	let account = &snapshot.account;

	if !market.is_borrower(&intent.account) {
		return ReadinessStatus::NotBorrower;
	}
	if market.is_closed {
		return ReadinessStatus::MarketClosed;
	}
	if market.unpaid_withdrawal_batches > 0 {
		return ReadinessStatus::UnpaidWithdrawalBatches;
	}
	if market.in_fixed_term(snapshot.timestamp) && !market.allow_early_closure {
		return ReadinessStatus::EarlyClosureNotAllowed;
	}
	pull_check(
		market.outstanding_debt,
		account.underlying_balance,
		account.underlying_approval,
	)
}

/// Balance before allowance for actions that pull underlying tokens
fn pull_check(amount: U256, balance: U256, allowance: U256) -> ReadinessStatus {
	if amount > balance {
		ReadinessStatus::InsufficientBalance
	} else if amount > allowance {
		ReadinessStatus::InsufficientAllowance
	} else {
		ReadinessStatus::Ready
	}
}

/// Kinds whose status depends on a user-entered token amount
pub fn requires_amount(kind: ActionKind) -> bool {
	matches!(
		kind,
		ActionKind::Deposit
			| ActionKind::Withdraw
			| ActionKind::Repay
			| ActionKind::ProcessUnpaidBatch
			| ActionKind::Borrow
			| ActionKind::SetMaxSupply
	)
}
