//! Reported market and account state
//!
//! Snapshots are produced by the protocol SDK. Nothing here derives interest,
//! delinquency or batch accounting; the classifier reads these values as-is.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Token;

/// Market configuration and aggregate balances
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketState {
	pub address: Address,
	pub name: String,
	pub borrower: Address,
	/// Controller that owns lender authorization and APR changes
	pub controller: Address,
	pub underlying: Token,
	pub is_closed: bool,
	pub max_total_supply: U256,
	pub total_supply: U256,
	#[serde(default)]
	pub minimum_deposit: U256,
	/// Debt the borrower must settle before the market can close
	pub outstanding_debt: U256,
	pub borrowable_assets: U256,
	/// Underlying assets held by the market
	pub liquid_reserves: U256,
	pub annual_interest_bips: u16,
	pub reserve_ratio_bips: u16,
	#[serde(default)]
	pub unpaid_withdrawal_batches: u32,
	/// Unix seconds at which the fixed term ends, if the market has one
	#[serde(default)]
	pub fixed_term_end: Option<u64>,
	#[serde(default)]
	pub allow_early_closure: bool,
	#[serde(default)]
	pub deposit_requires_access: bool,
	#[serde(default)]
	pub withdrawal_requires_access: bool,
}

impl MarketState {
	pub fn is_borrower(&self, account: &Address) -> bool {
		self.borrower == *account
	}

	/// Whether the fixed term is still running at `now` (unix seconds)
	pub fn in_fixed_term(&self, now: u64) -> bool {
		self.fixed_term_end.is_some_and(|end| now < end)
	}

	/// Remaining deposit capacity
	pub fn remaining_capacity(&self) -> U256 {
		self.max_total_supply.saturating_sub(self.total_supply)
	}
}

/// Lender role as recorded by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LenderRole {
	#[default]
	Null,
	Blocked,
	WithdrawOnly,
	DepositAndWithdraw,
}

/// Withdrawal batch that has matured and can be executed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimableWithdrawal {
	pub expiry: u32,
	pub available: U256,
}

/// The connected account's view of one market
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountState {
	pub address: Address,
	#[serde(default)]
	pub role: LenderRole,
	/// Holds the credential required by the market's access hooks
	#[serde(default)]
	pub has_credential: bool,
	pub underlying_balance: U256,
	/// Current allowance granted to the market for the underlying token
	pub underlying_approval: U256,
	/// Market-token balance
	#[serde(default)]
	pub market_balance: U256,
	#[serde(default)]
	pub claimable_withdrawals: Vec<ClaimableWithdrawal>,
}

impl AccountState {
	/// Expiries of the batches with something left to claim
	pub fn claimable_expiries(&self) -> Vec<u32> {
		self.claimable_withdrawals
			.iter()
			.filter(|w| !w.available.is_zero())
			.map(|w| w.expiry)
			.collect()
	}
}

/// Market + account state observed at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketAccountSnapshot {
	pub market: MarketState,
	pub account: AccountState,
	/// Unix seconds of the observation
	pub timestamp: u64,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
	#[error("Market not found: {market}")]
	MarketNotFound { market: Address },

	#[error("State provider unavailable: {reason}")]
	Unavailable { reason: String },
}

pub type StateResult<T> = Result<T, StateError>;

/// Source of market/account snapshots (the protocol SDK)
#[async_trait]
pub trait StateProvider: Send + Sync {
	async fn snapshot(&self, market: Address, account: Address)
		-> StateResult<MarketAccountSnapshot>;
}
