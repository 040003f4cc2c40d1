//! Fixtures shared by the unit tests in this crate

use alloy_primitives::{address, Address, U256};
use ma_types::{
	AccountState, ActionIntent, ActionParams, LenderRole, MarketAccountSnapshot, MarketState, Token,
};

pub const MARKET: Address = address!("1111111111111111111111111111111111111111");
pub const LENDER: Address = address!("2222222222222222222222222222222222222222");
pub const BORROWER: Address = address!("3333333333333333333333333333333333333333");
pub const CONTROLLER: Address = address!("4444444444444444444444444444444444444444");
/// Deny-listed by default
pub const USDT: Address = address!("dac17f958d2ee523a2206206994597c13d831ec7");
pub const USDC: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");

/// Whole tokens in 6-decimal base units
pub fn units(whole: u64) -> U256 {
	U256::from(whole) * U256::from(1_000_000u64)
}

pub fn market_state(underlying: Address) -> MarketState {
	MarketState {
		address: MARKET,
		name: "Test Market".to_string(),
		borrower: BORROWER,
		controller: CONTROLLER,
		underlying: Token::new(underlying, "USDT", 6),
		is_closed: false,
		max_total_supply: units(1_000_000),
		total_supply: units(10_000),
		minimum_deposit: U256::ZERO,
		outstanding_debt: units(500),
		borrowable_assets: units(2_000),
		liquid_reserves: units(3_000),
		annual_interest_bips: 1_000,
		reserve_ratio_bips: 2_000,
		unpaid_withdrawal_batches: 0,
		fixed_term_end: None,
		allow_early_closure: false,
		deposit_requires_access: false,
		withdrawal_requires_access: false,
	}
}

pub fn snapshot() -> MarketAccountSnapshot {
	MarketAccountSnapshot {
		market: market_state(USDT),
		account: AccountState {
			address: LENDER,
			role: LenderRole::DepositAndWithdraw,
			has_credential: false,
			underlying_balance: units(1_000),
			underlying_approval: units(1_000),
			market_balance: units(500),
			claimable_withdrawals: vec![],
		},
		timestamp: 1_700_000_000,
	}
}

pub fn lender_intent(params: ActionParams) -> ActionIntent {
	ActionIntent::new(MARKET, LENDER, params)
}

pub fn borrower_intent(params: ActionParams) -> ActionIntent {
	ActionIntent::new(MARKET, BORROWER, params)
}
