//! Domain entity mocks for testing

use alloy_primitives::{address, Address, U256};
use market_actions::models::{
	AccountState, ActionIntent, ActionParams, LenderRole, MarketAccountSnapshot, MarketState,
	Token,
};

/// Common test addresses and tokens
pub struct TestConstants;

#[allow(dead_code)]
impl TestConstants {
	pub const MARKET: Address = address!("1111111111111111111111111111111111111111");
	pub const LENDER: Address = address!("2222222222222222222222222222222222222222");
	pub const BORROWER: Address = address!("3333333333333333333333333333333333333333");
	pub const CONTROLLER: Address = address!("4444444444444444444444444444444444444444");
	/// Listed as reset-required in the default settings
	pub const USDT: Address = address!("dac17f958d2ee523a2206206994597c13d831ec7");
	pub const USDC: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
	pub const DECIMALS: u8 = 6;
}

/// Entity builders for tests
#[allow(dead_code)]
pub struct MockEntities;

#[allow(dead_code)]
impl MockEntities {
	/// Whole tokens in 6-decimal base units
	pub fn units(whole: u64) -> U256 {
		U256::from(whole) * U256::from(1_000_000u64)
	}

	pub fn usdt() -> Token {
		Token::new(TestConstants::USDT, "USDT", TestConstants::DECIMALS)
	}

	pub fn usdc() -> Token {
		Token::new(TestConstants::USDC, "USDC", TestConstants::DECIMALS)
	}

	/// Open market over `underlying`, borrowed by [`TestConstants::BORROWER`]
	pub fn market(underlying: Token) -> MarketState {
		MarketState {
			address: TestConstants::MARKET,
			name: "Test Market".to_string(),
			borrower: TestConstants::BORROWER,
			controller: TestConstants::CONTROLLER,
			underlying,
			is_closed: false,
			max_total_supply: Self::units(1_000_000),
			total_supply: Self::units(10_000),
			minimum_deposit: U256::ZERO,
			outstanding_debt: Self::units(500),
			borrowable_assets: Self::units(2_000),
			liquid_reserves: Self::units(3_000),
			annual_interest_bips: 1_000,
			reserve_ratio_bips: 2_000,
			unpaid_withdrawal_batches: 0,
			fixed_term_end: None,
			allow_early_closure: false,
			deposit_requires_access: false,
			withdrawal_requires_access: false,
		}
	}

	/// Lender with 1000 tokens and `approval` whole tokens approved
	pub fn lender_snapshot(underlying: Token, approval: u64) -> MarketAccountSnapshot {
		MarketAccountSnapshot {
			market: Self::market(underlying),
			account: AccountState {
				address: TestConstants::LENDER,
				role: LenderRole::DepositAndWithdraw,
				has_credential: false,
				underlying_balance: Self::units(1_000),
				underlying_approval: Self::units(approval),
				market_balance: Self::units(500),
				claimable_withdrawals: vec![],
			},
			timestamp: 1_700_000_000,
		}
	}

	pub fn borrower_snapshot(underlying: Token, approval: u64) -> MarketAccountSnapshot {
		let mut snapshot = Self::lender_snapshot(underlying, approval);
		snapshot.account.address = TestConstants::BORROWER;
		snapshot.account.role = LenderRole::Null;
		snapshot
	}

	pub fn deposit(amount: &str) -> ActionIntent {
		ActionIntent::new(
			TestConstants::MARKET,
			TestConstants::LENDER,
			ActionParams::Deposit {
				amount: amount.to_string(),
			},
		)
	}

	pub fn repay(amount: &str) -> ActionIntent {
		ActionIntent::new(
			TestConstants::MARKET,
			TestConstants::BORROWER,
			ActionParams::Repay {
				amount: amount.to_string(),
			},
		)
	}
}
