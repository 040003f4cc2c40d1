//! ABI encoding of operation steps

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};
use ma_types::{CallEncoder, EncodeError, OperationStep, PreparedTransaction};

sol! {
	interface IERC20 {
		function approve(address spender, uint256 amount) external returns (bool);
	}

	interface IMarket {
		function deposit(uint256 amount) external;
		function queueWithdrawal(uint256 amount) external;
		function executeWithdrawals(address[] accountAddresses, uint32[] expiries) external returns (uint256[]);
		function repay(uint256 amount) external;
		function repayAndProcessUnpaidWithdrawalBatches(uint256 repayAmount, uint256 maxBatches) external;
		function borrow(uint256 amount) external;
		function setMaxTotalSupply(uint256 newMaxTotalSupply) external;
		function closeMarket() external;
	}

	interface IMarketController {
		function setAnnualInterestBips(address market, uint16 annualInterestBips) external;
		function authorizeLendersAndUpdateMarkets(address[] lenders, address[] markets) external;
		function deauthorizeLendersAndUpdateMarkets(address[] lenders, address[] markets) external;
		function resetReserveRatio(address market) external;
	}
}

/// Encodes steps against the market, controller and ERC-20 ABIs
#[derive(Debug, Clone, Copy, Default)]
pub struct SolCallEncoder;

impl SolCallEncoder {
	pub fn new() -> Self {
		Self
	}
}

fn call<C: SolCall>(to: Address, call: C, step: &OperationStep) -> PreparedTransaction {
	PreparedTransaction {
		to,
		data: Bytes::from(call.abi_encode()),
		value: U256::ZERO,
		label: step.name().to_string(),
	}
}

impl CallEncoder for SolCallEncoder {
	fn encode(&self, step: &OperationStep) -> Result<PreparedTransaction, EncodeError> {
		let tx = match step {
			OperationStep::ResetApproval { token, spender } => call(
				*token,
				IERC20::approveCall {
					spender: *spender,
					amount: U256::ZERO,
				},
				step,
			),
			OperationStep::Approve {
				token,
				spender,
				amount,
			} => call(
				*token,
				IERC20::approveCall {
					spender: *spender,
					amount: *amount,
				},
				step,
			),
			OperationStep::Deposit { market, amount } => {
				call(*market, IMarket::depositCall { amount: *amount }, step)
			},
			OperationStep::QueueWithdrawal { market, amount } => {
				call(*market, IMarket::queueWithdrawalCall { amount: *amount }, step)
			},
			OperationStep::Claim {
				market,
				lender,
				expiries,
			} => {
				if expiries.is_empty() {
					return Err(EncodeError::Unsupported {
						step: step.name().to_string(),
						reason: "no expiries to execute".to_string(),
					});
				}
				call(
					*market,
					IMarket::executeWithdrawalsCall {
						accountAddresses: vec![*lender; expiries.len()],
						expiries: expiries.clone(),
					},
					step,
				)
			},
			OperationStep::Repay { market, amount } => {
				call(*market, IMarket::repayCall { amount: *amount }, step)
			},
			OperationStep::RepayAndProcessUnpaidBatches {
				market,
				amount,
				max_batches,
			} => call(
				*market,
				IMarket::repayAndProcessUnpaidWithdrawalBatchesCall {
					repayAmount: *amount,
					maxBatches: U256::from(*max_batches),
				},
				step,
			),
			OperationStep::Borrow { market, amount } => {
				call(*market, IMarket::borrowCall { amount: *amount }, step)
			},
			OperationStep::SetApr {
				controller,
				market,
				bips,
			} => call(
				*controller,
				IMarketController::setAnnualInterestBipsCall {
					market: *market,
					annualInterestBips: *bips,
				},
				step,
			),
			OperationStep::SetMaxSupply { market, amount } => call(
				*market,
				IMarket::setMaxTotalSupplyCall {
					newMaxTotalSupply: *amount,
				},
				step,
			),
			OperationStep::CloseMarket { market } => {
				call(*market, IMarket::closeMarketCall {}, step)
			},
			OperationStep::AuthorizeLenders {
				controller,
				lenders,
				markets,
			} => call(
				*controller,
				IMarketController::authorizeLendersAndUpdateMarketsCall {
					lenders: lenders.clone(),
					markets: markets.clone(),
				},
				step,
			),
			OperationStep::DeauthorizeLenders {
				controller,
				lenders,
				markets,
			} => call(
				*controller,
				IMarketController::deauthorizeLendersAndUpdateMarketsCall {
					lenders: lenders.clone(),
					markets: markets.clone(),
				},
				step,
			),
			OperationStep::ResetReserveRatio { controller, market } => call(
				*controller,
				IMarketController::resetReserveRatioCall { market: *market },
				step,
			),
		};
		Ok(tx)
	}
}
