//! Error types for wallet, relay, index and plan execution

use alloy_primitives::B256;
use thiserror::Error;

/// Errors surfaced by a wallet connection
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WalletError {
	#[error("User rejected the request")]
	Rejected,

	#[error("Transaction {tx_hash} was dropped")]
	Dropped { tx_hash: B256 },

	#[error("Timed out waiting for receipt of {tx_hash} after {timeout_ms}ms")]
	Timeout { tx_hash: B256, timeout_ms: u64 },

	#[error("RPC error {code}: {message}")]
	Rpc { code: i64, message: String },

	#[error("Transport error: {0}")]
	Transport(String),

	#[error("Invalid response: {reason}")]
	InvalidResponse { reason: String },
}

pub type WalletResult<T> = Result<T, WalletError>;

/// Errors surfaced by a multi-owner bundle relay
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RelayError {
	#[error("Bundle rejected by owners: {reason}")]
	Rejected { reason: String },

	#[error("Bundle {bundle_id} failed: {reason}")]
	Failed { bundle_id: String, reason: String },

	#[error("Timed out waiting for bundle {bundle_id} after {timeout_ms}ms")]
	Timeout { bundle_id: String, timeout_ms: u64 },

	#[error("HTTP {status_code}: {reason}")]
	HttpStatus { status_code: u16, reason: String },

	#[error("Transport error: {0}")]
	Transport(String),

	#[error("Invalid response: {reason}")]
	InvalidResponse { reason: String },
}

pub type RelayResult<T> = Result<T, RelayError>;

/// Errors raised while reading the indexer's height
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
	#[error("Index query failed: {reason}")]
	Query { reason: String },

	#[error("Transport error: {0}")]
	Transport(String),

	#[error("Invalid response: {reason}")]
	InvalidResponse { reason: String },
}

pub type IndexResult<T> = Result<T, IndexError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
	#[error("Cannot encode {step}: {reason}")]
	Unsupported { step: String, reason: String },
}

/// Plan-level execution failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
	#[error("User rejected {step}")]
	UserRejected { step: String },

	#[error("{step} failed: {reason}")]
	TransactionFailed {
		step: String,
		tx_hash: Option<B256>,
		reason: String,
	},

	/// The transaction confirmed but the indexer did not catch up in time
	#[error(
		"Index did not reach block {block_number} within {waited_ms}ms (last seen {indexed_block:?})"
	)]
	SyncTimeout {
		tx_hash: B256,
		block_number: u64,
		indexed_block: Option<u64>,
		waited_ms: u64,
	},

	/// The transaction was broadcast but its receipt did not arrive in time
	///
	/// It may still be mined, so this is not a failure.
	#[error("{step} was not confirmed within {timeout_ms}ms")]
	ConfirmationTimeout {
		step: String,
		tx_hash: Option<B256>,
		timeout_ms: u64,
	},

	#[error("Waiting was cancelled")]
	Cancelled,

	#[error("Connected relay cannot batch {steps:?}")]
	NotBatchable { steps: Vec<String> },

	#[error("No bundle relay is configured")]
	RelayUnavailable,

	#[error("Encoding failed: {0}")]
	Encoding(#[from] EncodeError),
}

impl ExecutionError {
	/// The chain state moved even though the action did not finish cleanly
	pub fn state_changed(&self) -> bool {
		matches!(self, ExecutionError::SyncTimeout { .. })
	}

	/// Chain state may have moved, so cached reads can no longer be trusted
	pub fn may_have_landed(&self) -> bool {
		matches!(
			self,
			ExecutionError::SyncTimeout { .. } | ExecutionError::ConfirmationTimeout { .. }
		)
	}
}


pub type ExecutionResult<T> = Result<T, ExecutionError>;
