//! Execution collaborators and outcomes

pub mod errors;
pub mod traits;

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

pub use errors::{
	EncodeError, ExecutionError, ExecutionResult, IndexError, IndexResult, RelayError,
	RelayResult, WalletError, WalletResult,
};
pub use traits::{BatchRelay, CallEncoder, IndexClient, WalletClient};

/// Confirmation of a transaction or bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
	pub transaction_hash: B256,
	pub block_number: u64,
	pub success: bool,
	#[serde(default)]
	pub gas_used: u64,
}

/// Identifier the relay assigns to a proposed bundle
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleSubmission {
	pub bundle_id: String,
}

/// Result of a plan run through confirmation and index sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
	/// Receipt of the terminal step or bundle
	pub receipt: Receipt,
	/// Receipts of every confirmed submission, in order
	pub receipts: Vec<Receipt>,
	/// Index height that covered the receipt, when sync was awaited
	pub indexed_block: Option<u64>,
}
