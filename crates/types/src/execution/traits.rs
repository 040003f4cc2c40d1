//! Collaborator traits for reaching the chain
//!
//! Concrete implementations live in `ma-adapters`; the service crate only sees
//! these traits.

use alloy_primitives::B256;
use async_trait::async_trait;
use std::fmt::Debug;

use super::errors::{EncodeError, IndexResult, RelayResult, WalletResult};
use super::{BundleSubmission, Receipt};
use crate::plans::{OperationStep, PreparedTransaction};

/// Single-signer wallet connection
#[async_trait]
pub trait WalletClient: Send + Sync + Debug {
	/// Prompt for a signature and broadcast; returns the transaction hash
	async fn send_transaction(&self, tx: &PreparedTransaction) -> WalletResult<B256>;

	/// Wait until the transaction is mined
	///
	/// A mined-but-reverted transaction is returned as a receipt with
	/// `success == false`, not as an error.
	async fn wait_for_receipt(&self, tx_hash: B256) -> WalletResult<Receipt>;
}

/// Multi-owner account relay that executes call bundles atomically
#[async_trait]
pub trait BatchRelay: Send + Sync + Debug {
	/// Whether every call can be included in one bundle
	fn can_batch(&self, _txs: &[PreparedTransaction]) -> bool {
		true
	}

	async fn submit_bundle(&self, txs: &[PreparedTransaction]) -> RelayResult<BundleSubmission>;

	/// Wait until the bundle is executed on chain
	async fn wait_for_bundle(&self, submission: &BundleSubmission) -> RelayResult<Receipt>;
}

/// Downstream indexer whose height gates the success notification
#[async_trait]
pub trait IndexClient: Send + Sync + Debug {
	/// Highest block the indexer has processed
	async fn indexed_block(&self) -> IndexResult<u64>;
}

/// Turns operation steps into contract calls
pub trait CallEncoder: Send + Sync + Debug {
	fn encode(&self, step: &OperationStep) -> Result<PreparedTransaction, EncodeError>;
}
