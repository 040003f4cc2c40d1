//! Wallet over HTTP JSON-RPC
//!
//! Signs through the node's `eth_sendTransaction` (an unlocked account or a
//! signing proxy) and polls `eth_getTransactionReceipt` for confirmation.

use alloy_primitives::{Address, Bytes, B256, U256, U64};
use async_trait::async_trait;
use ma_types::{PreparedTransaction, Receipt, WalletClient, WalletError, WalletResult};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const TRACING_TARGET: &str = "ma_adapters::json_rpc_wallet";

/// EIP-1193 "user rejected request"
pub const USER_REJECTED_CODE: i64 = 4001;

#[derive(Serialize)]
struct RpcRequest<'a, P: Serialize> {
	jsonrpc: &'static str,
	id: u64,
	method: &'a str,
	params: P,
}

#[derive(Deserialize)]
struct RpcResponse {
	#[serde(default)]
	result: Option<serde_json::Value>,
	#[serde(default)]
	error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
	code: i64,
	message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TransactionRequest {
	from: Address,
	to: Address,
	data: Bytes,
	value: U256,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
	transaction_hash: B256,
	block_number: U64,
	#[serde(default)]
	status: Option<U64>,
	#[serde(default)]
	gas_used: Option<U64>,
}

impl From<RpcReceipt> for Receipt {
	fn from(r: RpcReceipt) -> Self {
		Receipt {
			transaction_hash: r.transaction_hash,
			block_number: r.block_number.to::<u64>(),
			// Pre-byzantium receipts carry no status; treat as success
			success: r.status.map_or(true, |s| s == U64::from(1)),
			gas_used: r.gas_used.map_or(0, |g| g.to::<u64>()),
		}
	}
}

/// JSON-RPC wallet bound to one sending account
#[derive(Debug)]
pub struct JsonRpcWallet {
	client: Client,
	url: Url,
	from: Address,
	poll_interval: Duration,
	receipt_timeout: Duration,
	next_id: AtomicU64,
}

impl JsonRpcWallet {
	pub fn new(
		url: &str,
		from: Address,
		request_timeout: Duration,
		poll_interval: Duration,
		receipt_timeout: Duration,
	) -> WalletResult<Self> {
		let url = Url::parse(url).map_err(|e| WalletError::Transport(e.to_string()))?;
		let client = Client::builder()
			.timeout(request_timeout)
			.build()
			.map_err(|e| WalletError::Transport(e.to_string()))?;

		Ok(Self {
			client,
			url,
			from,
			poll_interval,
			receipt_timeout,
			next_id: AtomicU64::new(1),
		})
	}

	pub fn from_address(&self) -> Address {
		self.from
	}

	async fn call<P, R>(&self, method: &str, params: P) -> WalletResult<Option<R>>
	where
		P: Serialize + Send,
		R: DeserializeOwned,
	{
		let request = RpcRequest {
			jsonrpc: "2.0",
			id: self.next_id.fetch_add(1, Ordering::Relaxed),
			method,
			params,
		};

		let response = self
			.client
			.post(self.url.clone())
			.json(&request)
			.send()
			.await
			.map_err(|e| WalletError::Transport(e.to_string()))?;

		if !response.status().is_success() {
			return Err(WalletError::Transport(format!(
				"{} returned status {}",
				method,
				response.status()
			)));
		}

		let body: RpcResponse =
			response
				.json()
				.await
				.map_err(|e| WalletError::InvalidResponse {
					reason: format!("Failed to parse {} response: {}", method, e),
				})?;

		if let Some(error) = body.error {
			if error.code == USER_REJECTED_CODE {
				return Err(WalletError::Rejected);
			}
			return Err(WalletError::Rpc {
				code: error.code,
				message: error.message,
			});
		}

		match body.result {
			None | Some(serde_json::Value::Null) => Ok(None),
			Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
				WalletError::InvalidResponse {
					reason: format!("Unexpected {} result: {}", method, e),
				}
			}),
		}
	}

	async fn poll_receipt(&self, tx_hash: B256) -> WalletResult<Receipt> {
		loop {
			let receipt: Option<RpcReceipt> =
				self.call("eth_getTransactionReceipt", [tx_hash]).await?;
			if let Some(receipt) = receipt {
				return Ok(receipt.into());
			}
			tokio::time::sleep(self.poll_interval).await;
		}
	}
}

#[async_trait]
impl WalletClient for JsonRpcWallet {
	async fn send_transaction(&self, tx: &PreparedTransaction) -> WalletResult<B256> {
		debug!(
			target: TRACING_TARGET,
			step = %tx.label,
			to = %tx.to,
			from = %self.from,
			"Requesting signature"
		);

		let request = TransactionRequest {
			from: self.from,
			to: tx.to,
			data: tx.data.clone(),
			value: tx.value,
		};
		let hash: Option<B256> = self.call("eth_sendTransaction", [request]).await?;
		hash.ok_or_else(|| WalletError::InvalidResponse {
			reason: "eth_sendTransaction returned no hash".to_string(),
		})
	}

	async fn wait_for_receipt(&self, tx_hash: B256) -> WalletResult<Receipt> {
		match tokio::time::timeout(self.receipt_timeout, self.poll_receipt(tx_hash)).await {
			Ok(result) => result,
			Err(_) => {
				// A transaction the node no longer knows about was dropped
				let known: Option<serde_json::Value> = self
					.call("eth_getTransactionByHash", [tx_hash])
					.await
					.unwrap_or_else(|e| {
						warn!(
							target: TRACING_TARGET,
							error = %e,
							"Failed to look up timed out transaction"
						);
						Some(serde_json::Value::Bool(true))
					});
				if known.is_none() {
					return Err(WalletError::Dropped { tx_hash });
				}
				Err(WalletError::Timeout {
					tx_hash,
					timeout_ms: self.receipt_timeout.as_millis() as u64,
				})
			},
		}
	}
}
