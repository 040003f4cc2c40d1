//! HTTP relay for multi-owner account bundles
//!
//! A bundle is proposed with `POST {endpoint}/bundles`; the owners sign it out of
//! band and the relay reports progress through `GET {endpoint}/bundles/{id}`.

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use ma_types::{
	BatchRelay, BundleSubmission, PreparedTransaction, Receipt, RelayError, RelayResult,
	SecretString,
};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const TRACING_TARGET: &str = "ma_adapters::bundle_relay";

/// Default upper bound on calls per bundle
pub const DEFAULT_MAX_CALLS: usize = 16;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BundleCall {
	to: Address,
	data: Bytes,
	value: U256,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProposeBundleRequest {
	chain_id: u64,
	account: Address,
	calls: Vec<BundleCall>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProposeBundleResponse {
	bundle_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum BundleState {
	Pending,
	Executed,
	Failed,
	Rejected,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BundleStatusResponse {
	status: BundleState,
	#[serde(default)]
	transaction_hash: Option<B256>,
	#[serde(default)]
	block_number: Option<u64>,
	#[serde(default)]
	reason: Option<String>,
}

/// Relay client bound to one multi-owner account
#[derive(Debug)]
pub struct HttpBundleRelay {
	client: Client,
	endpoint: Url,
	chain_id: u64,
	account: Address,
	poll_interval: Duration,
	timeout: Duration,
	max_calls: usize,
}

impl HttpBundleRelay {
	pub fn new(
		endpoint: &str,
		chain_id: u64,
		account: Address,
		api_key: Option<&SecretString>,
		request_timeout: Duration,
	) -> RelayResult<Self> {
		let mut endpoint = Url::parse(endpoint).map_err(|e| RelayError::Transport(e.to_string()))?;
		if !endpoint.path().ends_with('/') {
			let path = format!("{}/", endpoint.path());
			endpoint.set_path(&path);
		}

		let mut headers = HeaderMap::new();
		headers.insert("Content-Type", HeaderValue::from_static("application/json"));
		if let Some(key) = api_key {
			let mut value = HeaderValue::from_str(&format!("Bearer {}", key.expose_secret()))
				.map_err(|_| RelayError::Transport("Invalid relay API key".to_string()))?;
			value.set_sensitive(true);
			headers.insert(AUTHORIZATION, value);
		}

		let client = Client::builder()
			.default_headers(headers)
			.timeout(request_timeout)
			.build()
			.map_err(|e| RelayError::Transport(e.to_string()))?;

		Ok(Self {
			client,
			endpoint,
			chain_id,
			account,
			poll_interval: Duration::from_secs(3),
			timeout: Duration::from_secs(900),
			max_calls: DEFAULT_MAX_CALLS,
		})
	}

	pub fn with_polling(mut self, poll_interval: Duration, timeout: Duration) -> Self {
		self.poll_interval = poll_interval;
		self.timeout = timeout;
		self
	}

	pub fn with_max_calls(mut self, max_calls: usize) -> Self {
		self.max_calls = max_calls;
		self
	}

	fn url(&self, path: &str) -> RelayResult<Url> {
		self.endpoint
			.join(path)
			.map_err(|e| RelayError::Transport(e.to_string()))
	}

	async fn status(&self, bundle_id: &str) -> RelayResult<BundleStatusResponse> {
		let url = self.url(&format!("bundles/{}", bundle_id))?;
		let response = self
			.client
			.get(url)
			.send()
			.await
			.map_err(|e| RelayError::Transport(e.to_string()))?;

		if !response.status().is_success() {
			return Err(RelayError::HttpStatus {
				status_code: response.status().as_u16(),
				reason: response.text().await.unwrap_or_default(),
			});
		}

		response
			.json()
			.await
			.map_err(|e| RelayError::InvalidResponse {
				reason: format!("Failed to parse bundle status: {}", e),
			})
	}

	async fn poll_until_final(&self, bundle_id: &str) -> RelayResult<Receipt> {
		loop {
			let status = self.status(bundle_id).await?;
			match status.status {
				BundleState::Pending => {
					debug!(target: TRACING_TARGET, bundle_id, "Bundle still pending");
					tokio::time::sleep(self.poll_interval).await;
				},
				BundleState::Executed => {
					let (Some(transaction_hash), Some(block_number)) =
						(status.transaction_hash, status.block_number)
					else {
						return Err(RelayError::InvalidResponse {
							reason: "executed bundle without transaction hash or block".to_string(),
						});
					};
					return Ok(Receipt {
						transaction_hash,
						block_number,
						success: true,
						gas_used: 0,
					});
				},
				BundleState::Failed => {
					return Err(RelayError::Failed {
						bundle_id: bundle_id.to_string(),
						reason: status.reason.unwrap_or_else(|| "execution reverted".to_string()),
					});
				},
				BundleState::Rejected => {
					return Err(RelayError::Rejected {
						reason: status.reason.unwrap_or_else(|| "rejected by owners".to_string()),
					});
				},
			}
		}
	}
}

#[async_trait]
impl BatchRelay for HttpBundleRelay {
	/// Value transfers are not supported in bundles
	fn can_batch(&self, txs: &[PreparedTransaction]) -> bool {
		!txs.is_empty() && txs.len() <= self.max_calls && txs.iter().all(|tx| tx.value.is_zero())
	}

	async fn submit_bundle(&self, txs: &[PreparedTransaction]) -> RelayResult<BundleSubmission> {
		let request = ProposeBundleRequest {
			chain_id: self.chain_id,
			account: self.account,
			calls: txs
				.iter()
				.map(|tx| BundleCall {
					to: tx.to,
					data: tx.data.clone(),
					value: tx.value,
				})
				.collect(),
		};

		let response = self
			.client
			.post(self.url("bundles")?)
			.json(&request)
			.send()
			.await
			.map_err(|e| RelayError::Transport(e.to_string()))?;

		if !response.status().is_success() {
			return Err(RelayError::HttpStatus {
				status_code: response.status().as_u16(),
				reason: response.text().await.unwrap_or_default(),
			});
		}

		let body: ProposeBundleResponse =
			response
				.json()
				.await
				.map_err(|e| RelayError::InvalidResponse {
					reason: format!("Failed to parse bundle proposal: {}", e),
				})?;

		info!(
			target: TRACING_TARGET,
			bundle_id = %body.bundle_id,
			calls = txs.len(),
			account = %self.account,
			"Bundle proposed"
		);
		Ok(BundleSubmission {
			bundle_id: body.bundle_id,
		})
	}

	async fn wait_for_bundle(&self, submission: &BundleSubmission) -> RelayResult<Receipt> {
		tokio::time::timeout(self.timeout, self.poll_until_final(&submission.bundle_id))
			.await
			.map_err(|_| RelayError::Timeout {
				bundle_id: submission.bundle_id.clone(),
				timeout_ms: self.timeout.as_millis() as u64,
			})?
	}
}
