//! Subgraph height lookup

use async_trait::async_trait;
use ma_types::{IndexClient, IndexError, IndexResult};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::trace;
use url::Url;

const TRACING_TARGET: &str = "ma_adapters::subgraph_index";

const META_QUERY: &str = "{ _meta { block { number } } }";

#[derive(Deserialize)]
struct GraphQlResponse {
	#[serde(default)]
	data: Option<MetaData>,
	#[serde(default)]
	errors: Option<Vec<GraphQlError>>,
}

#[derive(Deserialize)]
struct GraphQlError {
	message: String,
}

#[derive(Deserialize)]
struct MetaData {
	#[serde(rename = "_meta")]
	meta: Meta,
}

#[derive(Deserialize)]
struct Meta {
	block: MetaBlock,
}

#[derive(Deserialize)]
struct MetaBlock {
	number: u64,
}

/// Reads the indexed block height from a GraphQL subgraph endpoint
#[derive(Debug, Clone)]
pub struct SubgraphIndexClient {
	client: Client,
	url: Url,
}

impl SubgraphIndexClient {
	pub fn new(url: &str, request_timeout: Duration) -> IndexResult<Self> {
		let url = Url::parse(url).map_err(|e| IndexError::Transport(e.to_string()))?;
		let client = Client::builder()
			.timeout(request_timeout)
			.build()
			.map_err(|e| IndexError::Transport(e.to_string()))?;
		Ok(Self { client, url })
	}
}

#[async_trait]
impl IndexClient for SubgraphIndexClient {
	async fn indexed_block(&self) -> IndexResult<u64> {
		let response = self
			.client
			.post(self.url.clone())
			.json(&serde_json::json!({ "query": META_QUERY }))
			.send()
			.await
			.map_err(|e| IndexError::Transport(e.to_string()))?;

		if !response.status().is_success() {
			return Err(IndexError::Query {
				reason: format!("subgraph returned status {}", response.status()),
			});
		}

		let body: GraphQlResponse =
			response
				.json()
				.await
				.map_err(|e| IndexError::InvalidResponse {
					reason: format!("Failed to parse subgraph response: {}", e),
				})?;

		if let Some(errors) = body.errors.filter(|e| !e.is_empty()) {
			let reason = errors
				.into_iter()
				.map(|e| e.message)
				.collect::<Vec<_>>()
				.join("; ");
			return Err(IndexError::Query { reason });
		}

		let number = body
			.data
			.map(|d| d.meta.block.number)
			.ok_or_else(|| IndexError::InvalidResponse {
				reason: "missing _meta block".to_string(),
			})?;
		trace!(target: TRACING_TARGET, indexed_block = number, "Fetched index height");
		Ok(number)
	}
}
