//! Query cache keys and the invalidation interface

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Families of cached query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CacheNamespace {
	Market,
	MarketAccount,
	BorrowerMarketAccount,
	Withdrawals,
	LendersByMarket,
}

impl CacheNamespace {
	pub fn as_str(&self) -> &'static str {
		match self {
			CacheNamespace::Market => "market",
			CacheNamespace::MarketAccount => "marketAccount",
			CacheNamespace::BorrowerMarketAccount => "borrowerMarketAccount",
			CacheNamespace::Withdrawals => "withdrawals",
			CacheNamespace::LendersByMarket => "lendersByMarket",
		}
	}

	/// Entries hold one account's view of a market
	pub fn is_per_account(&self) -> bool {
		matches!(self, CacheNamespace::MarketAccount)
	}
}

impl fmt::Display for CacheNamespace {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// `(namespace, address, account)` identifying one cached result
///
/// `account` is only set for per-account namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
	pub namespace: CacheNamespace,
	pub address: Address,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub account: Option<Address>,
}

impl CacheKey {
	pub fn new(namespace: CacheNamespace, address: Address) -> Self {
		Self {
			namespace,
			address,
			account: None,
		}
	}

	/// Key for one account's entry in `market`
	pub fn for_account(namespace: CacheNamespace, market: Address, account: Address) -> Self {
		Self {
			namespace,
			address: market,
			account: Some(account),
		}
	}
}

impl fmt::Display for CacheKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.account {
			Some(account) => write!(f, "{}:{}:{}", self.namespace, self.address, account),
			None => write!(f, "{}:{}", self.namespace, self.address),
		}
	}
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
	#[error("Serialization error: {message}")]
	Serialization { message: String },

	#[error("Cache operation failed: {message}")]
	Operation { message: String },
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Externally owned query cache
///
/// Views fill it through `put`; this subsystem only ever calls `invalidate`.
/// Every method is non-blocking.
pub trait QueryCache: Send + Sync {
	fn get(&self, key: &CacheKey) -> Option<serde_json::Value>;

	fn put(&self, key: CacheKey, value: serde_json::Value) -> CacheResult<()>;

	/// Mark entries stale and signal a refetch
	///
	/// With `address == None` the whole namespace is marked. Returns the number
	/// of cached entries that were marked.
	fn invalidate(&self, namespace: CacheNamespace, address: Option<&Address>)
		-> CacheResult<usize>;

	/// Mark one account's entries for `market` stale
	///
	/// Entries without an account are marked too. Caches that do not key by
	/// account fall back to the whole market.
	fn invalidate_account(
		&self,
		namespace: CacheNamespace,
		market: &Address,
		_account: &Address,
	) -> CacheResult<usize> {
		self.invalidate(namespace, Some(market))
	}

	fn is_stale(&self, key: &CacheKey) -> bool;
}
