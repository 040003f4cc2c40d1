//! In-memory query cache using DashMap with stale signalling

use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use ma_types::{CacheError, CacheKey, CacheNamespace, CacheResult, QueryCache};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

const TRACING_TARGET: &str = "ma_cache::memory";

/// Default capacity of the stale-event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// A cached query result
#[derive(Debug, Clone)]
pub struct CacheEntry {
	pub value: serde_json::Value,
	pub stale: bool,
	pub updated_at: DateTime<Utc>,
}

/// Published whenever entries are marked stale
///
/// `address == None` covers the whole namespace; `account == None` covers
/// every account of the market.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleEvent {
	pub namespace: CacheNamespace,
	pub address: Option<Address>,
	pub account: Option<Address>,
}

impl StaleEvent {
	/// Whether a view holding `key` should refetch
	pub fn covers(&self, key: &CacheKey) -> bool {
		self.namespace == key.namespace
			&& self.address.map_or(true, |a| a == key.address)
			&& account_matches(self.account.as_ref(), key)
	}
}

/// An unscoped entry matches every account
fn account_matches(account: Option<&Address>, key: &CacheKey) -> bool {
	match (account, key.account) {
		(Some(account), Some(held)) => *account == held,
		_ => true,
	}
}

/// Query cache shared between the views that fill it and the invalidator
#[derive(Clone)]
pub struct MemoryQueryCache {
	entries: Arc<DashMap<CacheKey, CacheEntry>>,
	events: broadcast::Sender<StaleEvent>,
}

impl MemoryQueryCache {
	pub fn new() -> Self {
		Self::with_capacity(DEFAULT_EVENT_CAPACITY)
	}

	pub fn with_capacity(event_capacity: usize) -> Self {
		let (events, _) = broadcast::channel(event_capacity.max(1));
		Self {
			entries: Arc::new(DashMap::new()),
			events,
		}
	}

	/// Stream of stale events for views that need to refetch
	pub fn subscribe(&self) -> broadcast::Receiver<StaleEvent> {
		self.events.subscribe()
	}

	/// Store any serializable query result
	pub fn put_json<T: Serialize>(&self, key: CacheKey, value: &T) -> CacheResult<()> {
		let value = serde_json::to_value(value).map_err(|e| CacheError::Serialization {
			message: e.to_string(),
		})?;
		self.put(key, value)
	}

	pub fn entry(&self, key: &CacheKey) -> Option<CacheEntry> {
		self.entries.get(key).map(|e| e.value().clone())
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Keys currently marked stale
	pub fn stale_keys(&self) -> Vec<CacheKey> {
		self.entries
			.iter()
			.filter(|e| e.value().stale)
			.map(|e| *e.key())
			.collect()
	}

	fn mark_stale(&self, event: StaleEvent) -> usize {
		let mut marked = 0;
		for mut entry in self.entries.iter_mut() {
			if !event.covers(entry.key()) {
				continue;
			}
			entry.value_mut().stale = true;
			marked += 1;
		}

		debug!(
			target: TRACING_TARGET,
			namespace = %event.namespace,
			address = ?event.address,
			account = ?event.account,
			marked,
			"Invalidated cache entries"
		);
		let namespace = event.namespace;
		// No subscribers is fine; entries stay marked
		if self.events.send(event).is_err() {
			debug!(
				target: TRACING_TARGET,
				namespace = %namespace,
				"No subscribers for stale event"
			);
		}
		marked
	}
}

impl Default for MemoryQueryCache {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for MemoryQueryCache {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MemoryQueryCache")
			.field("entries", &self.entries.len())
			.field("subscribers", &self.events.receiver_count())
			.finish()
	}
}

impl QueryCache for MemoryQueryCache {
	fn get(&self, key: &CacheKey) -> Option<serde_json::Value> {
		self.entries.get(key).map(|e| e.value().value.clone())
	}

	fn put(&self, key: CacheKey, value: serde_json::Value) -> CacheResult<()> {
		self.entries.insert(
			key,
			CacheEntry {
				value,
				stale: false,
				updated_at: Utc::now(),
			},
		);
		Ok(())
	}

	fn invalidate(
		&self,
		namespace: CacheNamespace,
		address: Option<&Address>,
	) -> CacheResult<usize> {
		Ok(self.mark_stale(StaleEvent {
			namespace,
			address: address.copied(),
			account: None,
		}))
	}

	fn invalidate_account(
		&self,
		namespace: CacheNamespace,
		market: &Address,
		account: &Address,
	) -> CacheResult<usize> {
		Ok(self.mark_stale(StaleEvent {
			namespace,
			address: Some(*market),
			account: Some(*account),
		}))
	}

	fn is_stale(&self, key: &CacheKey) -> bool {
		self.entries.get(key).is_some_and(|e| e.value().stale)
	}
}
