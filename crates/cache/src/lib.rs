//! Market actions query cache
//!
//! In-memory implementation of [`ma_types::QueryCache`]. Views fill the cache;
//! the action service only invalidates it.

pub mod memory_cache;

pub use memory_cache::{CacheEntry, MemoryQueryCache, StaleEvent, DEFAULT_EVENT_CAPACITY};
