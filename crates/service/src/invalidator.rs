//! Cache invalidation after successful actions

use std::sync::Arc;

use alloy_primitives::Address;
use ma_types::{ActionKind, CacheNamespace, QueryCache};
use tracing::{debug, warn};

const TRACING_TARGET: &str = "ma_service::invalidator";

/// Namespaces an action kind makes stale
pub fn targets(kind: ActionKind) -> &'static [CacheNamespace] {
	use CacheNamespace::*;
	match kind {
		ActionKind::Deposit | ActionKind::Claim => &[Market, MarketAccount],
		ActionKind::Withdraw => &[Market, Withdrawals],
		ActionKind::ProcessUnpaidBatch => &[BorrowerMarketAccount, Withdrawals],
		ActionKind::AuthorizeLenders | ActionKind::DeauthorizeLenders => &[LendersByMarket],
		ActionKind::Repay
		| ActionKind::Borrow
		| ActionKind::AdjustApr
		| ActionKind::SetMaxSupply
		| ActionKind::CloseMarket
		| ActionKind::ResetReserveRatio => &[BorrowerMarketAccount],
	}
}

/// Marks cached queries stale; never fails the caller
#[derive(Clone)]
pub struct CacheInvalidator {
	cache: Arc<dyn QueryCache>,
}

impl CacheInvalidator {
	pub fn new(cache: Arc<dyn QueryCache>) -> Self {
		Self { cache }
	}

	/// Invalidate every target namespace of `kind` for `market`
	///
	/// Per-account namespaces are scoped to `account`. Returns the number of
	/// entries marked stale. Cache errors are logged.
	pub fn invalidate(&self, kind: ActionKind, market: &Address, account: &Address) -> usize {
		let mut marked = 0;
		for namespace in targets(kind) {
			let result = if namespace.is_per_account() {
				self.cache.invalidate_account(*namespace, market, account)
			} else {
				self.cache.invalidate(*namespace, Some(market))
			};
			match result {
				Ok(count) => marked += count,
				Err(e) => {
					warn!(
						target: TRACING_TARGET,
						namespace = %namespace,
						market = %market,
						error = %e,
						"Cache invalidation failed"
					);
				},
			}
		}
		debug!(target: TRACING_TARGET, kind = %kind, market = %market, marked, "Invalidated cache");
		marked
	}
}

impl std::fmt::Debug for CacheInvalidator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CacheInvalidator").finish_non_exhaustive()
	}
}
