//! Market actions service
//!
//! Classification, allowance handling, plan composition, execution and cache
//! invalidation for borrower and lender actions.

pub mod action;
pub mod allowance;
pub mod cancel;
pub mod classifier;
pub mod composer;
pub mod executor;
pub mod invalidator;
pub mod notifier;

#[cfg(test)]
mod test_support;

pub use action::{
	preview_action, ActionOutcome, ActionPreview, ActionService, ActionServiceError,
};
pub use allowance::AllowancePolicy;
pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use classifier::{classify, parse_apr_bips, preview_apr, resolve_amount, AprPreview};
pub use composer::TransactionComposer;
pub use executor::{IndexSyncPolicy, PlanExecutor, PlanExecutorTrait};
pub use invalidator::{targets as invalidation_targets, CacheInvalidator};
pub use notifier::{
	ActionMessages, ApprovalMessages, TracingNotifier, CONFIRMATION_TIMEOUT_MESSAGE,
	SYNC_TIMEOUT_MESSAGE,
};
