//! Market action types
//!
//! Shared models and collaborator traits for orchestrating lending-market
//! actions. This crate contains the domain models organized by concern.

pub mod actions;
pub mod cache;
pub mod execution;
pub mod models;
pub mod notifications;
pub mod plans;
pub mod state;
pub mod status;

// Re-export chrono and serde_json for convenience
pub use chrono;
pub use serde_json;

pub use actions::{ActionIntent, ActionKind, ActionParams};

pub use cache::{CacheError, CacheKey, CacheNamespace, CacheResult, QueryCache};

pub use execution::{
	BatchRelay, BundleSubmission, CallEncoder, EncodeError, ExecutionError, ExecutionReport,
	ExecutionResult, IndexClient, IndexError, IndexResult, Receipt, RelayError, RelayResult,
	WalletClient, WalletError, WalletResult,
};

pub use models::{fraction_digits, AmountError, SecretString, Token, TokenAmount};

pub use notifications::{Notice, NoticeStage, Notifier};

pub use plans::{
	ComposeError, ComposeResult, ConnectionMode, ExecutionMode, OperationStep,
	PreparedTransaction, TransactionPlan,
};

pub use state::{
	AccountState, ClaimableWithdrawal, LenderRole, MarketAccountSnapshot, MarketState,
	StateError, StateProvider, StateResult,
};

pub use status::{status_message, ReadinessStatus};
