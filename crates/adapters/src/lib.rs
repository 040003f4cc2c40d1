//! Market actions adapters
//!
//! Concrete implementations of the collaborator traits in `ma-types`: ABI
//! encoding, a JSON-RPC wallet, a multi-owner bundle relay and a subgraph
//! index client.

pub mod bundle_relay;
pub mod encoder;
pub mod json_rpc_wallet;
pub mod subgraph_index;

pub use bundle_relay::{HttpBundleRelay, DEFAULT_MAX_CALLS};
pub use encoder::SolCallEncoder;
pub use json_rpc_wallet::{JsonRpcWallet, USER_REJECTED_CODE};
pub use subgraph_index::SubgraphIndexClient;
pub use ma_types::{
	BatchRelay, CallEncoder, IndexClient, IndexError, RelayError, WalletClient, WalletError,
};
