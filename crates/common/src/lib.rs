//! # Blockgate Common Crate
//!
//! Shared vocabulary for the gateway control plane: node and account
//! identifiers, blockchain-network tables, the relay bookkeeping record,
//! the concurrent [`SyncMap`] capability, and raw CLI argument splitting.
//!
//! Everything in this crate is a value type or a self-contained utility;
//! nothing here performs I/O.

pub mod cli;
pub mod node_type;
pub mod syncmap;
pub mod types;

pub use node_type::NodeType;
pub use syncmap::SyncMap;
pub use types::{
    AccountId, NetworkId, NetworkNum, NodeId, RelayInfo, ETHEREUM_PROTOCOL,
    RELAY_MONITOR_INTERVAL,
};
