//! Core identifier and blockchain-network types shared across the control
//! plane.
//!
//! Node and account IDs are directory-assigned UUID strings; they are kept
//! as plain `String` aliases so wire models and log lines can use them
//! without conversion.

use std::time::{Duration, Instant};

/// A node's directory-assigned ID (UUID string).
pub type NodeId = String;

/// A user account ID (UUID string).
pub type AccountId = String;

/// The directory-internal number of a blockchain network
/// (Ethereum Mainnet, Holesky, etc.).
pub type NetworkNum = u32;

/// The chain ID a message is routed in (1 for Ethereum Mainnet, 56 for
/// BSC-Mainnet, etc.).
pub type NetworkId = i64;

/// String representation of the Ethereum protocol.
pub const ETHEREUM_PROTOCOL: &str = "Ethereum";

/// Ethereum main net network name.
pub const MAINNET: &str = "Mainnet";
/// BSC main net network name.
pub const BSC_MAINNET: &str = "BSC-Mainnet";
/// BSC testnet network name.
pub const BSC_TESTNET: &str = "BSC-Testnet";
/// Holesky testnet network name.
pub const HOLESKY: &str = "Holesky";
/// Base main net network name.
pub const BASE_MAINNET: &str = "Base-Mainnet";

/// Ethereum main net network number.
pub const MAINNET_NUM: NetworkNum = 5;
/// BSC main net network number.
pub const BSC_MAINNET_NUM: NetworkNum = 10;
/// BSC testnet network number.
pub const BSC_TESTNET_NUM: NetworkNum = 42;
/// Holesky testnet network number.
pub const HOLESKY_NUM: NetworkNum = 49;
/// Base main net network number.
pub const BASE_MAINNET_NUM: NetworkNum = 456;

/// Ethereum main net chain ID.
pub const ETH_CHAIN_ID: NetworkId = 1;
/// BSC chain ID.
pub const BSC_CHAIN_ID: NetworkId = 56;
/// Holesky testnet chain ID.
pub const HOLESKY_CHAIN_ID: NetworkId = 17000;
/// Base chain ID.
pub const BASE_CHAIN_ID: NetworkId = 8453;

/// How long the relay recovery loop sleeps between failed attempts to find
/// a replacement relay.
pub const RELAY_MONITOR_INTERVAL: Duration = Duration::from_secs(10);

/// Maps a blockchain network name to its directory network number.
pub fn network_num(network: &str) -> Option<NetworkNum> {
    match network {
        MAINNET => Some(MAINNET_NUM),
        BSC_MAINNET => Some(BSC_MAINNET_NUM),
        BSC_TESTNET => Some(BSC_TESTNET_NUM),
        HOLESKY => Some(HOLESKY_NUM),
        BASE_MAINNET => Some(BASE_MAINNET_NUM),
        _ => None,
    }
}

/// Maps a directory network number back to the blockchain network name.
pub fn network_name(num: NetworkNum) -> Option<&'static str> {
    match num {
        MAINNET_NUM => Some(MAINNET),
        BSC_MAINNET_NUM => Some(BSC_MAINNET),
        BSC_TESTNET_NUM => Some(BSC_TESTNET),
        HOLESKY_NUM => Some(HOLESKY),
        BASE_MAINNET_NUM => Some(BASE_MAINNET),
        _ => None,
    }
}

/// Maps a directory network number to its chain ID. Only Ethereum
/// Mainnet, BSC-Mainnet, and Holesky are wired up; Base routing does not
/// key off this table.
pub fn chain_id(num: NetworkNum) -> Option<NetworkId> {
    match num {
        MAINNET_NUM => Some(ETH_CHAIN_ID),
        BSC_MAINNET_NUM => Some(BSC_CHAIN_ID),
        HOLESKY_NUM => Some(HOLESKY_CHAIN_ID),
        _ => None,
    }
}

/// Block interval for each named network. Unknown networks return zero.
pub fn block_duration(network: &str) -> Duration {
    match network {
        MAINNET | HOLESKY => Duration::from_secs(12),
        BSC_MAINNET | BSC_TESTNET => Duration::from_millis(1500),
        _ => Duration::ZERO,
    }
}

/// Bookkeeping record for every relay the controller has acted upon,
/// keyed by IP in the shared ignored-relays map.
///
/// `is_connected` is flipped to `false` by the data plane when the relay's
/// socket dies; the controller only ever inserts entries with it set.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayInfo {
    /// When the controller inserted or last overwrote this entry.
    pub time_added: Instant,
    /// Relay port from the spec or the candidate list.
    pub port: i64,
    /// Whether the gateway currently holds (or is establishing) a session.
    pub is_connected: bool,
    /// Static relays come from the user's relay spec and are never
    /// auto-replaced.
    pub is_static: bool,
    /// Last measured round-trip latency in milliseconds. Zero until the
    /// periodic re-ranker has probed the relay.
    pub latency: f64,
}

impl Default for RelayInfo {
    fn default() -> Self {
        Self {
            time_added: Instant::now(),
            port: 0,
            is_connected: false,
            is_static: false,
            latency: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_tables_roundtrip() {
        for name in [MAINNET, BSC_MAINNET, BSC_TESTNET, HOLESKY, BASE_MAINNET] {
            let num = network_num(name).expect("known network");
            assert_eq!(network_name(num), Some(name));
        }
        assert_eq!(network_num("Fantom"), None);
        assert_eq!(network_name(0), None);
    }

    #[test]
    fn chain_ids() {
        assert_eq!(chain_id(MAINNET_NUM), Some(ETH_CHAIN_ID));
        assert_eq!(chain_id(BSC_MAINNET_NUM), Some(BSC_CHAIN_ID));
        assert_eq!(chain_id(HOLESKY_NUM), Some(HOLESKY_CHAIN_ID));
        assert_eq!(chain_id(BSC_TESTNET_NUM), None);
        assert_eq!(chain_id(BASE_MAINNET_NUM), None);
    }

    #[test]
    fn block_durations() {
        assert_eq!(block_duration(MAINNET), Duration::from_secs(12));
        assert_eq!(block_duration(BSC_MAINNET), Duration::from_millis(1500));
        assert_eq!(block_duration("unknown"), Duration::ZERO);
    }

    #[test]
    fn relay_info_default_is_disconnected() {
        let info = RelayInfo::default();
        assert!(!info.is_connected);
        assert!(!info.is_static);
        assert_eq!(info.port, 0);
    }
}
