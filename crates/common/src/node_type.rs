//! Node-type taxonomy.
//!
//! A node type is a bit set so composite types (e.g. `GATEWAY`, which covers
//! both internal and external gateways) can be expressed and tested with
//! `contains`. The wire representation is the upper-snake name used by the
//! directory (`EXTERNAL_GATEWAY`, `RELAY_PROXY`, ...).

use std::fmt;
use std::str::FromStr;

/// Flag indicating the type of a node (gateway, relay proxy, etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeType(u32);

impl NodeType {
    /// A gateway run by the network operator.
    pub const INTERNAL_GATEWAY: NodeType = NodeType(1);
    /// A gateway run by anyone.
    pub const EXTERNAL_GATEWAY: NodeType = NodeType(1 << 1);
    /// The directory service itself.
    pub const API: NodeType = NodeType(1 << 3);
    /// The directory's socket broker.
    pub const API_SOCKET: NodeType = NodeType(1 << 4);
    /// Cloud API instances.
    pub const CLOUD_API: NodeType = NodeType(1 << 5);
    /// Proxy relay sitting in front of relays.
    pub const RELAY_PROXY: NodeType = NodeType(1 << 8);
    /// A websocket connection to a node.
    pub const WEBSOCKET: NodeType = NodeType(1 << 9);
    /// A gRPC connection.
    pub const GRPC: NodeType = NodeType(1 << 10);
    /// A blockchain connection.
    pub const BLOCKCHAIN: NodeType = NodeType(1 << 11);
    /// A relay routing Solana messages only.
    pub const SOLANA_RELAY: NodeType = NodeType(1 << 12);
    /// All gateway variants.
    pub const GATEWAY: NodeType =
        NodeType(Self::INTERNAL_GATEWAY.0 | Self::EXTERNAL_GATEWAY.0);

    /// Returns true when every bit of `other` is set in `self`.
    pub fn contains(self, other: NodeType) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    /// Returns true when `self` and `other` share any bit.
    pub fn intersects(self, other: NodeType) -> bool {
        self.0 & other.0 != 0
    }

    /// Wire name of the node type, `"UNKNOWN"` for unnamed combinations.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::INTERNAL_GATEWAY => "INTERNAL_GATEWAY",
            Self::EXTERNAL_GATEWAY => "EXTERNAL_GATEWAY",
            Self::API => "API",
            Self::API_SOCKET => "API_SOCKET",
            Self::CLOUD_API => "BLOCKGATE_CLOUD_API",
            Self::GATEWAY => "GATEWAY",
            Self::RELAY_PROXY => "RELAY_PROXY",
            Self::WEBSOCKET => "WEBSOCKET",
            Self::GRPC => "GRPC",
            Self::BLOCKCHAIN => "BLOCKCHAIN",
            Self::SOLANA_RELAY => "SOLANA_RELAY",
            _ => "UNKNOWN",
        }
    }

    /// Parses a node type from its wire name. Hyphens are dropped and the
    /// input is upper-cased first, so `"external-gateway"` parses too.
    pub fn from_name(name: &str) -> Option<NodeType> {
        let cleaned = name.replace('-', "").to_uppercase();
        match cleaned.as_str() {
            "INTERNAL_GATEWAY" => Some(Self::INTERNAL_GATEWAY),
            "EXTERNAL_GATEWAY" => Some(Self::EXTERNAL_GATEWAY),
            "API" => Some(Self::API),
            "API_SOCKET" => Some(Self::API_SOCKET),
            "BLOCKGATE_CLOUD_API" => Some(Self::CLOUD_API),
            "GATEWAY" => Some(Self::GATEWAY),
            "RELAY_PROXY" => Some(Self::RELAY_PROXY),
            "WEBSOCKET" => Some(Self::WEBSOCKET),
            "GRPC" => Some(Self::GRPC),
            "BLOCKCHAIN" => Some(Self::BLOCKCHAIN),
            "SOLANA_RELAY" => Some(Self::SOLANA_RELAY),
            _ => None,
        }
    }

    /// Short one-letter form used in connection log lines.
    pub fn format_short(self) -> String {
        if self.intersects(Self::GATEWAY) {
            return "G".to_string();
        }
        if self.intersects(Self::RELAY_PROXY) {
            return "R".to_string();
        }
        self.as_str().to_string()
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown node type {s}"))
    }
}
