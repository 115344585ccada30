//! Wire models exchanged with the directory service.
//!
//! Every field carries `#[serde(default)]` so partial responses — and the
//! snapshots the cache fallback replays — deserialize without error. Only
//! the fields the control plane reads are modeled; unknown JSON fields are
//! ignored.

use std::collections::HashMap;

use blockgate_common::types::{AccountId, NetworkNum, NodeId, ETHEREUM_PROTOCOL};
use serde::{Deserialize, Serialize};

use crate::error::SdnError;

/// Account tier name as reported by the directory.
pub type AccountTier = String;

/// The node's registration record, posted to and patched by the directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeModel {
    #[serde(default)]
    pub node_type: String,
    #[serde(default)]
    pub external_ip: String,
    #[serde(default)]
    pub external_port: i64,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub node_id: NodeId,
    #[serde(default)]
    pub account_id: AccountId,
    #[serde(default)]
    pub blockchain_network_num: NetworkNum,
    #[serde(default)]
    pub source_version: String,
    #[serde(default)]
    pub os_version: String,
    #[serde(default)]
    pub is_docker: bool,
    #[serde(default)]
    pub node_start_time: String,
    /// Certificate signing request, set only while registering for a
    /// private certificate.
    #[serde(default)]
    pub csr: String,
    /// Private certificate issued by the directory on registration.
    #[serde(default)]
    pub cert: Option<String>,
}

impl NodeModel {
    /// Serializes the model for the registration POST body.
    pub fn pack(&self) -> Result<Vec<u8>, SdnError> {
        serde_json::to_vec(self).map_err(SdnError::Serialize)
    }
}

/// A candidate relay peer advertised by the directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Peer {
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub port: i64,
}

/// Candidate relay list, in directory order. The controller imposes
/// latency order.
pub type Peers = Vec<Peer>;

/// Per-network attributes that ship with a blockchain network record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkDefaultAttributes {
    /// Terminal total difficulty. Zero on the wire means "not configured";
    /// [`BlockchainNetwork::apply_ttd_sentinel`] rewrites it at load time.
    #[serde(default)]
    pub terminal_total_difficulty: f64,
}

/// A blockchain network record from `/blockchain-networks`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockchainNetwork {
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub network_num: NetworkNum,
    #[serde(default)]
    pub min_tx_age_seconds: f64,
    #[serde(default)]
    pub min_tx_network_fee: f64,
    #[serde(default)]
    pub allowed_from_tier: String,
    #[serde(default)]
    pub send_cross_geo: bool,
    #[serde(default)]
    pub allow_gas_price_change_reuse_sender_nonce: f64,
    #[serde(default)]
    pub default_attributes: NetworkDefaultAttributes,
}

impl BlockchainNetwork {
    /// For Ethereum networks a terminal total difficulty of 0 is a
    /// "not configured" sentinel; replace it with the maximum signed
    /// 64-bit value so comparisons against it never trigger.
    pub fn apply_ttd_sentinel(&mut self) {
        if self.protocol == ETHEREUM_PROTOCOL
            && self.default_attributes.terminal_total_difficulty == 0.0
        {
            self.default_attributes.terminal_total_difficulty = i64::MAX as f64;
        }
    }
}

/// In-memory network table, keyed by network number.
pub type BlockchainNetworks = HashMap<NetworkNum, BlockchainNetwork>;

/// A quota-bearing service limit on an account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BdnServiceLimit {
    #[serde(default)]
    pub expire_date: String,
    #[serde(default)]
    pub msg_quota: BdnQuota,
}

impl BdnServiceLimit {
    fn overlay(&mut self, loaded: BdnServiceLimit) {
        if !loaded.expire_date.is_empty() {
            self.expire_date = loaded.expire_date;
        }
        self.msg_quota.overlay(loaded.msg_quota);
    }
}

/// Quota counters inside a service limit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BdnQuota {
    #[serde(default)]
    pub interval: String,
    #[serde(default)]
    pub service_type: String,
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub behavior_limit_ok: String,
    #[serde(default)]
    pub behavior_limit_fail: String,
}

impl BdnQuota {
    fn overlay(&mut self, loaded: BdnQuota) {
        if !loaded.interval.is_empty() {
            self.interval = loaded.interval;
        }
        if !loaded.service_type.is_empty() {
            self.service_type = loaded.service_type;
        }
        if loaded.limit != 0 {
            self.limit = loaded.limit;
        }
        if !loaded.behavior_limit_ok.is_empty() {
            self.behavior_limit_ok = loaded.behavior_limit_ok;
        }
        if !loaded.behavior_limit_fail.is_empty() {
            self.behavior_limit_fail = loaded.behavior_limit_fail;
        }
    }
}

/// An account record from `/account/<id>` or `/accounts/<id>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub account_id: AccountId,
    #[serde(default)]
    pub tier_name: AccountTier,
    #[serde(default)]
    pub secret_hash: String,
    #[serde(default)]
    pub blockchain_protocol: String,
    #[serde(default)]
    pub blockchain_network: String,
    #[serde(default)]
    pub relay_limit: BdnServiceLimit,
    #[serde(default)]
    pub max_allowed_nodes: BdnServiceLimit,
    #[serde(default)]
    pub private_transaction_fee: BdnServiceLimit,
}

/// Expire date used by the default elite template for limits that never
/// lapse on their own.
const NO_EXPIRY: &str = "2999-01-01";

impl Account {
    /// The "default elite" template: the account every loaded record is
    /// overlaid onto so missing fields get sane, permissive values.
    pub fn default_elite() -> Account {
        Account {
            account_id: String::new(),
            tier_name: "Elite".to_string(),
            secret_hash: String::new(),
            blockchain_protocol: String::new(),
            blockchain_network: String::new(),
            relay_limit: BdnServiceLimit {
                expire_date: NO_EXPIRY.to_string(),
                msg_quota: BdnQuota {
                    interval: "WITHOUT_INTERVAL".to_string(),
                    service_type: "MSG_QUOTA".to_string(),
                    limit: 2,
                    behavior_limit_ok: "ALERT".to_string(),
                    behavior_limit_fail: "BLOCK_ALERT".to_string(),
                },
            },
            max_allowed_nodes: BdnServiceLimit {
                expire_date: NO_EXPIRY.to_string(),
                msg_quota: BdnQuota {
                    interval: "WITHOUT_INTERVAL".to_string(),
                    service_type: "MSG_QUOTA".to_string(),
                    limit: 6,
                    behavior_limit_ok: "ALERT".to_string(),
                    behavior_limit_fail: "BLOCK_ALERT".to_string(),
                },
            },
            private_transaction_fee: BdnServiceLimit {
                expire_date: NO_EXPIRY.to_string(),
                msg_quota: BdnQuota {
                    interval: "WITHOUT_INTERVAL".to_string(),
                    service_type: "MSG_QUOTA".to_string(),
                    limit: 0,
                    behavior_limit_ok: "ALERT".to_string(),
                    behavior_limit_fail: "BLOCK_ALERT".to_string(),
                },
            },
        }
    }

    /// Overlays this (loaded) account onto the default elite template.
    ///
    /// Non-empty loaded fields win; empty strings and zero limits take the
    /// template value. Equivalent to a deep merge with ignore-empty
    /// semantics.
    pub fn fill_defaults(self) -> Account {
        let mut merged = Account::default_elite();
        if !self.account_id.is_empty() {
            merged.account_id = self.account_id;
        }
        if !self.tier_name.is_empty() {
            merged.tier_name = self.tier_name;
        }
        if !self.secret_hash.is_empty() {
            merged.secret_hash = self.secret_hash;
        }
        if !self.blockchain_protocol.is_empty() {
            merged.blockchain_protocol = self.blockchain_protocol;
        }
        if !self.blockchain_network.is_empty() {
            merged.blockchain_network = self.blockchain_network;
        }
        merged.relay_limit.overlay(self.relay_limit);
        merged.max_allowed_nodes.overlay(self.max_allowed_nodes);
        merged.private_transaction_fee.overlay(self.private_transaction_fee);
        merged
    }
}

/// A node lifecycle event posted to `/nodes/<id>/events`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeEvent {
    #[serde(default)]
    pub node_id: NodeId,
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub timestamp: String,
}

/// Error body the directory attaches to non-200 responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorMessage {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: String,
}

/// Body of the quota-status request.
#[derive(Debug, Clone, Serialize)]
pub struct QuotaRequest {
    pub account_id: String,
}

/// Quota usage as reported by `/accounts/quota-status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuotaResponse {
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub quota_filled: i64,
    #[serde(default)]
    pub quota_limit: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    // A directory response carries far more fields than the control plane
    // reads; deserialization must tolerate all of them.
    const FULL_NODE_MODEL: &str = r#"{
        "node_type": "EXTERNAL_GATEWAY", "external_port": 1801,
        "non_ssl_port": 0, "external_ip": "11.113.164.111", "online": false,
        "network": "Mainnet", "protocol": "Ethereum",
        "node_id": "35299c61-55ad-4565-85a3-0cd985953fac",
        "sid_start": null, "source_version": "2.108.3.0",
        "blockchain_network_num": 10, "hostname": "gw.local",
        "os_version": "darwin", "continent": "NA",
        "country": "United States", "region": null, "csr": "",
        "cert": null, "account_id": "34ff3406-cc74-4cc7-9d9a-9ef8bdda59b1",
        "node_privileges": "general", "is_docker": true
    }"#;

    #[test]
    fn node_model_tolerates_unknown_fields() {
        let model: NodeModel =
            serde_json::from_str(FULL_NODE_MODEL).expect("deserialize");
        assert_eq!(model.node_id, "35299c61-55ad-4565-85a3-0cd985953fac");
        assert_eq!(model.blockchain_network_num, 10);
        assert_eq!(model.node_type, "EXTERNAL_GATEWAY");
        assert_eq!(model.cert, None);
        assert!(model.is_docker);
    }

    #[test]
    fn node_model_pack_roundtrips() {
        let model = NodeModel {
            protocol: "Ethereum".to_string(),
            network: "Mainnet".to_string(),
            external_ip: "1.2.3.4".to_string(),
            ..NodeModel::default()
        };
        let packed = model.pack().expect("pack");
        let back: NodeModel = serde_json::from_slice(&packed).expect("unpack");
        assert_eq!(back, model);
    }

    #[test]
    fn ttd_sentinel_only_for_ethereum_zero() {
        let mut network = BlockchainNetwork {
            protocol: "Ethereum".to_string(),
            ..BlockchainNetwork::default()
        };
        network.apply_ttd_sentinel();
        assert_eq!(
            network.default_attributes.terminal_total_difficulty,
            i64::MAX as f64
        );

        let mut configured = BlockchainNetwork {
            protocol: "Ethereum".to_string(),
            default_attributes: NetworkDefaultAttributes {
                terminal_total_difficulty: 5.875e22,
            },
            ..BlockchainNetwork::default()
        };
        configured.apply_ttd_sentinel();
        assert_eq!(
            configured.default_attributes.terminal_total_difficulty,
            5.875e22
        );

        let mut solana = BlockchainNetwork {
            protocol: "Solana".to_string(),
            ..BlockchainNetwork::default()
        };
        solana.apply_ttd_sentinel();
        assert_eq!(solana.default_attributes.terminal_total_difficulty, 0.0);
    }

    #[test]
    fn fill_defaults_on_empty_account_is_the_template() {
        let merged = Account::default().fill_defaults();
        assert_eq!(merged, Account::default_elite());
    }

    #[test]
    fn fill_defaults_keeps_loaded_fields() {
        let loaded: Account = serde_json::from_str(
            r#"{"account_id":"e64yrte6547","tier_name":"",
                "relay_limit":{"expire_date":"","msg_quota":{"limit":0}},
                "private_transaction_fee":{"expire_date":"2999-01-01",
                    "msg_quota":{"interval":"WITHOUT_INTERVAL",
                        "service_type":"MSG_QUOTA",
                        "limit":13614113913969504939,
                        "behavior_limit_ok":"ALERT",
                        "behavior_limit_fail":"BLOCK_ALERT"}}}"#,
        )
        .expect("deserialize");
        let merged = loaded.fill_defaults();
        assert_eq!(merged.account_id, "e64yrte6547");
        // empty tier and zero relay limit take the elite defaults
        assert_eq!(merged.tier_name, "Elite");
        assert_eq!(merged.relay_limit.msg_quota.limit, 2);
        assert_eq!(
            merged.private_transaction_fee.msg_quota.limit,
            13614113913969504939
        );
    }
}
