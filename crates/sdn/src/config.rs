//! Gateway configuration, loaded from TOML.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::SdnError;
use crate::message::NodeModel;

/// Typed configuration for the control-plane client. Every field is
/// optional; consumers that cannot run without one surface the gap when
/// they are constructed.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the directory service.
    pub sdn_url: Option<String>,

    /// Directory for the cached directory snapshots. Defaults to `./data`.
    pub data_dir: Option<String>,

    /// Externally visible IPv4. Autodiscovered when absent.
    pub external_ip: Option<String>,

    /// Relay spec string, e.g. `"auto"` or `"1.2.3.4:1809, auto"`.
    pub relays: Option<String>,

    /// Cap on concurrent relay connections.
    pub relay_limit: Option<u64>,

    /// Blockchain protocol to register for, e.g. `"Ethereum"`.
    pub protocol: Option<String>,

    /// Blockchain network to register for, e.g. `"Mainnet"`.
    pub network: Option<String>,

    /// Node type reported at registration.
    pub node_type: Option<String>,

    /// Version string reported at registration.
    pub source_version: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            sdn_url: None,
            data_dir: Some("./data".to_string()),
            external_ip: None,
            relays: Some("auto".to_string()),
            relay_limit: Some(1),
            protocol: Some("Ethereum".to_string()),
            network: Some("Mainnet".to_string()),
            node_type: Some("EXTERNAL_GATEWAY".to_string()),
            source_version: None,
        }
    }
}

impl GatewayConfig {
    /// Loads the config from a TOML file. A missing file or a parse
    /// failure is an error.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<GatewayConfig, SdnError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|err| SdnError::Config(err.to_string()))?;
        toml::from_str(&raw).map_err(|err| SdnError::Config(err.to_string()))
    }

    /// Data directory, defaulting to `./data`.
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(self.data_dir.as_deref().unwrap_or("./data"))
    }

    /// Seed node model for registration.
    pub fn node_model(&self) -> NodeModel {
        NodeModel {
            node_type: self.node_type.clone().unwrap_or_default(),
            external_ip: self.external_ip.clone().unwrap_or_default(),
            protocol: self.protocol.clone().unwrap_or_default(),
            network: self.network.clone().unwrap_or_default(),
            source_version: self.source_version.clone().unwrap_or_default(),
            ..NodeModel::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_has_one_auto_relay_and_no_directory() {
        let config = GatewayConfig::default();
        assert_eq!(config.sdn_url, None);
        assert_eq!(config.relays.as_deref(), Some("auto"));
        assert_eq!(config.relay_limit, Some(1));
        assert_eq!(config.data_dir(), PathBuf::from("./data"));
    }

    #[test]
    fn load_from_file_roundtrip() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"
                sdn_url = "https://sdn.example.net"
                data_dir = "/var/lib/gateway"
                relays = "1.1.1.1:1809, auto"
                relay_limit = 2
                protocol = "Ethereum"
                network = "BSC-Mainnet"
                source_version = "2.108.3.0"
            "#
        )
        .expect("write");

        let config = GatewayConfig::load_from_file(file.path()).expect("load");
        assert_eq!(config.sdn_url.as_deref(), Some("https://sdn.example.net"));
        assert_eq!(config.relay_limit, Some(2));
        assert_eq!(config.data_dir(), PathBuf::from("/var/lib/gateway"));

        let model = config.node_model();
        assert_eq!(model.network, "BSC-Mainnet");
        assert_eq!(model.source_version, "2.108.3.0");
        assert!(model.external_ip.is_empty());
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = GatewayConfig::load_from_file("/nonexistent/gateway.toml").unwrap_err();
        assert!(matches!(err, SdnError::Config(_)));
    }
}
