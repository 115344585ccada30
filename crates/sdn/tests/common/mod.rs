//! Shared fixtures for the integration tests: an axum mock directory on an
//! ephemeral port, plus canned cert-store / resolver / prober fakes.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use blockgate_common::types::{AccountId, NodeId};
use blockgate_sdn::cert::CertStore;
use blockgate_sdn::error::SdnError;
use blockgate_sdn::message::{NodeModel, Peers};
use blockgate_sdn::prober::{LatencyProber, NodeLatency};
use blockgate_sdn::resolver::IpResolver;
use blockgate_sdn::session::SdnHttp;
use parking_lot::Mutex;

pub const TEST_NODE_ID: &str = "35299c61-55ad-4565-85a3-0cd985953fac";
pub const TEST_ACCOUNT_ID: &str = "34ff3406-cc74-4cc7-9d9a-9ef8bdda59b1";

/// Serves `router` on an ephemeral localhost port and returns its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock directory");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve mock directory");
    });
    format!("http://{addr}")
}

/// Cert store fake. Starts either registered (private cert on hand) or
/// unregistered (registration cert only); `save_private_cert` records the
/// issued certificate and flips the store to registered.
pub struct MockCertStore {
    needs_private: AtomicBool,
    saved_cert: Mutex<Option<String>>,
}

impl MockCertStore {
    pub fn registered() -> Arc<Self> {
        Arc::new(Self {
            needs_private: AtomicBool::new(false),
            saved_cert: Mutex::new(None),
        })
    }

    pub fn unregistered() -> Arc<Self> {
        Arc::new(Self {
            needs_private: AtomicBool::new(true),
            saved_cert: Mutex::new(None),
        })
    }

    pub fn saved_cert(&self) -> Option<String> {
        self.saved_cert.lock().clone()
    }
}

impl CertStore for MockCertStore {
    fn needs_private_cert(&self) -> bool {
        self.needs_private.load(Ordering::SeqCst)
    }

    fn create_csr(&self) -> Result<String, SdnError> {
        Ok("-----BEGIN CERTIFICATE REQUEST-----\nMIIB\n-----END CERTIFICATE REQUEST-----\n"
            .to_string())
    }

    fn node_id(&self) -> Result<NodeId, SdnError> {
        Ok(TEST_NODE_ID.to_string())
    }

    fn account_id(&self) -> Result<AccountId, SdnError> {
        Ok(TEST_ACCOUNT_ID.to_string())
    }

    fn save_private_cert(&self, cert_pem: &str) -> Result<(), SdnError> {
        *self.saved_cert.lock() = Some(cert_pem.to_string());
        self.needs_private.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn registration_identity(&self) -> Result<Option<reqwest::Identity>, SdnError> {
        Ok(None)
    }

    fn private_identity(&self) -> Result<Option<reqwest::Identity>, SdnError> {
        Ok(None)
    }
}

/// Resolver fake returning a fixed address.
pub struct StaticIpResolver(pub String);

#[async_trait]
impl IpResolver for StaticIpResolver {
    async fn public_ip(&self) -> Result<String, SdnError> {
        Ok(self.0.clone())
    }
}

pub fn resolver(ip: &str) -> Arc<StaticIpResolver> {
    Arc::new(StaticIpResolver(ip.to_string()))
}

/// Prober fake returning canned, pre-sorted measurements.
pub struct StaticProber(pub Vec<NodeLatency>);

#[async_trait]
impl LatencyProber for StaticProber {
    async fn probe(&self, _peers: &Peers) -> Vec<NodeLatency> {
        self.0.clone()
    }
}

pub fn latency(ip: &str, port: i64, ms: f64) -> NodeLatency {
    NodeLatency {
        ip: ip.to_string(),
        port,
        latency: ms,
    }
}

/// A registered node model like the directory would hand back.
pub fn test_node_model() -> NodeModel {
    NodeModel {
        node_id: TEST_NODE_ID.to_string(),
        account_id: TEST_ACCOUNT_ID.to_string(),
        external_ip: "11.113.164.111".to_string(),
        protocol: "Ethereum".to_string(),
        network: "Mainnet".to_string(),
        node_type: "EXTERNAL_GATEWAY".to_string(),
        ..NodeModel::default()
    }
}

/// Session against `sdn_url` with a registered cert store and a fixed
/// public IP.
pub async fn session(
    sdn_url: &str,
    data_dir: &std::path::Path,
    node_model: NodeModel,
) -> SdnHttp {
    SdnHttp::new(
        MockCertStore::registered(),
        sdn_url,
        node_model,
        data_dir,
        resolver("11.111.111.111"),
    )
    .await
    .expect("session")
}
