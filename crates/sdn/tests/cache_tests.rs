//! Cache-backed fetcher behavior: snapshot mirroring and directory-down
//! fallback.

mod common;

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use blockgate_sdn::cache::{load_cache_file, update_cache_file};
use blockgate_sdn::error::SdnError;
use blockgate_sdn::fetcher::CachedFetcher;
use blockgate_sdn::message::{BlockchainNetwork, Peer};
use reqwest::Method;

use common::*;

const SERVICE_UNAVAILABLE_BODY: &str = r#"{"message": "503 Service Unavailable"}"#;

fn unavailable_router(path: &str) -> Router {
    Router::new().route(
        path,
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, SERVICE_UNAVAILABLE_BODY) }),
    )
}

#[tokio::test]
async fn successful_response_is_mirrored_to_disk() {
    let data_dir = tempfile::tempdir().expect("tempdir");
    let router = Router::new().route(
        "/nodes/:id/:num/potential-relays",
        get(|| async {
            Json(vec![
                Peer {
                    ip: "8.208.101.30".to_string(),
                    port: 1809,
                },
                Peer {
                    ip: "47.90.133.153".to_string(),
                    port: 1809,
                },
            ])
        }),
    );
    let url = serve(router).await;

    let fetcher = CachedFetcher::new(MockCertStore::registered(), data_dir.path().into());
    let body = fetcher
        .get_with_cache(
            &format!("{url}/nodes/{TEST_NODE_ID}/5/potential-relays"),
            Method::GET,
            "potentialrelays.json",
            None,
        )
        .await
        .expect("fetch");

    let cached = load_cache_file(data_dir.path(), "potentialrelays.json").expect("cache file");
    assert_eq!(cached, body);
}

#[tokio::test]
async fn unavailable_directory_serves_the_snapshot() {
    let data_dir = tempfile::tempdir().expect("tempdir");
    let snapshot = br#"[{"ip":"8.208.101.30","port":1809}]"#;
    update_cache_file(data_dir.path(), "potentialrelays.json", snapshot).expect("seed cache");

    let url = serve(unavailable_router("/nodes/:id/:num/potential-relays")).await;
    let fetcher = CachedFetcher::new(MockCertStore::registered(), data_dir.path().into());
    let body = fetcher
        .get_with_cache(
            &format!("{url}/nodes/{TEST_NODE_ID}/5/potential-relays"),
            Method::GET,
            "potentialrelays.json",
            None,
        )
        .await
        .expect("fallback");
    assert_eq!(body, snapshot);
}

#[tokio::test]
async fn unavailable_directory_without_a_snapshot_is_fatal() {
    let data_dir = tempfile::tempdir().expect("tempdir");
    let url = serve(unavailable_router("/blockchain-networks")).await;
    let fetcher = CachedFetcher::new(MockCertStore::registered(), data_dir.path().into());
    let err = fetcher
        .get_with_cache(
            &format!("{url}/blockchain-networks"),
            Method::GET,
            "blockchainNetworks.json",
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SdnError::CacheMiss { .. }), "got {err}");
}

#[tokio::test]
async fn transport_error_on_get_falls_back_to_the_snapshot() {
    let data_dir = tempfile::tempdir().expect("tempdir");
    let snapshot = br#"{"network":"Mainnet","network_num":5}"#;
    update_cache_file(data_dir.path(), "blockchainNetwork.json", snapshot).expect("seed cache");

    // nothing listens on port 1
    let fetcher = CachedFetcher::new(MockCertStore::registered(), data_dir.path().into());
    let body = fetcher
        .get_with_cache(
            "http://127.0.0.1:1/blockchain-networks/5",
            Method::GET,
            "blockchainNetwork.json",
            None,
        )
        .await
        .expect("fallback");
    assert_eq!(body, snapshot);
}

#[tokio::test]
async fn transport_error_on_post_does_not_fall_back() {
    let data_dir = tempfile::tempdir().expect("tempdir");
    update_cache_file(data_dir.path(), "nodemodel.json", b"{}").expect("seed cache");

    let fetcher = CachedFetcher::new(MockCertStore::registered(), data_dir.path().into());
    let err = fetcher
        .get_with_cache(
            "http://127.0.0.1:1/nodes",
            Method::POST,
            "nodemodel.json",
            Some(b"{}".to_vec()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SdnError::Transport(_)), "got {err}");
}

#[tokio::test]
async fn fetch_all_blockchain_networks_recovers_from_a_503() {
    let data_dir = tempfile::tempdir().expect("tempdir");
    let cached_networks = vec![
        BlockchainNetwork {
            network: "Mainnet".to_string(),
            protocol: "Ethereum".to_string(),
            network_num: 5,
            allowed_from_tier: "Developer".to_string(),
            send_cross_geo: true,
            ..BlockchainNetwork::default()
        },
        BlockchainNetwork {
            network: "BSC-Mainnet".to_string(),
            protocol: "Ethereum".to_string(),
            network_num: 10,
            allowed_from_tier: "Enterprise".to_string(),
            send_cross_geo: true,
            ..BlockchainNetwork::default()
        },
    ];
    update_cache_file(
        data_dir.path(),
        "blockchainNetworks.json",
        &serde_json::to_vec(&cached_networks).expect("serialize"),
    )
    .expect("seed cache");

    let url = serve(unavailable_router("/blockchain-networks")).await;
    let sdn = session(&url, data_dir.path(), test_node_model()).await;

    sdn.fetch_all_blockchain_networks().await.expect("fallback");
    let networks = sdn.networks();
    assert_eq!(networks.len(), 2);
    assert_eq!(networks[&5].network, "Mainnet");
    assert_eq!(networks[&5].allowed_from_tier, "Developer");
    assert_eq!(networks[&10].network, "BSC-Mainnet");
    // the sentinel applies on the cache path too
    assert_eq!(
        networks[&5].default_attributes.terminal_total_difficulty,
        i64::MAX as f64
    );
}

#[tokio::test]
async fn register_recovers_from_a_503_with_a_cached_model() {
    let data_dir = tempfile::tempdir().expect("tempdir");
    let mut cached = test_node_model();
    cached.blockchain_network_num = 5;
    update_cache_file(
        data_dir.path(),
        "nodemodel.json",
        &serde_json::to_vec(&cached).expect("serialize"),
    )
    .expect("seed cache");

    let router = Router::new().route(
        "/nodes",
        axum::routing::post(|| async {
            (StatusCode::SERVICE_UNAVAILABLE, SERVICE_UNAVAILABLE_BODY)
        }),
    );
    let url = serve(router).await;

    let sdn = session(&url, data_dir.path(), test_node_model()).await;
    sdn.register().await.expect("register from snapshot");
    assert_eq!(sdn.node_id(), TEST_NODE_ID);
    assert_eq!(sdn.network_num(), 5);
}
