//! Latency probing of candidate relay peers.
//!
//! One best-effort ICMP measurement per peer, all peers probed in parallel,
//! wall-clock bounded by the per-packet wait rather than the list size.
//! Unreachable peers keep the [`PING_TIMEOUT`] sentinel so every input peer
//! appears in the output exactly once.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tracing::{error, info, trace};

use crate::message::{Peer, Peers};

/// Latency sentinel for peers that did not answer, in milliseconds.
pub const PING_TIMEOUT: f64 = 2000.0;

/// Captures the RTT from a ping summary line. Matches the value after `=`
/// up to the next `/`, which covers both the iputils
/// (`rtt min/avg/max/mdev = 1.4/...`) and BSD
/// (`round-trip min/avg/max/stddev = 13.9/...`) output formats.
const TIME_REGEX: &str = "= ([^/]*)";

fn rtt_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TIME_REGEX).expect("static regex"))
}

/// Ping measurement for a single peer.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeLatency {
    pub ip: String,
    pub port: i64,
    /// Round-trip latency in milliseconds; [`PING_TIMEOUT`] when the peer
    /// did not answer.
    pub latency: f64,
}

/// Capability producing a latency-sorted measurement per peer.
///
/// The returned vector is sorted ascending by latency and holds one entry
/// per input peer.
#[async_trait]
pub trait LatencyProber: Send + Sync {
    async fn probe(&self, peers: &Peers) -> Vec<NodeLatency>;
}

/// Prober shelling out to the system `ping` (one packet, 2 s wait).
pub struct PingProber;

#[async_trait]
impl LatencyProber for PingProber {
    async fn probe(&self, peers: &Peers) -> Vec<NodeLatency> {
        let mut handles = Vec::with_capacity(peers.len());
        for peer in peers {
            handles.push(tokio::spawn(ping_peer(peer.clone())));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(err) => error!("ping task failed: {}", err),
            }
        }
        results.sort_by(|a, b| a.latency.total_cmp(&b.latency));
        info!("latency results for potential relays: {:?}", results);
        results
    }
}

async fn ping_peer(peer: Peer) -> NodeLatency {
    let mut result = NodeLatency {
        ip: peer.ip,
        port: peer.port,
        latency: PING_TIMEOUT,
    };

    let output = Command::new("ping")
        .arg(&result.ip)
        .args(["-c1", "-W2"])
        .output()
        .await;
    let output = match output {
        Ok(output) => output,
        Err(err) => {
            error!("error executing ping {}: {}", result.ip, err);
            return result;
        }
    };
    if !output.status.success() {
        error!(
            "ping {} exited with {}: {}",
            result.ip,
            output.status,
            String::from_utf8_lossy(&output.stderr)
        );
        return result;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    trace!("ping results from {}: {:?}", result.ip, stdout);
    if let Some(rtt) = parse_ping_rtt(&stdout) {
        result.latency = rtt;
    }
    result
}

/// Pulls the minimum RTT out of ping's summary line. Any parse failure
/// leaves the caller on the timeout sentinel.
fn parse_ping_rtt(stdout: &str) -> Option<f64> {
    let captures = rtt_regex().captures(stdout)?;
    let rtt: f64 = captures.get(1)?.as_str().trim().parse().ok()?;
    (rtt > 0.0).then_some(rtt)
}
