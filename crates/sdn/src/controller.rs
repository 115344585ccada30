//! Relay selection and connection management.
//!
//! The controller turns a user relay spec, the directory's candidate list,
//! and live latency measurements into a monotone stream of
//! [`RelayInstruction`]s for the data plane:
//!
//! - [`SdnHttp::direct_relay_connections`] parses the spec, connects the
//!   static relays, and spawns a background task that fills the `auto`
//!   slots with the lowest-latency candidates.
//! - [`SdnHttp::find_fastest_relays`] re-probes on an external cadence and
//!   emits `Switch` instructions when a connected auto relay is at least
//!   [`LATENCY_THRESHOLD`] ms slower than an available candidate.
//! - [`SdnHttp::find_new_relay`] replaces a relay the data plane reported
//!   dead, retrying every `RELAY_MONITOR_INTERVAL` until shutdown.
//!
//! All three record intent in the shared ignored-relays map *before*
//! emitting the matching instruction. Static relays are never the subject
//! of a `Switch`, and no IP receives a second `Connect` without an
//! intervening `is_connected = false` transition.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use blockgate_common::types::{RelayInfo, RELAY_MONITOR_INTERVAL};
use blockgate_common::SyncMap;
use tokio::sync::mpsc;
use tokio::sync::Notify;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::error::SdnError;
use crate::message::Peers;
use crate::prober::NodeLatency;
use crate::session::SdnHttp;

/// Port assumed for relay spec tokens that do not name one.
pub const DEFAULT_RELAY_PORT: i64 = 1809;

/// A connected relay must be at least this many milliseconds slower than a
/// candidate before the controller asks the data plane to switch.
const LATENCY_THRESHOLD: f64 = 10.0;

/// Auto relays slower than this get a warning when selected.
const SLOW_RELAY_WARNING_MS: f64 = 40.0;

/// The shared bookkeeping map tracking every relay the controller has acted
/// upon, keyed by IP. Its identity is shared with the data plane — never
/// copy it.
pub type IgnoredRelays = Arc<SyncMap<String, RelayInfo>>;

/// Whether the data plane should connect, disconnect, or switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnInstructionType {
    Connect,
    Disconnect,
    Switch,
}

/// One instruction to the data plane about the relay at `ip:port`.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayInstruction {
    pub ip: String,
    pub port: i64,
    pub kind: ConnInstructionType,
    pub is_static: bool,
    /// For `Switch`: replacement candidates in ascending latency order;
    /// consumers pick top-of-list.
    pub relays_to_switch: Vec<NodeLatency>,
}

impl RelayInstruction {
    fn connect(ip: String, port: i64, is_static: bool) -> Self {
        Self {
            ip,
            port,
            kind: ConnInstructionType::Connect,
            is_static,
            relays_to_switch: Vec::new(),
        }
    }

    fn switch(ip: String, port: i64, relays_to_switch: Vec<NodeLatency>) -> Self {
        Self {
            ip,
            port,
            kind: ConnInstructionType::Switch,
            is_static: false,
            relays_to_switch,
        }
    }
}

/// Resolves `host` to an IP string. IP literals pass through; DNS names are
/// replaced with their first record, preferring IPv4, and the resolved
/// address is looked up once more as a validation roundtrip.
pub async fn get_ip(host: &str) -> Result<String, SdnError> {
    if host.parse::<IpAddr>().is_ok() {
        return Ok(host.to_string());
    }

    let addrs = tokio::net::lookup_host((host, 0))
        .await
        .map_err(|err| SdnError::InvalidHost {
            host: host.to_string(),
            reason: err.to_string(),
        })?
        .collect::<Vec<_>>();
    let resolved = addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .ok_or_else(|| SdnError::NoAddresses(host.to_string()))?
        .ip()
        .to_string();

    tokio::net::lookup_host((resolved.as_str(), 0))
        .await
        .map_err(|err| SdnError::InvalidHost {
            host: host.to_string(),
            reason: err.to_string(),
        })?;

    Ok(resolved)
}

/// Parses the comma-separated relay spec into explicit `(ip, port)` pairs
/// (first spec wins on duplicate IPs) and a count of `auto` placeholders.
/// Parsing halts once the explicit relays plus auto slots reach
/// `relay_limit`.
pub(crate) async fn parse_relay_spec(
    relay_hosts: &str,
    relay_limit: u64,
) -> Result<(Vec<(String, i64)>, usize), SdnError> {
    if relay_hosts.is_empty() {
        return Err(SdnError::MissingRelaySpec);
    }

    let mut override_relays: Vec<(String, i64)> = Vec::new();
    let mut auto_count = 0usize;

    for token in relay_hosts.split(',') {
        // only unique relays and auto slots count toward the limit
        if override_relays.len() + auto_count == relay_limit as usize {
            break;
        }
        let token = token.trim();
        if token == "auto" {
            auto_count += 1;
            continue;
        }
        if token.is_empty() {
            return Err(SdnError::EmptyRelayToken);
        }

        let parts: Vec<&str> = token.split(':').collect();
        if parts.len() > 2 {
            return Err(SdnError::MalformedRelay(token.to_string()));
        }
        let host = parts[0];
        let port = if parts.len() == 2 {
            parts[1]
                .parse::<i64>()
                .map_err(|source| SdnError::InvalidRelayPort {
                    port: parts[1].to_string(),
                    source,
                })?
        } else {
            DEFAULT_RELAY_PORT
        };

        let ip = match get_ip(host).await {
            Ok(ip) => ip,
            Err(err) => {
                error!("relay {} from --relays is not valid: {}", host, err);
                return Err(err);
            }
        };
        if !override_relays.iter().any(|(existing, _)| existing == &ip) {
            override_relays.push((ip, port));
        }
    }

    Ok((override_relays, auto_count))
}

fn log_selected_latency(selected: &NodeLatency) {
    if selected.latency > SLOW_RELAY_WARNING_MS {
        warn!(
            "ping latency of the fastest relay {}:{} is {} ms, which is more than {} ms",
            selected.ip, selected.port, selected.latency, SLOW_RELAY_WARNING_MS
        );
    }
    info!(
        "fastest selected relay {}:{} has a latency of {} ms",
        selected.ip, selected.port, selected.latency
    );
}

/// Connected auto relays: entries of the ignored map with
/// `is_connected && !is_static`.
fn auto_connected_relays(ignored_relays: &IgnoredRelays) -> HashMap<String, RelayInfo> {
    let mut connected = HashMap::new();
    ignored_relays.range(|ip, info| {
        if info.is_connected && !info.is_static {
            connected.insert(ip.clone(), info.clone());
        }
        true
    });
    connected
}

/// Splits probe results: measurements of already-connected auto relays
/// update their stored latency in place, everything else is an available
/// candidate (still in ascending latency order).
fn fastest_available_relays(
    ping_latencies: &[NodeLatency],
    connected_auto_relays: &mut HashMap<String, RelayInfo>,
) -> Vec<NodeLatency> {
    let mut available = Vec::new();
    for ping in ping_latencies {
        if let Some(info) = connected_auto_relays.get_mut(&ping.ip) {
            info.latency = ping.latency;
            continue;
        }
        available.push(ping.clone());
    }
    available
}

/// For each connected auto relay, worst latency first, collects the prefix
/// of available candidates that are faster by at least
/// [`LATENCY_THRESHOLD`]. Relays whose fastest candidate does not clear the
/// threshold are skipped entirely — the candidate list is sorted, so no
/// later candidate can clear it either.
fn relays_to_switch(
    connected_auto_relays: &HashMap<String, RelayInfo>,
    fastest_available: &[NodeLatency],
) -> Vec<(String, i64, Vec<NodeLatency>)> {
    let mut by_latency: Vec<(&String, &RelayInfo)> =
        connected_auto_relays.iter().collect();
    by_latency.sort_by(|a, b| b.1.latency.total_cmp(&a.1.latency));

    let mut switches = Vec::new();
    for (ip, info) in by_latency {
        let mut targets = Vec::new();
        for candidate in fastest_available {
            if info.latency < candidate.latency + LATENCY_THRESHOLD {
                break;
            }
            targets.push(candidate.clone());
        }
        if !targets.is_empty() {
            switches.push((ip.clone(), info.port, targets));
        }
    }
    switches
}

impl SdnHttp {
    /// Bootstraps the gateway's relay set from the user spec.
    ///
    /// Static relays are recorded in `ignored_relays` and connected
    /// immediately; `auto` slots are filled by a spawned background task
    /// walking the directory's candidates in ascending latency order.
    /// Returns without emitting anything on a bad spec, and with
    /// [`SdnError::NoRelays`] when auto slots exist but the directory has
    /// no candidates.
    pub async fn direct_relay_connections(
        self: &Arc<Self>,
        relay_hosts: &str,
        relay_limit: u64,
        relay_instructions: mpsc::Sender<RelayInstruction>,
        ignored_relays: IgnoredRelays,
    ) -> Result<(), SdnError> {
        let (override_relays, auto_count) =
            parse_relay_spec(relay_hosts, relay_limit).await?;

        // intent goes into the map before the instruction goes down the
        // channel, so the data plane can never observe an unknown relay
        for (ip, port) in override_relays {
            ignored_relays.store(
                ip.clone(),
                RelayInfo {
                    time_added: Instant::now(),
                    port,
                    is_connected: true,
                    is_static: true,
                    latency: 0.0,
                },
            );
            relay_instructions
                .send(RelayInstruction::connect(ip, port, true))
                .await
                .map_err(|_| SdnError::InstructionChannelClosed)?;
        }

        if auto_count == 0 {
            return Ok(());
        }

        let relays = self
            .get_relays()
            .await
            .map_err(|source| SdnError::RelayList {
                source: Box::new(source),
            })?;
        if relays.is_empty() {
            return Err(SdnError::NoRelays);
        }

        let sdn = Arc::clone(self);
        tokio::spawn(async move {
            sdn.manage_auto_relays(auto_count, relay_instructions, relays, ignored_relays)
                .await;
        });
        Ok(())
    }

    /// Connects up to `auto_relay_count` auto relays from `relays`, fastest
    /// first. Relays already present in `ignored_relays` are skipped — they
    /// are either still connected or recently retired. Logs and returns on
    /// shortfall; the caller drives retries.
    pub(crate) async fn manage_auto_relays(
        &self,
        auto_relay_count: usize,
        relay_instructions: mpsc::Sender<RelayInstruction>,
        relays: Peers,
        ignored_relays: IgnoredRelays,
    ) {
        let ping_latencies = self.prober().probe(&relays).await;
        if ping_latencies.is_empty() {
            error!("ping latencies not found for relays from SDN");
            return;
        }

        let mut connected = 0usize;
        for ping in &ping_latencies {
            let relay_ip = match get_ip(&ping.ip).await {
                Ok(ip) => ip,
                Err(err) => {
                    error!(
                        "relay {} from the SDN does not have a valid IP address: {}",
                        ping.ip, err
                    );
                    continue;
                }
            };
            // only connect if not already connected to or recently retired
            let (_, loaded) = ignored_relays.load_or_store(
                relay_ip.clone(),
                RelayInfo {
                    time_added: Instant::now(),
                    port: ping.port,
                    is_connected: true,
                    is_static: false,
                    latency: 0.0,
                },
            );
            if loaded {
                continue;
            }

            log_selected_latency(ping);
            if relay_instructions
                .send(RelayInstruction::connect(relay_ip, ping.port, false))
                .await
                .is_err()
            {
                error!("relay instruction channel closed, stopping auto relay selection");
                return;
            }

            connected += 1;
            if connected == auto_relay_count {
                return;
            }
        }
        error!(
            "available SDN relays {}; requested auto count {}",
            connected, auto_relay_count
        );
    }

    /// Periodic re-evaluation: re-probes the candidate set and emits one
    /// `Switch` per connected auto relay that is at least
    /// [`LATENCY_THRESHOLD`] ms slower than some available candidate,
    /// worst-connected relay first. Never touches static relays and never
    /// mutates `ignored_relays` — the data plane flips `is_connected` when
    /// a switch completes.
    pub async fn find_fastest_relays(
        &self,
        relay_instructions: &mpsc::Sender<RelayInstruction>,
        ignored_relays: &IgnoredRelays,
    ) {
        let relays = match self.get_relays().await {
            Ok(relays) => relays,
            Err(err) => {
                error!("failed to fetch the candidate relay list: {}", err);
                return;
            }
        };
        let ping_latencies = self.prober().probe(&relays).await;
        if ping_latencies.is_empty() {
            error!("ping latencies not found for relays from SDN");
            return;
        }

        let mut connected_auto_relays = auto_connected_relays(ignored_relays);
        let fastest_available =
            fastest_available_relays(&ping_latencies, &mut connected_auto_relays);

        for (ip, port, targets) in
            relays_to_switch(&connected_auto_relays, &fastest_available)
        {
            if relay_instructions
                .send(RelayInstruction::switch(ip, port, targets))
                .await
                .is_err()
            {
                error!("relay instruction channel closed while emitting switch instructions");
                return;
            }
        }
    }

    async fn connect_to_new_relay(
        &self,
        relay_instructions: &mpsc::Sender<RelayInstruction>,
        ignored_relays: &IgnoredRelays,
    ) -> Result<(), SdnError> {
        let relays = self
            .get_relays()
            .await
            .map_err(|source| SdnError::RelayList {
                source: Box::new(source),
            })?;
        if relays.is_empty() {
            return Err(SdnError::NoRelays);
        }
        self.manage_auto_relays(1, relay_instructions.clone(), relays, ignored_relays.clone())
            .await;
        Ok(())
    }

    /// Failure recovery: the data plane reports a dead relay, the entry is
    /// overwritten as disconnected, and the loop hunts for a replacement
    /// until one is found or `shutdown` fires. Between failed rounds
    /// (directory down, no candidates) it sleeps `RELAY_MONITOR_INTERVAL`.
    pub async fn find_new_relay(
        self: Arc<Self>,
        old_relay_ip: String,
        old_relay_port: i64,
        relay_instructions: mpsc::Sender<RelayInstruction>,
        ignored_relays: IgnoredRelays,
        shutdown: Arc<Notify>,
    ) {
        error!("relay {} is not reachable, switching relay", old_relay_ip);
        ignored_relays.store(
            old_relay_ip,
            RelayInfo {
                time_added: Instant::now(),
                port: old_relay_port,
                is_connected: false,
                is_static: false,
                latency: 0.0,
            },
        );
        loop {
            match self
                .connect_to_new_relay(&relay_instructions, &ignored_relays)
                .await
            {
                Ok(()) => return,
                Err(err) => {
                    error!("error while trying to reconnect to another relay: {}", err)
                }
            }

            tokio::select! {
                _ = shutdown.notified() => return,
                _ = sleep(RELAY_MONITOR_INTERVAL) => {}
            }
        }
    }
}
