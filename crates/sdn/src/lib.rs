//! # Blockgate SDN Crate
//!
//! Control-plane client of the blockgate gateway: registers the local node
//! with the directory service ("SDN"), keeps its configuration (node model,
//! account, blockchain networks) current, discovers candidate relays, probes
//! them for latency, and drives the data plane toward the fastest viable
//! connection set through a stream of [`RelayInstruction`]s.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          SdnHttp                              │
//! │                                                               │
//! │  session ───────▶ CachedFetcher ───────▶ SDN (HTTPS, mTLS)    │
//! │   register            │    ▲                                  │
//! │   fetch networks      ▼    │ 503 / transport error            │
//! │   fetch accounts   <dataDir>/*.json  (disk snapshot)          │
//! │                                                               │
//! │  controller ────▶ LatencyProber (ping)                        │
//! │   parse relay spec                                            │
//! │   bootstrap / re-rank / recover                               │
//! │        │                                                      │
//! │        ├── writes ──▶ IgnoredRelays (shared SyncMap)          │
//! │        └── sends ───▶ mpsc<RelayInstruction> ──▶ data plane   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The ignored-relays map is the single source of truth for what the
//! gateway is attached to; the controller records intent there *before*
//! emitting the matching instruction, so it never depends on how fast the
//! data plane consumes the channel.

pub mod auth;
pub mod cache;
pub mod cert;
pub mod config;
pub mod controller;
pub mod error;
pub mod fetcher;
pub mod message;
pub mod prober;
pub mod resolver;
pub mod session;

pub use auth::account_id_and_secret_from_header;
pub use cert::CertStore;
pub use config::GatewayConfig;
pub use controller::{
    ConnInstructionType, IgnoredRelays, RelayInstruction, DEFAULT_RELAY_PORT,
};
pub use error::SdnError;
pub use fetcher::CachedFetcher;
pub use message::{
    Account, BlockchainNetwork, BlockchainNetworks, NodeEvent, NodeModel, Peer,
    Peers, QuotaResponse,
};
pub use prober::{LatencyProber, NodeLatency, PingProber, PING_TIMEOUT};
pub use resolver::{IpResolver, PublicIpResolver, PUBLIC_IP_RESOLVER_URL};
pub use session::SdnHttp;
