//! Directory session.
//!
//! [`SdnHttp`] owns the node's identity state: the registered node model,
//! the blockchain-network table, and the account record. All of it is
//! written rarely (registration, explicit refreshes) and read often, so a
//! read-write lock per piece is enough; locks are never held across awaits.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use blockgate_common::types::{AccountId, NetworkNum, NodeId};
use parking_lot::RwLock;
use reqwest::Method;
use tracing::{debug, error, info, warn};

use crate::cert::CertStore;
use crate::config::GatewayConfig;
use crate::error::SdnError;
use crate::fetcher::CachedFetcher;
use crate::message::{
    Account, AccountTier, BlockchainNetwork, BlockchainNetworks, NodeEvent,
    NodeModel, Peers, QuotaRequest, QuotaResponse,
};
use crate::prober::{LatencyProber, PingProber};
use crate::resolver::IpResolver;

const BLOCKCHAIN_NETWORKS_CACHE_FILE: &str = "blockchainNetworks.json";
const BLOCKCHAIN_NETWORK_CACHE_FILE: &str = "blockchainNetwork.json";
const NODE_MODEL_CACHE_FILE: &str = "nodemodel.json";
const POTENTIAL_RELAYS_CACHE_FILE: &str = "potentialrelays.json";
const ACCOUNT_MODEL_CACHE_FILE: &str = "accountmodel.json";

/// Fallback transaction age when the network record is not loaded.
const DEFAULT_MIN_TX_AGE: Duration = Duration::from_secs(2);

/// Which account endpoint a lookup goes through.
enum AccountEndpoint {
    /// `/account/<id>` — the node's own account, cached.
    Own,
    /// `/accounts/<id>` — a customer account, never cached.
    Customer,
}

impl AccountEndpoint {
    fn path(&self) -> &'static str {
        match self {
            AccountEndpoint::Own => "account",
            AccountEndpoint::Customer => "accounts",
        }
    }
}

/// A connection to the directory service.
pub struct SdnHttp {
    cert_store: Arc<dyn CertStore>,
    fetcher: CachedFetcher,
    prober: Arc<dyn LatencyProber>,
    sdn_url: String,
    node_id: RwLock<NodeId>,
    account_id: RwLock<AccountId>,
    node_model: RwLock<NodeModel>,
    networks: RwLock<BlockchainNetworks>,
    account_model: RwLock<Option<Account>>,
}

impl std::fmt::Debug for SdnHttp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdnHttp")
            .field("sdn_url", &self.sdn_url)
            .field("node_id", &self.node_id)
            .field("account_id", &self.account_id)
            .finish_non_exhaustive()
    }
}

impl SdnHttp {
    /// Creates a session. When `node_model.external_ip` is empty the
    /// injected resolver supplies the node's externally visible address.
    pub async fn new(
        cert_store: Arc<dyn CertStore>,
        sdn_url: impl Into<String>,
        mut node_model: NodeModel,
        data_dir: impl Into<PathBuf>,
        resolver: Arc<dyn IpResolver>,
    ) -> Result<Self, SdnError> {
        if node_model.external_ip.is_empty() {
            let external_ip = resolver.public_ip().await?;
            if external_ip.is_empty() {
                return Err(SdnError::PublicIp(
                    "resolver returned an empty address, consider configuring external_ip"
                        .to_string(),
                ));
            }
            info!(
                "no external ip address was provided, using autodiscovered address {}",
                external_ip
            );
            node_model.external_ip = external_ip;
        }

        Ok(Self {
            fetcher: CachedFetcher::new(Arc::clone(&cert_store), data_dir.into()),
            cert_store,
            prober: Arc::new(PingProber),
            sdn_url: sdn_url.into(),
            node_id: RwLock::new(node_model.node_id.clone()),
            account_id: RwLock::new(node_model.account_id.clone()),
            node_model: RwLock::new(node_model),
            networks: RwLock::new(BlockchainNetworks::new()),
            account_model: RwLock::new(None),
        })
    }

    /// Creates a session from a [`GatewayConfig`]. The config may leave
    /// every field unset, but a session cannot exist without a directory,
    /// so a missing `sdn_url` is rejected here.
    pub async fn from_config(
        config: &GatewayConfig,
        cert_store: Arc<dyn CertStore>,
        resolver: Arc<dyn IpResolver>,
    ) -> Result<Self, SdnError> {
        let sdn_url = config
            .sdn_url
            .clone()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| SdnError::Config("sdn_url is not configured".to_string()))?;
        Self::new(
            cert_store,
            sdn_url,
            config.node_model(),
            config.data_dir(),
            resolver,
        )
        .await
    }

    /// Replaces the latency prober. Tests use this to substitute canned
    /// measurements for live ICMP.
    pub fn with_prober(mut self, prober: Arc<dyn LatencyProber>) -> Self {
        self.prober = prober;
        self
    }

    pub(crate) fn prober(&self) -> &Arc<dyn LatencyProber> {
        &self.prober
    }

    /// Registers the node with the directory.
    ///
    /// While a private certificate is still needed, a CSR is generated and
    /// embedded in the posted model; the certificate issued in response is
    /// persisted through the store. The response patches the local model
    /// (directory-assigned `node_id`, corrected `blockchain_network_num`).
    ///
    /// Panics when persisting the issued certificate fails: at that point
    /// the on-disk state is inconsistent with the directory's view and the
    /// node must not continue.
    pub async fn register(&self) -> Result<(), SdnError> {
        let needs_private_cert = self.cert_store.needs_private_cert();
        if needs_private_cert {
            debug!("new private certificate needed, appending csr to node registration");
            let csr = self.cert_store.create_csr()?;
            self.node_model.write().csr = csr;
        } else {
            *self.node_id.write() = self.cert_store.node_id()?;
        }

        {
            let model = self.node_model.read();
            if model.node_id.is_empty() {
                debug!(
                    "registering with SDN as {} with IP '{}' and version '{}'",
                    model.node_type, model.external_ip, model.source_version
                );
            } else {
                debug!(
                    "registering with SDN as {} with node ID '{}' and version '{}'",
                    model.node_type, model.node_id, model.source_version
                );
            }
        }

        let payload = self.node_model.read().pack()?;
        let response = self
            .fetcher
            .get_with_cache(
                &format!("{}/nodes", self.sdn_url),
                Method::POST,
                NODE_MODEL_CACHE_FILE,
                Some(payload),
            )
            .await?;
        let registered: NodeModel = serde_json::from_slice(&response).map_err(|source| {
            SdnError::Deserialize {
                body: String::from_utf8_lossy(&response).into_owned(),
                source,
            }
        })?;

        *self.node_id.write() = registered.node_id.clone();
        let issued_cert = registered.cert.clone();
        *self.node_model.write() = registered;
        *self.account_id.write() = self.cert_store.account_id()?;

        if needs_private_cert {
            let cert = issued_cert.unwrap_or_default();
            if let Err(err) = self.cert_store.save_private_cert(&cert) {
                // the SDN believes this node holds the issued certificate;
                // continuing without it leaves unrecoverable on-disk state
                panic!("could not persist the private certificate issued on registration: {err}");
            }
        }
        Ok(())
    }

    /// True iff the node still has to register before serving: no node ID
    /// yet, or no private certificate yet.
    pub fn needs_registration(&self) -> bool {
        self.node_id.read().is_empty() || self.cert_store.needs_private_cert()
    }

    /// Fetches everything the gateway needs to start: registration, the
    /// registered blockchain network, and the account model. Any step's
    /// failure aborts the sequence.
    pub async fn init_gateway(
        &self,
        protocol: impl Into<String>,
        network: impl Into<String>,
    ) -> Result<(), SdnError> {
        {
            let mut model = self.node_model.write();
            model.protocol = protocol.into();
            model.network = network.into();
        }
        self.networks.write().clear();

        self.register().await?;
        self.fetch_blockchain_network().await?;
        let account_id = self.node_model.read().account_id.clone();
        self.fetch_account_model(&account_id).await
    }

    /// GET `/blockchain-networks`: replaces the in-memory network table.
    pub async fn fetch_all_blockchain_networks(&self) -> Result<(), SdnError> {
        let url = format!("{}/blockchain-networks", self.sdn_url);
        let response = self
            .fetcher
            .get_with_cache(&url, Method::GET, BLOCKCHAIN_NETWORKS_CACHE_FILE, None)
            .await?;
        let networks: Vec<BlockchainNetwork> = serde_json::from_slice(&response)
            .map_err(|source| SdnError::Deserialize {
                body: String::from_utf8_lossy(&response).into_owned(),
                source,
            })?;

        let mut table = BlockchainNetworks::new();
        for mut network in networks {
            network.apply_ttd_sentinel();
            table.insert(network.network_num, network);
        }
        *self.networks.write() = table;
        Ok(())
    }

    /// GET `/blockchain-networks/<networkNum>` for the registered network,
    /// merging the result into the table.
    pub async fn fetch_blockchain_network(&self) -> Result<(), SdnError> {
        let network_num = self.network_num();
        let url = format!("{}/blockchain-networks/{}", self.sdn_url, network_num);
        let response = self
            .fetcher
            .get_with_cache(&url, Method::GET, BLOCKCHAIN_NETWORK_CACHE_FILE, None)
            .await?;
        let mut network: BlockchainNetwork = serde_json::from_slice(&response)
            .map_err(|source| SdnError::Deserialize {
                body: String::from_utf8_lossy(&response).into_owned(),
                source,
            })?;
        network.apply_ttd_sentinel();

        let mut networks = self.networks.write();
        if let Some(previous) = networks.get(&network_num) {
            if previous.min_tx_age_seconds != network.min_tx_age_seconds {
                debug!(
                    "min_tx_age_seconds changed from {} to {} after the update",
                    previous.min_tx_age_seconds, network.min_tx_age_seconds
                );
            }
        }
        networks.insert(network_num, network);
        Ok(())
    }

    async fn account_model_with_endpoint(
        &self,
        account_id: &AccountId,
        endpoint: AccountEndpoint,
    ) -> Result<Account, SdnError> {
        let url = format!("{}/{}/{}", self.sdn_url, endpoint.path(), account_id);
        // customer lookups bypass the cache so a stale snapshot of one
        // account can never impersonate another
        let response = match endpoint {
            AccountEndpoint::Own => {
                self.fetcher
                    .get_with_cache(&url, Method::GET, ACCOUNT_MODEL_CACHE_FILE, None)
                    .await?
            }
            AccountEndpoint::Customer => {
                self.fetcher.request(&url, Method::GET, None).await?
            }
        };
        let account: Account = serde_json::from_slice(&response).map_err(|source| {
            SdnError::Deserialize {
                body: String::from_utf8_lossy(&response).into_owned(),
                source,
            }
        })?;
        Ok(account.fill_defaults())
    }

    /// Loads the node's own account model, normalizing its quotas: a relay
    /// limit of 0 becomes 1, a max-allowed-nodes limit of 0 becomes 6.
    pub async fn fetch_account_model(
        &self,
        account_id: &AccountId,
    ) -> Result<(), SdnError> {
        let mut account = self
            .account_model_with_endpoint(account_id, AccountEndpoint::Own)
            .await?;
        if account.relay_limit.msg_quota.limit == 0 {
            warn!("relay limit was set to 0, setting to 1");
            account.relay_limit.msg_quota.limit = 1;
        }
        if account.max_allowed_nodes.msg_quota.limit == 0 {
            warn!("max allowed nodes limit was set to 0, setting to 6");
            account.max_allowed_nodes.msg_quota.limit = 6;
        }
        *self.account_model.write() = Some(account);
        Ok(())
    }

    /// Fetches a customer account through the un-cached endpoint, filling
    /// missing fields from the default elite template.
    pub async fn fetch_customer_account_model(
        &self,
        account_id: &AccountId,
    ) -> Result<Account, SdnError> {
        self.account_model_with_endpoint(account_id, AccountEndpoint::Customer)
            .await
    }

    /// Plain GET against the directory, bypassing the cache.
    pub async fn get(
        &self,
        endpoint: &str,
        request_body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, SdnError> {
        self.fetcher
            .request(
                &format!("{}{}", self.sdn_url, endpoint),
                Method::GET,
                request_body,
            )
            .await
    }

    /// Quota usage for an account.
    pub async fn get_quota_usage(
        &self,
        account_id: &str,
    ) -> Result<QuotaResponse, SdnError> {
        let body = serde_json::to_vec(&QuotaRequest {
            account_id: account_id.to_string(),
        })
        .map_err(SdnError::Serialize)?;
        let response = self.get("/accounts/quota-status", Some(body)).await?;
        serde_json::from_slice(&response).map_err(|source| SdnError::Deserialize {
            body: String::from_utf8_lossy(&response).into_owned(),
            source,
        })
    }

    /// Posts a node event. Fire-and-forget: failures are logged, never
    /// propagated.
    pub async fn send_node_event(&self, event: NodeEvent, node_id: &NodeId) {
        let url = format!("{}/nodes/{}/events", self.sdn_url, node_id);
        let body = match serde_json::to_vec(&event) {
            Ok(body) => body,
            Err(err) => {
                error!("could not serialize node event {}: {}", event.event_type, err);
                return;
            }
        };
        match self.fetcher.request(&url, Method::POST, Some(body)).await {
            Ok(response) => info!(
                "node event {} sent to SDN, resp: {}",
                event.event_type,
                String::from_utf8_lossy(&response)
            ),
            Err(err) => error!(
                "could not send node event {} to SDN: {}",
                event.event_type, err
            ),
        }
    }

    /// GET `/nodes/<id>/<networkNum>/potential-relays`: the candidate relay
    /// list for this node.
    pub(crate) async fn get_relays(&self) -> Result<Peers, SdnError> {
        let (node_id, network_num) = {
            let model = self.node_model.read();
            (model.node_id.clone(), model.blockchain_network_num)
        };
        let url = format!(
            "{}/nodes/{}/{}/potential-relays",
            self.sdn_url, node_id, network_num
        );
        let response = self
            .fetcher
            .get_with_cache(&url, Method::GET, POTENTIAL_RELAYS_CACHE_FILE, None)
            .await?;
        serde_json::from_slice(&response).map_err(|source| SdnError::Deserialize {
            body: String::from_utf8_lossy(&response).into_owned(),
            source,
        })
    }

    /// Minimum age a transaction must reach before the gateway forwards
    /// it, per the registered network. Defaults to 2 s when the network
    /// record is not loaded.
    pub fn min_tx_age(&self) -> Duration {
        match self.find_network(self.network_num()) {
            Some(network) => {
                Duration::from_secs_f64(network.min_tx_age_seconds.max(0.0))
            }
            None => {
                warn!(
                    "could not find the registered blockchain network, returning default {:?} for min tx age",
                    DEFAULT_MIN_TX_AGE
                );
                DEFAULT_MIN_TX_AGE
            }
        }
    }

    /// Looks up a network record by number.
    pub fn find_network(&self, network_num: NetworkNum) -> Option<BlockchainNetwork> {
        self.networks.read().get(&network_num).cloned()
    }

    // ── accessors ───────────────────────────────────────────────────────

    pub fn sdn_url(&self) -> &str {
        &self.sdn_url
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id.read().clone()
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id.read().clone()
    }

    pub fn node_model(&self) -> NodeModel {
        self.node_model.read().clone()
    }

    pub fn network_num(&self) -> NetworkNum {
        self.node_model.read().blockchain_network_num
    }

    /// Tier name of the loaded account, empty before the first fetch.
    pub fn account_tier(&self) -> AccountTier {
        self.account_model
            .read()
            .as_ref()
            .map(|account| account.tier_name.clone())
            .unwrap_or_default()
    }

    /// The loaded account model, `None` before the first fetch.
    pub fn account_model(&self) -> Option<Account> {
        self.account_model.read().clone()
    }

    pub fn networks(&self) -> BlockchainNetworks {
        self.networks.read().clone()
    }

    /// Replaces the in-memory network table.
    pub fn set_networks(&self, networks: BlockchainNetworks) {
        *self.networks.write() = networks;
    }
}
