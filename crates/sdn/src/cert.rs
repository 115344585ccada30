//! Certificate store capability.
//!
//! The control plane never touches key material itself; everything it needs
//! from the TLS layer is behind [`CertStore`]. A node boots with a
//! registration-only certificate, registers, and is issued a private
//! certificate that the store persists — from then on
//! [`CertStore::needs_private_cert`] is false and directory calls
//! authenticate with the private identity.

use blockgate_common::types::{AccountId, NodeId};

use crate::error::SdnError;

/// Access to the node's TLS certificates and the identity baked into them.
pub trait CertStore: Send + Sync {
    /// True while the node has no private certificate yet and must
    /// authenticate with the registration certificate.
    fn needs_private_cert(&self) -> bool;

    /// Generates a certificate signing request (PEM) for registration.
    fn create_csr(&self) -> Result<String, SdnError>;

    /// Node ID extracted from the private certificate.
    fn node_id(&self) -> Result<NodeId, SdnError>;

    /// Account ID extracted from the certificate.
    fn account_id(&self) -> Result<AccountId, SdnError>;

    /// Persists the private certificate issued by the directory.
    fn save_private_cert(&self, cert_pem: &str) -> Result<(), SdnError>;

    /// Client identity for registration-time requests. `None` means plain
    /// TLS without a client certificate.
    fn registration_identity(&self) -> Result<Option<reqwest::Identity>, SdnError>;

    /// Client identity for post-registration requests.
    fn private_identity(&self) -> Result<Option<reqwest::Identity>, SdnError>;
}
