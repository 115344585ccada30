//! Public-IP autodiscovery.
//!
//! When no external IP is configured, the session asks an [`IpResolver`]
//! for the node's externally visible IPv4. The production resolver GETs a
//! third-party checkip endpoint and pulls the first dotted quad out of the
//! response body; tests substitute their own impl through the trait.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;

use crate::error::SdnError;

/// Default endpoint that echoes the caller's public address.
pub const PUBLIC_IP_RESOLVER_URL: &str = "http://checkip.dyndns.org/";

fn ipv4_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]+(\.[0-9]+){3}").expect("static regex"))
}

/// Capability returning the node's externally visible IPv4.
#[async_trait]
pub trait IpResolver: Send + Sync {
    async fn public_ip(&self) -> Result<String, SdnError>;
}

/// Resolver backed by an HTTP checkip endpoint.
pub struct PublicIpResolver {
    url: String,
}

impl PublicIpResolver {
    pub fn new() -> Self {
        Self::with_url(PUBLIC_IP_RESOLVER_URL)
    }

    /// Uses a different checkip endpoint, e.g. a self-hosted one.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Default for PublicIpResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IpResolver for PublicIpResolver {
    async fn public_ip(&self) -> Result<String, SdnError> {
        let response = reqwest::get(&self.url).await?;
        let status = response.status();
        let body = response.text().await?;
        if status != reqwest::StatusCode::OK {
            return Err(SdnError::PublicIp(body));
        }
        match ipv4_regex().find(&body) {
            Some(found) => Ok(found.as_str().to_string()),
            None => Err(SdnError::PublicIp(format!(
                "no IPv4 address in resolver response '{body}'"
            ))),
        }
    }
}

/// Extracts the first IPv4 address from arbitrary text.
pub fn extract_ipv4(text: &str) -> Option<&str> {
    ipv4_regex().find(text).map(|found| found.as_str())
}
