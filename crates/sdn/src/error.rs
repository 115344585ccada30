//! Error types for the SDN client.

use std::io;

use thiserror::Error;

/// Every way a directory or controller operation can fail.
///
/// Background tasks (`manage_auto_relays`, recovery) log these and continue;
/// session calls propagate them to the caller.
#[derive(Debug, Error)]
pub enum SdnError {
    /// The directory answered 503. Cached endpoints recover from this by
    /// falling back to the on-disk snapshot.
    #[error("SDN service unavailable")]
    Unavailable,

    /// The directory was reachable but returned an empty candidate relay
    /// list. The caller should retry later.
    #[error("no relays were acquired from SDN")]
    NoRelays,

    /// Network, TLS, or timeout failure below the HTTP layer.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-200 response with a decoded `{message, details}` body.
    #[error("{method} to {url} received [{status}]: {details}")]
    Rejected {
        method: String,
        url: String,
        status: u16,
        details: String,
    },

    /// A response body that should have been JSON was not.
    #[error("could not deserialize '{body}' response: {source}")]
    Deserialize {
        body: String,
        #[source]
        source: serde_json::Error,
    },

    /// A request body could not be serialized.
    #[error("could not serialize request body: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The directory was unavailable and the cache file backing the call
    /// could not be read either.
    #[error("SDN unavailable and cache file {file} could not be read: {source}")]
    CacheMiss {
        file: String,
        #[source]
        source: io::Error,
    },

    /// Fetching the candidate relay list failed.
    #[error("failed to fetch the candidate relay list: {source}")]
    RelayList {
        #[source]
        source: Box<SdnError>,
    },

    /// No relay spec was given at all.
    #[error("no --relays argument was provided")]
    MissingRelaySpec,

    /// A relay spec token was empty (extra or trailing comma).
    #[error("argument to --relays is empty or has an extra comma")]
    EmptyRelayToken,

    /// A relay spec token had more than one colon.
    #[error("relay from --relays was given in the incorrect format '{0}', should be IP:Port")]
    MalformedRelay(String),

    /// A relay spec port was not an integer.
    #[error("port provided {port} is not valid: {source}")]
    InvalidRelayPort {
        port: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// A relay host could not be resolved.
    #[error("host provided {host} is not valid: {reason}")]
    InvalidHost { host: String, reason: String },

    /// A DNS name resolved to an empty address list.
    #[error("host provided {0} has no IPs behind the domain name")]
    NoAddresses(String),

    /// The node's externally visible IP could not be determined.
    #[error("could not resolve the node's public ip: {0}")]
    PublicIp(String),

    /// The certificate store refused an operation.
    #[error("certificate store error: {0}")]
    Cert(String),

    /// The instruction channel's receiver was dropped while the controller
    /// still had instructions to emit. The caller owns the channel lifetime.
    #[error("relay instruction channel closed")]
    InstructionChannelClosed,

    /// An authorization header was not valid base64.
    #[error("auth header is not base64 encoded: {0}")]
    AuthHeaderNotBase64(String),

    /// An authorization header decoded but had no `account_id:secret` shape.
    #[error("account_id and hash could not be extracted from auth header: {0}")]
    AuthHeaderWrongFormat(String),

    /// A configuration file could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}
