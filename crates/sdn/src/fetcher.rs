//! Cache-backed directory fetcher.
//!
//! All directory I/O funnels through [`CachedFetcher`]. Two request modes
//! exist: while the cert store still needs a private certificate, requests
//! carry the registration identity; afterwards, the private identity. Every
//! request runs with a 10 second timeout.
//!
//! [`CachedFetcher::get_with_cache`] mirrors each successful body to the
//! data directory and transparently replays the snapshot when the directory
//! is unavailable — a 503 for any method, or a transport error for GETs.
//! A missing snapshot converts the original failure into a hard error.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, StatusCode};
use tracing::{debug, warn};

use crate::cache::{load_cache_file, update_cache_file};
use crate::cert::CertStore;
use crate::error::SdnError;
use crate::message::ErrorMessage;

/// Per-request timeout for every directory call.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// TLS-equipped HTTP client with a disk-snapshot fallback.
pub struct CachedFetcher {
    cert_store: Arc<dyn CertStore>,
    data_dir: PathBuf,
}

impl CachedFetcher {
    pub fn new(cert_store: Arc<dyn CertStore>, data_dir: PathBuf) -> Self {
        Self {
            cert_store,
            data_dir,
        }
    }

    /// Builds a client for the current registration state. The identity is
    /// re-evaluated per request because registration flips it exactly once.
    fn client(&self) -> Result<Client, SdnError> {
        let identity = if self.cert_store.needs_private_cert() {
            self.cert_store.registration_identity()?
        } else {
            self.cert_store.private_identity()?
        };
        let mut builder = Client::builder().timeout(HTTP_TIMEOUT);
        if let Some(identity) = identity {
            builder = builder.identity(identity);
        }
        Ok(builder.build()?)
    }

    /// Issues a plain request, bypassing the cache. Used for non-idempotent
    /// or non-critical endpoints (quota, events, customer lookups).
    ///
    /// Returns the response body on 200. A 503 maps to
    /// [`SdnError::Unavailable`]; any other non-200 is decoded as a
    /// `{message, details}` body and surfaced as [`SdnError::Rejected`].
    pub async fn request(
        &self,
        url: &str,
        method: Method,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, SdnError> {
        let client = self.client()?;
        let mut request = client.request(method.clone(), url);
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }
        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            debug!("directory returned 503, SDN is down");
            return Err(SdnError::Unavailable);
        }
        let bytes = response.bytes().await?;
        if status != StatusCode::OK {
            let message: ErrorMessage = serde_json::from_slice(&bytes)
                .map_err(|source| SdnError::Deserialize {
                    body: String::from_utf8_lossy(&bytes).into_owned(),
                    source,
                })?;
            return Err(SdnError::Rejected {
                method: method.to_string(),
                url: url.to_string(),
                status: status.as_u16(),
                details: message.details,
            });
        }
        Ok(bytes.to_vec())
    }

    /// Issues a request and mirrors the successful body to
    /// `<data_dir>/<cache_key>`. When the directory is unavailable the
    /// snapshot satisfies the call instead.
    ///
    /// A cache-write failure is logged, never propagated: the response is
    /// still good. A fallback with no snapshot on disk returns
    /// [`SdnError::CacheMiss`].
    pub async fn get_with_cache(
        &self,
        url: &str,
        method: Method,
        cache_key: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, SdnError> {
        let is_get = method == Method::GET;
        match self.request(url, method, body).await {
            Ok(data) => {
                if let Err(err) = update_cache_file(&self.data_dir, cache_key, &data) {
                    warn!(
                        "can not update cache file {} with response data: {}",
                        cache_key, err
                    );
                }
                Ok(data)
            }
            Err(err) if fallback_applies(&err, is_get) => {
                match load_cache_file(&self.data_dir, cache_key) {
                    Ok(data) => {
                        warn!(
                            "directory request failed ({}), serving cached {}",
                            err, cache_key
                        );
                        Ok(data)
                    }
                    Err(io_err) => Err(SdnError::CacheMiss {
                        file: cache_key.to_string(),
                        source: io_err,
                    }),
                }
            }
            Err(err) => Err(err),
        }
    }
}

/// 503 falls back for any method; transport errors only for GETs, since a
/// POST may have partially applied on the directory side.
fn fallback_applies(err: &SdnError, is_get: bool) -> bool {
    match err {
        SdnError::Unavailable => true,
        SdnError::Transport(_) => is_get,
        _ => false,
    }
}
