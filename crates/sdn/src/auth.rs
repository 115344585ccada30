//! Authorization-header decoding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use blockgate_common::types::AccountId;

use crate::error::SdnError;

/// Decodes an `Authorization` header of the form
/// `base64(account_id:secret_hash)` and returns the two parts. The split is
/// on the first `:` so the secret may itself contain colons.
pub fn account_id_and_secret_from_header(
    auth_header: &str,
) -> Result<(AccountId, String), SdnError> {
    let payload = STANDARD
        .decode(auth_header)
        .map_err(|_| SdnError::AuthHeaderNotBase64(auth_header.to_string()))?;
    let decoded = String::from_utf8(payload)
        .map_err(|_| SdnError::AuthHeaderNotBase64(auth_header.to_string()))?;
    match decoded.split_once(':') {
        Some((account_id, secret_hash)) => {
            Ok((account_id.to_string(), secret_hash.to_string()))
        }
        None => Err(SdnError::AuthHeaderWrongFormat(auth_header.to_string())),
    }
}
