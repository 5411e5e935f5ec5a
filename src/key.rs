//! Decoding of the VAPID application server key handed to `pushManager.subscribe`.

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::error::{Error, Result};

/// Decodes a Base64url string (padded or not) into raw key bytes.
///
/// The input is normalised to the standard alphabet first: `=` padding is
/// appended up to a multiple of four, `-` becomes `+` and `_` becomes `/`.
pub fn decode_application_server_key(base64_string: &str) -> Result<Vec<u8>> {
    let trimmed = base64_string.trim();
    let padding = "=".repeat((4 - trimmed.len() % 4) % 4);
    let base64 = format!("{}{}", trimmed, padding)
        .replace('-', "+")
        .replace('_', "/");

    STANDARD
        .decode(base64.as_bytes())
        .map_err(|e| Error::InvalidKey(e.to_string()))
}
