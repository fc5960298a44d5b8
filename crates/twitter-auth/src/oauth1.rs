//! OAuth 1.0a request signing (HMAC-SHA1)
//!
//! The signature covers the method, the URL without its query string, and
//! every request parameter (query and form) together with the `oauth_*`
//! protocol parameters. All encoding is RFC 3986: only unreserved characters
//! pass through unescaped.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use rand::RngExt;
use sha1::Sha1;

use crate::constants::{OAUTH_SIGNATURE_METHOD, OAUTH_VERSION};
use crate::credentials::Credential;
use crate::error::{Error, Result};

/// Everything except ALPHA / DIGIT / "-" / "." / "_" / "~".
const RFC3986_RESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Signs requests on behalf of one credential.
#[derive(Debug, Clone)]
pub struct OAuth1Signer {
    credential: Credential,
}

impl OAuth1Signer {
    pub fn new(credential: Credential) -> Self {
        Self { credential }
    }

    /// Build the `Authorization` header value for a request.
    pub fn sign(&self, method: &str, url: &str, params: &[(String, String)]) -> Result<String> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| Error::Signing(format!("system clock before unix epoch: {e}")))?
            .as_secs();
        self.sign_with(method, url, params, &generate_nonce(), timestamp)
    }

    /// Deterministic signing with a caller-supplied nonce and timestamp.
    pub fn sign_with(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
        nonce: &str,
        timestamp: u64,
    ) -> Result<String> {
        let mut oauth_params = vec![
            ("oauth_consumer_key", self.credential.consumer_key.clone()),
            ("oauth_nonce", nonce.to_string()),
            ("oauth_signature_method", OAUTH_SIGNATURE_METHOD.to_string()),
            ("oauth_timestamp", timestamp.to_string()),
            ("oauth_token", self.credential.access_token.clone()),
            ("oauth_version", OAUTH_VERSION.to_string()),
        ];

        let base = signature_base_string(method, url, &oauth_params, params);
        let key = format!(
            "{}&{}",
            encode(self.credential.consumer_secret.expose()),
            encode(self.credential.access_token_secret.expose())
        );
        oauth_params.push(("oauth_signature", hmac_sha1(&key, &base)?));

        let header = oauth_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", k, encode(v)))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!("OAuth {header}"))
    }
}

impl transport::RequestSigner for OAuth1Signer {
    fn authorization(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
    ) -> transport::Result<String> {
        Ok(self.sign(method, url, params)?)
    }
}

/// `METHOD&encoded-url&encoded-sorted-params`
fn signature_base_string(
    method: &str,
    url: &str,
    oauth_params: &[(&str, String)],
    params: &[(String, String)],
) -> String {
    let mut encoded: Vec<(String, String)> = oauth_params
        .iter()
        .map(|(k, v)| (encode(k), encode(v)))
        .chain(params.iter().map(|(k, v)| (encode(k), encode(v))))
        .collect();
    encoded.sort();

    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(url),
        encode(&param_string)
    )
}

fn encode(s: &str) -> String {
    utf8_percent_encode(s, RFC3986_RESERVED).to_string()
}

/// 16 random bytes as lowercase hex.
fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hmac_sha1(key: &str, data: &str) -> Result<String> {
    let mut mac = <Hmac<Sha1> as Mac>::new_from_slice(key.as_bytes())
        .map_err(|e| Error::Signing(e.to_string()))?;
    mac.update(data.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}
