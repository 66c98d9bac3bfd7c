//! Request signing
//!
//! The exchange authenticates a request with
//! `base64(HMAC-SHA256(key, timestamp + METHOD + path + canonical_params))`
//! where `key` is the *base64 text* of the raw API secret, not the secret
//! bytes. GET requests always sign an empty parameter string, even when the
//! same parameters travel in the query string.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::credentials::Credentials;
use crate::req::{HttpMethod, RequestParams};

type HmacSha256 = Hmac<Sha256>;

/// Sorted `key=value&...` join of the non-null params
pub fn canonicalize(params: &RequestParams) -> String {
    params
        .present()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// The parameter string that goes into the signature for `method`
pub fn signing_params(method: HttpMethod, params: &RequestParams) -> String {
    if method.is_get() {
        String::new()
    } else {
        canonicalize(params)
    }
}

pub fn sign(secret: &str, timestamp: &str, method: HttpMethod, path: &str, canonical: &str) -> String {
    let key = STANDARD.encode(secret.as_bytes());
    let mut mac =
        HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC can take key of any size");

    mac.update(timestamp.as_bytes());
    mac.update(method.as_str().as_bytes());
    mac.update(path.as_bytes());
    mac.update(canonical.as_bytes());

    STANDARD.encode(mac.finalize().into_bytes())
}

/// Everything that went into one signature, kept together so the header
/// timestamp can never drift from the signed one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub method: HttpMethod,
    pub path: String,
    pub timestamp: String,
    pub canonical_params: String,
    pub signature: String,
}

impl SignedRequest {
    pub fn new(
        credentials: &Credentials,
        method: HttpMethod,
        path: &str,
        params: &RequestParams,
        timestamp_ms: u64,
    ) -> Self {
        let timestamp = timestamp_ms.to_string();
        let canonical_params = signing_params(method, params);
        let signature = sign(
            credentials.api_secret(),
            &timestamp,
            method,
            path,
            &canonical_params,
        );

        Self {
            method,
            path: path.to_string(),
            timestamp,
            canonical_params,
            signature,
        }
    }
}
