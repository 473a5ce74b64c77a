//! Request signing for S3-compatible query-string authentication.
//!
//! Signatures are computed locally so a browser (or any client without a
//! backend proxy) can talk to the storage service directly. Two schemes live
//! here:
//!
//! - **Query-string request signatures**: base64(HMAC-SHA1(secret,
//!   canonical)) over the canonical string
//!   `METHOD\n\n\n{expires}\n{resource}[?{sorted query}]`.
//! - **Upload policy documents**: a base64-encoded JSON policy plus its
//!   HMAC-SHA1 signature, used for direct browser-to-storage POST uploads so
//!   the long-lived secret never appears in the form.
//!
//! All functions are pure: the caller supplies the clock.

use base64::{engine::general_purpose, Engine};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha1::Sha1;

use crate::error::{Result, S3Error};

type HmacSha1 = Hmac<Sha1>;

/// Window added to the signing clock before a signature expires.
///
/// Generous on purpose: it has to absorb client/server clock drift, not just
/// request latency.
pub const SIGNATURE_SKEW_WINDOW_SECS: i64 = 21_600;

/// Expiry for presigned download links.
pub const DOWNLOAD_LINK_EXPIRY_SECS: i64 = 900;

/// A computed request signature and its expiry timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    /// Base64-encoded HMAC-SHA1 signature.
    pub signature: String,
    /// Unix timestamp after which the provider rejects the request.
    pub expires: i64,
}

/// A signed upload policy for browser-form POST uploads.
#[derive(Debug, Clone)]
pub struct SignedPolicy {
    /// Base64-encoded JSON policy document.
    pub document: String,
    /// Base64-encoded HMAC-SHA1 signature of the encoded document.
    pub signature: String,
}

/// Sign a request with the default six-hour expiry window.
///
/// # Arguments
/// * `secret_key` - Secret access key
/// * `method` - HTTP verb, upper case
/// * `resource` - Absolute resource path (`/bucket/key...`), components
///   already percent-encoded
/// * `query` - Query parameters included in the canonical string
/// * `now` - Current time, supplied by the caller
pub fn sign_request(
    secret_key: &str,
    method: &str,
    resource: &str,
    query: &[(String, String)],
    now: DateTime<Utc>,
) -> Result<SignedRequest> {
    sign_request_expiring_in(
        secret_key,
        method,
        resource,
        query,
        now,
        Duration::seconds(SIGNATURE_SKEW_WINDOW_SECS),
    )
}

/// Sign a request with an explicit expiry window.
///
/// Used for short-lived presigned download links (15 minutes) as well as the
/// default long-window request signatures.
pub fn sign_request_expiring_in(
    secret_key: &str,
    method: &str,
    resource: &str,
    query: &[(String, String)],
    now: DateTime<Utc>,
    window: Duration,
) -> Result<SignedRequest> {
    let expires = now.timestamp() + window.num_seconds();
    let canonical = canonical_string(method, resource, query, expires);
    let signature = hmac_sha1_base64(secret_key, &canonical)?;
    Ok(SignedRequest { signature, expires })
}

/// Build the canonical string a request signature is computed over.
///
/// Query parameters are sorted by key so the caller's ordering never changes
/// the signature.
fn canonical_string(
    method: &str,
    resource: &str,
    query: &[(String, String)],
    expires: i64,
) -> String {
    let mut canonical = format!("{}\n\n\n{}\n{}", method, expires, resource);
    if !query.is_empty() {
        let mut sorted: Vec<&(String, String)> = query.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        let joined: Vec<String> = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        canonical.push('?');
        canonical.push_str(&joined.join("&"));
    }
    canonical
}

/// Sign an upload policy document for a bucket and key prefix.
///
/// The policy restricts POST uploads to private objects under `key_prefix`
/// and expires after the same skew window as request signatures.
pub fn sign_upload_policy(
    secret_key: &str,
    bucket: &str,
    key_prefix: &str,
    now: DateTime<Utc>,
) -> Result<SignedPolicy> {
    let expiration = (now + Duration::seconds(SIGNATURE_SKEW_WINDOW_SECS))
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string();

    let policy = json!({
        "expiration": expiration,
        "conditions": [
            {"acl": "private"},
            {"bucket": bucket},
            ["starts-with", "$key", key_prefix],
            ["starts-with", "$Content-Type", ""],
        ],
    });

    let document = general_purpose::STANDARD.encode(serde_json::to_vec(&policy)?);
    let signature = hmac_sha1_base64(secret_key, &document)?;

    Ok(SignedPolicy {
        document,
        signature,
    })
}

fn hmac_sha1_base64(secret_key: &str, data: &str) -> Result<String> {
    let mut mac = HmacSha1::new_from_slice(secret_key.as_bytes())
        .map_err(|_| S3Error::Signing("invalid secret key".to_string()))?;
    mac.update(data.as_bytes());
    Ok(general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}
