//! URL canonicalization for the dedup cache
//!
//! Reduces a URL to a canonical string so that trivially different links to
//! the same page share one cache key:
//! - scheme and host lowercased
//! - fragment removed
//! - tracking parameters removed (see [`is_tracking_param`])
//! - remaining parameters sorted by key, then value
//! - trailing slash removed, except for the root path
//!
//! Normalization is idempotent.

use crate::StoreError;
use sha2::{Digest, Sha256};
use url::Url;

/// Prefix for every dedup cache key in the key-value store
pub const CACHE_KEY_PREFIX: &str = "urlcache:";

/// Query keys dropped during normalization, besides the `utm_` family
const TRACKING_PARAMS: &[&str] = &[
    "fbclid",
    "gclid",
    "gclsrc",
    "dclid",
    "msclkid",
    "mc_cid",
    "mc_eid",
    "ref",
    "ref_src",
    "source",
    "referrer",
    "campaign",
    "_ga",
    "_gl",
    "igshid",
    "yclid",
    "affiliate",
    "aff_id",
    "spm",
];

/// Whether a query key is on the tracking denylist (case-insensitive)
pub fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}

/// Canonicalize a URL
///
/// # Errors
///
/// Returns [`StoreError::InvalidUrl`] when the input does not parse or has no
/// host (e.g. `example.com/page` or `mailto:someone@example.com`).
///
/// # Examples
///
/// ```
/// use intake_store::normalize::normalize_url;
///
/// let url = normalize_url("HTTPS://Example.com/a/?utm_source=x&b=2&a=1#top").unwrap();
/// assert_eq!(url, "https://example.com/a?a=1&b=2");
/// ```
pub fn normalize_url(raw: &str) -> Result<String, StoreError> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| StoreError::InvalidUrl(format!("{}: {}", raw, e)))?;

    let host = match url.host_str() {
        Some(host) if !host.is_empty() => host.to_ascii_lowercase(),
        _ => return Err(StoreError::InvalidUrl(format!("{}: missing host", raw))),
    };
    // The url crate already lowercases special-scheme hosts; this covers the rest.
    url.set_host(Some(&host))
        .map_err(|e| StoreError::InvalidUrl(format!("{}: {}", raw, e)))?;

    url.set_fragment(None);

    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    params.sort();

    if params.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(params);
    }

    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/');
        let trimmed = if trimmed.is_empty() { "/" } else { trimmed }.to_string();
        url.set_path(&trimmed);
    }

    Ok(url.to_string())
}

/// SHA-256 hex digest of the normalized URL
pub fn url_hash(raw: &str) -> Result<String, StoreError> {
    let normalized = normalize_url(raw)?;
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Full key-value store key for a URL: `urlcache:<sha256 hex>`
pub fn cache_key(raw: &str) -> Result<String, StoreError> {
    Ok(format!("{}{}", CACHE_KEY_PREFIX, url_hash(raw)?))
}
