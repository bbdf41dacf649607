//! Cache key derivation.
//!
//! The key is a pure function of method, path, query string, and the
//! configured vary-by headers present on the request. Two requests share an
//! entry iff these components are byte-identical.

use axum::http::{HeaderMap, Method, Uri};

/// Build the cache key: `METHOD:PATH[?QUERY]` followed by one
/// `:<header>=<value>` segment per configured vary-by header present on the
/// request, in configured order.
pub fn derive_cache_key(
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    vary_by_headers: &[String],
) -> String {
    let mut key = String::new();
    key.push_str(method.as_str());
    key.push(':');
    key.push_str(uri.path());

    if let Some(query) = uri.query() {
        key.push('?');
        key.push_str(query);
    }

    for header_name in vary_by_headers {
        if let Some(value) = headers.get(header_name.as_str()) {
            if let Ok(value) = value.to_str() {
                key.push(':');
                key.push_str(header_name);
                key.push('=');
                key.push_str(value);
            }
        }
    }

    key
}
