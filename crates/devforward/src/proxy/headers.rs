//! Static header values and hop-by-hop header filtering.

use hyper::header::{HeaderMap, HeaderName, HeaderValue, HOST};

// Content types written by devforward itself
pub static APPLICATION_JSON_UTF8: HeaderValue =
    HeaderValue::from_static("application/json; charset=utf-8");
pub static TEXT_PLAIN: HeaderValue = HeaderValue::from_static("text/plain");

/// Headers that describe a single connection and must not be relayed.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// Copy of `headers` without hop-by-hop headers and, for requests, without
/// `host` (the client sets it from the target url).
pub fn forwardable_headers(headers: &HeaderMap, keep_host: bool) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers.iter() {
        if is_hop_by_hop(name) || (!keep_host && name == HOST) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}
