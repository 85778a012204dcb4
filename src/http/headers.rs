//! Header manipulation for forwarded messages.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Build the outbound header set (credential injection, Host rewrite)
//!
//! # Design Decisions
//! - End-to-end headers are copied untouched, including duplicates
//! - The credential replaces any inbound header of the same name

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

/// Headers that describe a single connection and are never forwarded.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    HeaderName::from_static("keep-alive"),
];

const PROXY_CONNECTION: &str = "proxy-connection";

/// Remove hop-by-hop headers, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
    headers.remove(PROXY_CONNECTION);
}

/// Build the header set sent upstream from the inbound headers.
///
/// `Content-Length` is dropped because the client recomputes it from the
/// buffered body. `Host` is dropped when `change_origin` is set so the
/// client derives it from the upstream URL.
pub fn outbound_headers(
    inbound: &HeaderMap,
    credential: (&HeaderName, &HeaderValue),
    change_origin: bool,
) -> HeaderMap {
    let mut headers = inbound.clone();
    strip_hop_by_hop(&mut headers);
    headers.remove(header::CONTENT_LENGTH);
    if change_origin {
        headers.remove(header::HOST);
    }

    let (name, value) = credential;
    headers.insert(name.clone(), value.clone());
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential() -> (HeaderName, HeaderValue) {
        (
            HeaderName::from_static("api_key"),
            HeaderValue::from_static("special-key"),
        )
    }

    #[test]
    fn strips_standard_and_listed_hop_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-trace"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-trace", HeaderValue::from_static("1"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert("proxy-connection", HeaderValue::from_static("close"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 1);
        assert_eq!(headers[header::ACCEPT], "application/json");
    }

    #[test]
    fn credential_overrides_inbound_value() {
        let (name, value) = credential();
        let mut inbound = HeaderMap::new();
        inbound.append("api_key", HeaderValue::from_static("client-supplied"));
        inbound.append("api_key", HeaderValue::from_static("second"));

        let headers = outbound_headers(&inbound, (&name, &value), true);

        let values: Vec<_> = headers.get_all("api_key").iter().collect();
        assert_eq!(values, vec![&HeaderValue::from_static("special-key")]);
    }

    #[test]
    fn host_kept_only_without_change_origin() {
        let (name, value) = credential();
        let mut inbound = HeaderMap::new();
        inbound.insert(header::HOST, HeaderValue::from_static("localhost:3000"));
        inbound.insert(header::CONTENT_LENGTH, HeaderValue::from_static("12"));

        let rewritten = outbound_headers(&inbound, (&name, &value), true);
        assert!(rewritten.get(header::HOST).is_none());
        assert!(rewritten.get(header::CONTENT_LENGTH).is_none());

        let kept = outbound_headers(&inbound, (&name, &value), false);
        assert_eq!(kept[header::HOST], "localhost:3000");
    }

    #[test]
    fn end_to_end_duplicates_survive() {
        let (name, value) = credential();
        let mut inbound = HeaderMap::new();
        inbound.append(header::ACCEPT, HeaderValue::from_static("text/plain"));
        inbound.append(header::ACCEPT, HeaderValue::from_static("application/json"));

        let headers = outbound_headers(&inbound, (&name, &value), true);
        assert_eq!(headers.get_all(header::ACCEPT).iter().count(), 2);
    }
}
