//! Pure request introspection helpers.

use axum::http::HeaderMap;
use axum::http::header::{ACCEPT, CONTENT_TYPE};

/// Decoration signal set by inner handlers: `"0"` suppresses decoration for
/// a response that would otherwise qualify, `"1"` forces it.
pub const PAGE_DECORATE_HEADER: &str = "x-page-decorate";

const X_REQUESTED_WITH: &str = "x-requested-with";
const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
const X_FORWARDED_PROTOCOL: &str = "x-forwarded-protocol";
const X_FORWARDED_SSL: &str = "x-forwarded-ssl";
const X_URL_SCHEME: &str = "x-url-scheme";

/// Marker extension set by the embedder when the connection carries TLS.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tls(pub bool);

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Effective request scheme: TLS wins, then the forwarding headers in
/// precedence order, defaulting to `http`.
pub fn scheme(headers: &HeaderMap, tls: bool) -> String {
    if tls {
        return "https".to_string();
    }
    if let Some(scheme) = header(headers, X_FORWARDED_PROTO) {
        if !scheme.is_empty() {
            return scheme.to_string();
        }
    }
    if let Some(scheme) = header(headers, X_FORWARDED_PROTOCOL) {
        if !scheme.is_empty() {
            return scheme.to_string();
        }
    }
    if header(headers, X_FORWARDED_SSL) == Some("on") {
        return "https".to_string();
    }
    if let Some(scheme) = header(headers, X_URL_SCHEME) {
        if !scheme.is_empty() {
            return scheme.to_string();
        }
    }
    "http".to_string()
}

/// Request host with the default ports stripped; any other port stays.
pub fn host(authority: &str) -> String {
    match authority.rsplit_once(':') {
        Some((host, port)) if port == "80" || port == "443" => host.to_string(),
        _ => authority.to_string(),
    }
}

pub fn is_ajax(headers: &HeaderMap) -> bool {
    header(headers, X_REQUESTED_WITH) == Some("XMLHttpRequest")
}

/// Media type of the Content-Type header, parameters stripped.
pub fn media_type(headers: &HeaderMap) -> String {
    header(headers, CONTENT_TYPE.as_str())
        .unwrap_or("")
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

pub fn is_text_html(headers: &HeaderMap) -> bool {
    media_type(headers) == "text/html"
}

pub fn accepts_json(headers: &HeaderMap) -> bool {
    header(headers, ACCEPT.as_str()).is_some_and(|accept| accept.contains("json"))
}

pub fn accept_language(headers: &HeaderMap) -> String {
    header(headers, "accept-language").unwrap_or("").to_string()
}

/// Inner handler asked for the response not to be decorated.
pub fn decorate_suppressed(headers: &HeaderMap) -> bool {
    header(headers, PAGE_DECORATE_HEADER) == Some("0")
}

pub fn decorate_forced(headers: &HeaderMap) -> bool {
    header(headers, PAGE_DECORATE_HEADER) == Some("1")
}
