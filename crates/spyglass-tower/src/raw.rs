//! Conversion of `http` types into raw capture inputs.

use http::header::{COOKIE, HOST};
use http::{HeaderMap, Uri};
use serde_json::Value;
use spyglass_core::{RawRequest, RawResponse};
use std::collections::HashMap;
use std::net::SocketAddr;

/// Route parameters resolved by the host router.
///
/// Insert this into the request extensions before the Spyglass layer runs
/// and the parameters show up in the captured request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams(pub HashMap<String, String>);

impl RouteParams {
    /// Create route parameters from key/value pairs.
    pub fn new<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            params
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Address of the connected peer.
///
/// Servers insert this (or a bare [`SocketAddr`]) into the request
/// extensions when accepting a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientAddr(pub SocketAddr);

/// Build a [`RawRequest`] from request parts and an optional buffered body.
pub fn raw_request(parts: &http::request::Parts, body: Option<Value>) -> RawRequest {
    let uri = &parts.uri;
    let url = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.to_string());

    let mut raw = RawRequest::new(parts.method.as_str(), url).with_path(uri.path());
    raw.query = extract_query_params(uri);
    raw.headers = header_pairs(&parts.headers);
    raw.cookies = extract_cookies(&parts.headers);
    raw.body = body;

    if let Some(params) = parts.extensions.get::<RouteParams>() {
        raw.params = params.0.clone();
    }

    raw.remote_addr = parts
        .extensions
        .get::<ClientAddr>()
        .map(|addr| addr.0)
        .or_else(|| parts.extensions.get::<SocketAddr>().copied())
        .map(|addr| addr.ip().to_string());

    raw.hostname = uri.host().map(str::to_string).or_else(|| {
        parts
            .headers
            .get(HOST)
            .and_then(|h| h.to_str().ok())
            .map(strip_port)
    });

    raw.protocol = uri.scheme_str().map(str::to_string).or_else(|| {
        parts
            .headers
            .get("x-forwarded-proto")
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
    });

    raw
}

/// Build a [`RawResponse`] from response parts and an optional buffered body.
pub fn raw_response(parts: &http::response::Parts, body: Option<Value>) -> RawResponse {
    let mut raw = RawResponse::new(parts.status.as_u16());
    raw.status_message = parts.status.canonical_reason().map(str::to_string);
    raw.headers = header_pairs(&parts.headers);
    raw.body = body;
    raw
}

/// Extract query parameters from URI.
pub(crate) fn extract_query_params(uri: &Uri) -> HashMap<String, String> {
    let mut params = HashMap::new();
    if let Some(query) = uri.query() {
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next().unwrap_or_default();
            let value = parts.next().unwrap_or_default();
            params.insert(decode_component(key), decode_component(value));
        }
    }
    params
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(spaced)
}

/// Header pairs in arrival order, repeated names folded into one value.
fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .keys()
        .map(|name| {
            let separator = if *name == COOKIE { "; " } else { ", " };
            let value = headers
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(separator);
            (name.as_str().to_string(), value)
        })
        .collect()
}

fn extract_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|cookie_str| {
            cookie::Cookie::split_parse(cookie_str)
                .filter_map(|c| c.ok())
                .map(|c| (c.name().to_string(), c.value().to_string()))
                .collect::<Vec<_>>()
        })
        .collect()
}

fn strip_port(host: &str) -> String {
    // bracketed IPv6 literal
    if let Some(end) = host.find(']') {
        return host[..=end].to_string();
    }
    host.split(':').next().unwrap_or(host).to_string()
}
