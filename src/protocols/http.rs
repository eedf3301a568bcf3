//! # HTTP Forwarding Engine
//!
//! Relays an admitted request to its backend and streams the backend's answer back.
//!
//! - The `/{service}` prefix is stripped; the remainder and the query string are appended
//!   to the service's base address. An empty remainder becomes `/`.
//! - Method, headers and body pass through. Hop-by-hop headers and `host` are dropped so
//!   the client addresses the backend directly; `x-forwarded-*` headers are added.
//! - The response status, headers (minus hop-by-hop) and body are relayed without
//!   buffering or decoding, so any payload type passes through byte for byte.
//!
//! A transport error before the response head arrives is a `ForwardingFailure`. Once the
//! body is streaming the status line has already been sent, so a later failure can only
//! end the stream early.
//!
//! ## Cancellation
//! The outbound call lives inside the inbound handler's future and the relayed body owns
//! the upstream stream. When the client goes away hyper drops both, which aborts the
//! outbound request and closes the upstream connection.

use axum::{
    body::{Body, HttpBody},
    extract::{ConnectInfo, Request},
    http::{
        header::{CONTENT_LENGTH, HOST},
        request::Parts,
        HeaderMap, HeaderName, HeaderValue, Uri,
    },
    response::Response,
};
use futures::StreamExt;
use reqwest::Client as HttpClient;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::core::config::ForwardingConfig;
use crate::core::error::{GatewayError, GatewayResult};
use crate::core::types::ServiceEntry;

/// Headers that describe a single connection and must not be relayed
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_FORWARDED_HOST: &str = "x-forwarded-host";
const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Relays requests to backend services
#[derive(Debug, Clone)]
pub struct ForwardingEngine {
    client: HttpClient,
    timeout: Option<Duration>,
}

impl ForwardingEngine {
    pub fn new(config: &ForwardingConfig) -> GatewayResult<Self> {
        // Redirects go back to the caller untouched
        let client = HttpClient::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| GatewayError::internal(format!("Failed to create forwarding client: {}", e)))?;

        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Forward `request`, addressed to `/{service}/...`, to `entry`
    pub async fn forward(
        &self,
        request: Request,
        service: &str,
        entry: &ServiceEntry,
    ) -> GatewayResult<Response> {
        let start_time = Instant::now();
        let (parts, body) = request.into_parts();

        let target = upstream_url(entry, service, &parts.uri);
        let mut headers = forwardable_headers(&parts.headers);
        add_forwarded_headers(&mut headers, &parts);

        debug!(
            service = %service,
            method = %parts.method,
            target = %target,
            "Forwarding request"
        );

        let mut builder = self.client.request(parts.method.clone(), &target);

        if !body.is_end_stream() {
            if let Some(length) = body.size_hint().exact() {
                headers
                    .entry(CONTENT_LENGTH)
                    .or_insert_with(|| HeaderValue::from(length));
            }
            let data_stream = body
                .into_data_stream()
                .map(|result| result.map_err(|err| std::io::Error::other(err.to_string())));
            builder = builder.body(reqwest::Body::wrap_stream(data_stream));
        }

        builder = builder.headers(headers);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let upstream = builder.send().await.map_err(|e| {
            let message = if e.is_timeout() {
                format!("no response within {:?}", self.timeout.unwrap_or_default())
            } else {
                e.to_string()
            };
            warn!(service = %service, target = %target, error = %message, "Upstream call failed");
            GatewayError::forwarding(service, message)
        })?;

        debug!(
            service = %service,
            status = upstream.status().as_u16(),
            elapsed_ms = start_time.elapsed().as_millis(),
            "Upstream responded"
        );

        Ok(relay_response(upstream))
    }
}

/// Path the backend sees once the `/{service}` prefix is removed
pub fn upstream_path(service: &str, path: &str) -> String {
    let rest = path
        .strip_prefix('/')
        .and_then(|p| p.strip_prefix(service))
        .unwrap_or(path);

    if rest.is_empty() {
        "/".to_string()
    } else if rest.starts_with('/') {
        rest.to_string()
    } else {
        format!("/{}", rest)
    }
}

/// Full backend URL for an inbound request URI
pub fn upstream_url(entry: &ServiceEntry, service: &str, uri: &Uri) -> String {
    let path = upstream_path(service, uri.path());
    match uri.query() {
        Some(query) => format!("{}{}?{}", entry.base_str(), path, query),
        None => format!("{}{}", entry.base_str(), path),
    }
}

/// Copy `headers`, leaving out hop-by-hop headers, anything named by `Connection`, and `host`
pub fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    let connection_listed: Vec<String> = headers
        .get_all("connection")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .collect();

    let mut forwarded = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers.iter() {
        let lower = name.as_str();
        if name == HOST
            || HOP_BY_HOP_HEADERS.contains(&lower)
            || connection_listed.iter().any(|listed| listed == lower)
        {
            continue;
        }
        forwarded.append(name.clone(), value.clone());
    }
    forwarded
}

fn add_forwarded_headers(headers: &mut HeaderMap, parts: &Parts) {
    if let Some(ConnectInfo(peer)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
        let client_ip = peer.ip().to_string();
        // Earlier hops are kept as raw bytes; they need not be UTF-8
        let mut value = match headers.get(X_FORWARDED_FOR) {
            Some(existing) if !existing.is_empty() => {
                let mut chain = existing.as_bytes().to_vec();
                chain.extend_from_slice(b", ");
                chain
            }
            _ => Vec::new(),
        };
        value.extend_from_slice(client_ip.as_bytes());
        if let Ok(value) = HeaderValue::from_bytes(&value) {
            headers.insert(HeaderName::from_static(X_FORWARDED_FOR), value);
        }
    }

    if let Some(host) = parts.headers.get(HOST) {
        headers
            .entry(HeaderName::from_static(X_FORWARDED_HOST))
            .or_insert_with(|| host.clone());
    }

    headers
        .entry(HeaderName::from_static(X_FORWARDED_PROTO))
        .or_insert_with(|| HeaderValue::from_static("http"));
}

/// Turn the upstream response into the gateway's response without buffering the body
fn relay_response(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let headers = forwardable_headers(upstream.headers());

    let stream = upstream
        .bytes_stream()
        .map(|chunk| chunk.map_err(std::io::Error::other));

    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
