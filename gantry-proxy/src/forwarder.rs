//! Outbound request construction and execution.
//!
//! Header forwarding is an allow-list, not passthrough: only the
//! headers enumerated in [`outbound_headers`] ever leave the gateway.
//! Failures are classified three ways and never conflated — an upstream
//! that *responded* is relayed verbatim (whatever the status), an
//! upstream that produced no response maps to 502, and a local request
//! construction failure maps to 500.

use bytes::Bytes;
use gantry_core::config::{ServiceConfig, UpstreamConfig};
use gantry_core::context::{ProxyResponse, RequestContext};
use gantry_core::error::GatewayError;
use gantry_core::route::RouteRule;
use http::header::{
    ACCEPT, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue,
    USER_AGENT,
};
use std::error::Error as _;
use std::time::Duration;
use tracing::debug;
use url::Url;

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");

/// Headers meaningful only for one transport leg; stripped from the
/// upstream response before relaying.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// Connection-reusing outbound client. Safe for concurrent use; one
/// instance is shared across all requests.
pub struct Forwarder {
    client: reqwest::Client,
    services: ServiceConfig,
}

impl Forwarder {
    pub fn new(services: ServiceConfig, upstream: &UpstreamConfig) -> anyhow::Result<Self> {
        // No transparent decompression and no redirect following: the
        // gateway relays upstream bytes and status codes verbatim.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(upstream.connect_timeout_ms))
            .timeout(Duration::from_millis(upstream.request_timeout_ms))
            .redirect(reqwest::redirect::Policy::none())
            .no_gzip()
            .build()?;
        Ok(Self { client, services })
    }

    /// Absolute URL for the outbound request: configured base URL plus
    /// the rewritten path. Query parameters are attached separately.
    pub fn target_url(&self, rule: &RouteRule, ctx: &RequestContext) -> Result<Url, GatewayError> {
        let base = self.services.base_url(rule.service);
        let rewritten = rule.rewrite(&ctx.original_path);
        let raw = format!("{}{}", base.trim_end_matches('/'), rewritten);
        Url::parse(&raw)
            .map_err(|e| GatewayError::LocalSetup(format!("malformed target URL {raw}: {e}")))
    }

    /// Execute exactly one outbound attempt. Any received response is
    /// `Ok`, including non-2xx; errors are already classified.
    pub async fn forward(
        &self,
        rule: &RouteRule,
        ctx: &RequestContext,
    ) -> Result<ProxyResponse, GatewayError> {
        let url = self.target_url(rule, ctx)?;
        let target = url.to_string();

        debug!(method = %ctx.method, target = %target, route = %rule.id, "proxying request");

        let mut request = self
            .client
            .request(ctx.method.clone(), url)
            .headers(outbound_headers(ctx));
        if !ctx.query.is_empty() {
            request = request.query(&ctx.query);
        }
        if !ctx.body.is_empty() {
            request = request.body(ctx.body.clone());
        }

        let response = request.send().await.map_err(|e| classify(e, &target))?;

        let status = response.status();
        let headers = relay_headers(response.headers());
        // Headers arrived, so "unreachable" would be misleading here;
        // the 502 detail names the interrupted body instead.
        let body = response.bytes().await.map_err(|e| {
            GatewayError::UpstreamUnreachable {
                target: target.clone(),
                detail: format!("response body interrupted: {}", error_detail(&e)),
            }
        })?;

        Ok(ProxyResponse { status, headers, body })
    }
}

/// Build the allow-listed outbound header set:
///
/// - `authorization`, `x-real-ip`, `user-agent`, `accept`: verbatim if present
/// - `content-type`: only when the request carries a body
/// - `x-forwarded-for`: inbound value (if any) + `, ` + client IP
/// - `host`: set by the client from the target URL, never copied from
///   the inbound request
///
/// Every other inbound header is dropped.
pub fn outbound_headers(ctx: &RequestContext) -> HeaderMap {
    let mut out = HeaderMap::new();

    for name in [AUTHORIZATION, X_REAL_IP, USER_AGENT, ACCEPT] {
        if let Some(value) = ctx.headers.get(&name) {
            out.insert(name, value.clone());
        }
    }

    if !ctx.body.is_empty()
        && let Some(value) = ctx.headers.get(CONTENT_TYPE)
    {
        out.insert(CONTENT_TYPE, value.clone());
    }

    let forwarded = match ctx
        .headers
        .get(&X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
    {
        Some(existing) => format!("{existing}, {}", ctx.client_ip()),
        None => ctx.client_ip().to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&forwarded) {
        out.insert(X_FORWARDED_FOR, value);
    }

    out
}

/// Strip hop-by-hop headers from an upstream response and re-assert
/// `content-type`/`content-length` explicitly when upstream supplied
/// them.
pub fn relay_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in upstream {
        if HOP_BY_HOP.contains(&name.as_str()) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    for name in [CONTENT_TYPE, CONTENT_LENGTH] {
        if let Some(value) = upstream.get(&name) {
            out.insert(name, value.clone());
        }
    }
    out
}

/// Two-way split of client errors: anything that failed before the
/// request left the process is a setup error, everything else means the
/// upstream never produced a usable response.
fn classify(e: reqwest::Error, target: &str) -> GatewayError {
    if e.is_builder() {
        return GatewayError::LocalSetup(error_detail(&e));
    }
    GatewayError::UpstreamUnreachable {
        target: target.to_string(),
        detail: error_detail(&e),
    }
}

/// Flatten the error source chain into one line, so the 502 payload
/// carries the low-level cause ("connection refused", DNS failure, …).
fn error_detail(e: &reqwest::Error) -> String {
    let mut detail = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        detail.push_str(": ");
        detail.push_str(&cause.to_string());
        source = cause.source();
    }
    detail
}
