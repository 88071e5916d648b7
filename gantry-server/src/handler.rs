//! Axum front-end: turns an inbound hyper request into a
//! [`RequestContext`], runs it through the gateway, and converts the
//! outcome back into an axum response.

use crate::auth::Authenticator;
use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::Request;
use axum::response::{IntoResponse, Json, Response};
use gantry_core::context::{ProxyResponse, RequestContext};
use gantry_proxy::Gateway;
use http::{HeaderMap, StatusCode, header};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::warn;

/// Inbound body cap. Larger payloads are refused before any routing.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub authenticator: Arc<Authenticator>,
}

/// Fallback handler: every path that is not `/health` lands here.
pub async fn proxy_entry(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let (parts, body) = request.into_parts();

    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %parts.uri.path(), error = %e, "failed to read request body");
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                [(header::CONTENT_TYPE, "application/json")],
                format!(r#"{{"error":"request body too large","status":{}}}"#, StatusCode::PAYLOAD_TOO_LARGE.as_u16()),
            )
                .into_response();
        }
    };

    let auth = state
        .authenticator
        .authenticate(parts.headers.get(header::AUTHORIZATION));

    let mut ctx = RequestContext::new(parts.method, parts.uri.path(), remote.ip().to_string());
    ctx.client_ip_chain = forwarded_chain(&parts.headers);
    ctx.headers = parts.headers;
    ctx.body = body;
    if let Some(query) = parts.uri.query() {
        ctx.query = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
    }

    into_axum(state.gateway.handle(ctx, auth).await)
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Inbound `x-forwarded-for` as an ordered list, left-most first.
fn forwarded_chain(headers: &HeaderMap) -> Vec<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn into_axum(resp: ProxyResponse) -> Response {
    let mut out = Response::new(Body::from(resp.body));
    *out.status_mut() = resp.status;
    *out.headers_mut() = resp.headers;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::routing::get;
    use bytes::Bytes;
    use gantry_audit::recorder::AuditRecorder;
    use gantry_audit::sink::MemorySink;
    use gantry_core::config::{JwtConfig, ServiceConfig, UpstreamConfig};
    use gantry_core::resolver::RouteTable;
    use gantry_proxy::forwarder::Forwarder;
    use gantry_proxy::gateway::CaptureOptions;
    use http::HeaderValue;
    use tokio::task::JoinHandle;
    use tower::ServiceExt;

    fn test_state(sink: std::sync::Arc<MemorySink>) -> (AppState, JoinHandle<()>) {
        // Both upstreams point at a closed port; these tests exercise
        // the handler boundary, not forwarding.
        let services = ServiceConfig {
            event_url: "http://127.0.0.1:1".into(),
            auth_url: "http://127.0.0.1:1".into(),
        };
        let forwarder = Forwarder::new(services, &UpstreamConfig::default()).unwrap();
        let (recorder, task) = AuditRecorder::spawn(sink, 16);
        let state = AppState {
            gateway: Arc::new(Gateway::new(
                RouteTable::standard(),
                forwarder,
                recorder,
                CaptureOptions::default(),
            )),
            authenticator: Arc::new(Authenticator::new(&JwtConfig { secret: "s".into() })),
        };
        (state, task)
    }

    fn test_router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health))
            .fallback(proxy_entry)
            .with_state(state)
    }

    fn with_peer(mut request: Request<Body>) -> Request<Body> {
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 55555))));
        request
    }

    #[tokio::test]
    async fn health_answers_ok_without_touching_the_gateway() {
        let sink = MemorySink::new();
        let (state, _task) = test_state(sink.clone());

        let request = with_peer(Request::builder().uri("/health").body(Body::empty()).unwrap());
        let response = test_router(state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert!(sink.is_empty(), "liveness checks are not audited");
    }

    #[tokio::test]
    async fn oversized_body_is_refused_before_routing() {
        let sink = MemorySink::new();
        let (state, _task) = test_state(sink.clone());

        let request = with_peer(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .body(Body::from(vec![0u8; MAX_BODY_BYTES + 1]))
                .unwrap(),
        );
        let response = test_router(state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(sink.is_empty(), "refused before a request context exists");
    }

    #[tokio::test]
    async fn query_string_lands_in_the_request_context() {
        let sink = MemorySink::new();
        let (state, task) = test_state(sink.clone());

        let request = with_peer(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login?next=%2Fhome&lang=en")
                .body(Body::empty())
                .unwrap(),
        );
        let response = test_router(state).oneshot(request).await.unwrap();

        // Dead upstream, so the pipeline terminates at 502; the audit
        // record still proves the query was parsed into the context.
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        task.await.unwrap();
        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].original_url, "/api/auth/login?next=/home&lang=en");
    }

    #[test]
    fn forwarded_chain_splits_and_trims() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 198.51.100.1 ,10.0.0.1"),
        );
        assert_eq!(
            forwarded_chain(&headers),
            vec!["203.0.113.7", "198.51.100.1", "10.0.0.1"]
        );
    }

    #[test]
    fn forwarded_chain_is_empty_without_header() {
        assert!(forwarded_chain(&HeaderMap::new()).is_empty());
    }

    #[test]
    fn into_axum_preserves_status_headers_and_body() {
        let mut headers = HeaderMap::new();
        headers.insert("x-upstream", HeaderValue::from_static("yes"));
        let resp = ProxyResponse {
            status: StatusCode::CREATED,
            headers,
            body: Bytes::from_static(b"done"),
        };
        let out = into_axum(resp);
        assert_eq!(out.status(), StatusCode::CREATED);
        assert_eq!(out.headers().get("x-upstream").unwrap(), "yes");
    }
}
