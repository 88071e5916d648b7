//! Request orchestrator.
//!
//! Stages are strictly sequential per request: resolve → authorize →
//! forward → record. Authorization failures short-circuit before any
//! outbound call, and every terminal outcome — including 404/401/403
//! and both upstream failure classes — produces exactly one audit
//! record.

use crate::forwarder::Forwarder;
use gantry_audit::entry::{self, AuditLogEntry, AuthenticationStatus, AuthorizationStatus};
use gantry_audit::recorder::AuditRecorder;
use gantry_core::authz::{AuthzDecision, authorize};
use gantry_core::claims::AuthOutcome;
use gantry_core::config::AuditConfig;
use gantry_core::context::{ProxyResponse, RequestContext};
use gantry_core::error::GatewayError;
use gantry_core::resolver::RouteTable;
use serde_json::json;
use tracing::info;

/// Cap on bodies captured into audit records.
const CAPTURED_BODY_LIMIT: usize = 8 * 1024;

/// What the audit record may capture beyond the mandatory fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureOptions {
    pub request_headers: bool,
    pub bodies: bool,
    pub body_hash: bool,
}

impl From<&AuditConfig> for CaptureOptions {
    fn from(cfg: &AuditConfig) -> Self {
        Self {
            request_headers: cfg.capture_request_headers,
            bodies: cfg.capture_bodies,
            body_hash: cfg.hash_request_body,
        }
    }
}

pub struct Gateway {
    routes: RouteTable,
    forwarder: Forwarder,
    recorder: AuditRecorder,
    capture: CaptureOptions,
}

impl Gateway {
    pub fn new(
        routes: RouteTable,
        forwarder: Forwarder,
        recorder: AuditRecorder,
        capture: CaptureOptions,
    ) -> Self {
        Self { routes, forwarder, recorder, capture }
    }

    /// Drive one request to a terminal outcome. Infallible from the
    /// caller's perspective: every failure is already a response.
    pub async fn handle(&self, ctx: RequestContext, auth: AuthOutcome) -> ProxyResponse {
        let rule = self.routes.resolve(&ctx.method, &ctx.original_path);

        let (response, authz_status, error) = match rule {
            None => {
                let err = GatewayError::RouteNotFound(ctx.original_path.clone());
                (error_response(&err), AuthorizationStatus::NotApplicable, Some(err))
            }
            Some(rule) => match authorize(auth.claim(), &rule.required_roles) {
                AuthzDecision::Unauthenticated => {
                    let err = GatewayError::Unauthenticated(format!(
                        "route {} requires a verified identity",
                        rule.id
                    ));
                    (error_response(&err), AuthorizationStatus::NotApplicable, Some(err))
                }
                AuthzDecision::Forbidden => {
                    let err = GatewayError::Forbidden(format!(
                        "no role grants access to route {}",
                        rule.id
                    ));
                    (error_response(&err), AuthorizationStatus::Failure, Some(err))
                }
                AuthzDecision::Authorized => match self.forwarder.forward(rule, &ctx).await {
                    Ok(upstream) => (upstream, AuthorizationStatus::Success, None),
                    Err(err) => (error_response(&err), AuthorizationStatus::Success, Some(err)),
                },
            },
        };

        info!(
            request_id = %ctx.request_id,
            method = %ctx.method,
            path = %ctx.original_path,
            status = response.status.as_u16(),
            route = rule.map(|r| r.id.as_str()).unwrap_or("-"),
            "request completed"
        );

        let entry = self.build_entry(&ctx, &auth, rule.map(|r| r.service.as_str()), &response, authz_status, error);
        self.recorder.record(entry);

        response
    }

    fn build_entry(
        &self,
        ctx: &RequestContext,
        auth: &AuthOutcome,
        routed_service: Option<&str>,
        response: &ProxyResponse,
        authorization_status: AuthorizationStatus,
        error: Option<GatewayError>,
    ) -> AuditLogEntry {
        let mut e = AuditLogEntry::new(ctx.request_id.clone());
        e.ip_address = ctx.client_ip().to_string();
        e.http_method = ctx.method.to_string();
        e.original_url = ctx.original_url();
        e.routed_service = routed_service.map(str::to_string);
        e.status_code = response.status.as_u16();
        e.user_agent = ctx.user_agent().map(str::to_string);
        e.authorization_status = authorization_status;

        if let Some(claim) = auth.claim() {
            e.user_id = Some(claim.subject_id.clone());
            e.user_roles = Some(claim.roles.iter().map(|r| r.as_str().to_string()).collect());
        }

        e.authentication_status = match auth {
            AuthOutcome::Verified(_) => AuthenticationStatus::Success,
            AuthOutcome::Rejected(_) => AuthenticationStatus::Failure,
            // Credentials were required but never presented: the
            // authentication gate itself failed the request. A 401 the
            // upstream produced on a public route is not our failure.
            AuthOutcome::NotAttempted
                if matches!(&error, Some(GatewayError::Unauthenticated(_))) =>
            {
                AuthenticationStatus::Failure
            }
            AuthOutcome::NotAttempted => AuthenticationStatus::NotAttempted,
        };

        e.error_message = error.map(|err| err.to_string());

        if self.capture.request_headers {
            let headers: serde_json::Map<String, serde_json::Value> = ctx
                .headers
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        json!(String::from_utf8_lossy(value.as_bytes())),
                    )
                })
                .collect();
            e.request_headers = Some(serde_json::Value::Object(headers));
        }
        if self.capture.bodies {
            if !ctx.body.is_empty() {
                e.request_body = Some(truncated_lossy(&ctx.body));
            }
            if response.status.is_client_error() || response.status.is_server_error() {
                e.response_body = Some(truncated_lossy(&response.body));
            }
        }
        if self.capture.body_hash {
            e.request_body_sha256 = entry::body_digest(&ctx.body);
        }

        e
    }
}

fn error_response(err: &GatewayError) -> ProxyResponse {
    ProxyResponse::json(err.status_code(), err.to_json_body())
}

fn truncated_lossy(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let mut text = text.into_owned();
    if text.len() > CAPTURED_BODY_LIMIT {
        let mut cut = CAPTURED_BODY_LIMIT;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
    }
    text
}
