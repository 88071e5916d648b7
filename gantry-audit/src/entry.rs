//! Audit record schema.
//!
//! Serialized camelCase to stay line-compatible with the audit store
//! consumed by the compliance tooling. Every record is written once and
//! never mutated after persistence.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Did the authentication layer accept the presented credentials?
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationStatus {
    Success,
    Failure,
    /// No credentials were presented and the route did not require any.
    NotAttempted,
}

/// Did the role gate pass? `NotApplicable` when the request never
/// reached authorization (unmatched route, failed authentication).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    Success,
    Failure,
    NotApplicable,
}

/// One per-request audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub request_id: String,
    /// RFC 3339 UTC timestamp.
    pub timestamp: String,
    pub user_id: Option<String>,
    pub user_roles: Option<Vec<String>>,
    pub ip_address: String,
    pub http_method: String,
    /// Path plus query string as received from the client.
    pub original_url: String,
    /// Backend the request was routed to, absent on 404.
    pub routed_service: Option<String>,
    pub status_code: u16,
    pub user_agent: Option<String>,
    pub request_headers: Option<serde_json::Value>,
    pub request_body: Option<String>,
    pub response_body: Option<String>,
    /// SHA-256 hex digest of the raw request body, for integrity
    /// evidence without storing the payload itself.
    pub request_body_sha256: Option<String>,
    pub authentication_status: AuthenticationStatus,
    pub authorization_status: AuthorizationStatus,
    pub error_message: Option<String>,
}

impl AuditLogEntry {
    /// Minimal record; callers fill the outcome fields before handing
    /// it to the recorder.
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            timestamp: Utc::now().to_rfc3339(),
            user_id: None,
            user_roles: None,
            ip_address: String::new(),
            http_method: String::new(),
            original_url: String::new(),
            routed_service: None,
            status_code: 0,
            user_agent: None,
            request_headers: None,
            request_body: None,
            response_body: None,
            request_body_sha256: None,
            authentication_status: AuthenticationStatus::NotAttempted,
            authorization_status: AuthorizationStatus::NotApplicable,
            error_message: None,
        }
    }

    /// Compact JSON line for the append-only store.
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Hex SHA-256 of a request body. `None` for empty bodies.
pub fn body_digest(body: &[u8]) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    Some(hex::encode(Sha256::digest(body)))
}
