use http::StatusCode;
use serde_json::json;
use thiserror::Error;

/// Gateway error taxonomy. Every failure the gateway itself produces is
/// exactly one of these; upstream non-2xx responses are not errors and
/// are relayed verbatim.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("no route matched: {0}")]
    RouteNotFound(String),

    #[error("authentication required: {0}")]
    Unauthenticated(String),

    #[error("insufficient role: {0}")]
    Forbidden(String),

    /// No response received from the backend (connection refused, DNS
    /// failure, timeout).
    #[error("upstream unreachable: {target}: {detail}")]
    UpstreamUnreachable { target: String, detail: String },

    /// Local failure constructing the outbound request.
    #[error("proxy setup error: {0}")]
    LocalSetup(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            GatewayError::Forbidden(_) => StatusCode::FORBIDDEN,
            GatewayError::UpstreamUnreachable { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::LocalSetup(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON error body. The 502 payload carries the attempted target
    /// URL alongside the low-level error detail.
    pub fn to_json_body(&self) -> Vec<u8> {
        let status = self.status_code().as_u16();
        let body = match self {
            GatewayError::UpstreamUnreachable { target, detail } => json!({
                "error": format!("upstream unreachable: {detail}"),
                "status": status,
                "targetUrl": target,
            }),
            other => json!({
                "error": other.to_string(),
                "status": status,
            }),
        };
        serde_json::to_vec(&body).unwrap_or_else(|_| b"{}".to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(
            GatewayError::RouteNotFound("/x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::Unauthenticated("no token".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            GatewayError::Forbidden("USER".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            GatewayError::UpstreamUnreachable {
                target: "http://e/x".into(),
                detail: "refused".into()
            }
            .status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            GatewayError::LocalSetup("bad url".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unreachable_body_includes_target_url() {
        let err = GatewayError::UpstreamUnreachable {
            target: "http://127.0.0.1:1/auth/login".into(),
            detail: "connection refused".into(),
        };
        let body: serde_json::Value = serde_json::from_slice(&err.to_json_body()).unwrap();
        assert_eq!(body["status"], 502);
        assert_eq!(body["targetUrl"], "http://127.0.0.1:1/auth/login");
        assert!(body["error"].as_str().unwrap().contains("connection refused"));
    }

    #[test]
    fn generic_body_has_error_and_status() {
        let err = GatewayError::RouteNotFound("/nope".into());
        let body: serde_json::Value = serde_json::from_slice(&err.to_json_body()).unwrap();
        assert_eq!(body["status"], 404);
        assert!(body["error"].as_str().unwrap().contains("/nope"));
        assert!(body.get("targetUrl").is_none());
    }

    #[test]
    fn body_is_valid_json_for_every_variant() {
        let variants = vec![
            GatewayError::RouteNotFound("/a".into()),
            GatewayError::Unauthenticated("x".into()),
            GatewayError::Forbidden("y".into()),
            GatewayError::UpstreamUnreachable { target: "t".into(), detail: "d".into() },
            GatewayError::LocalSetup("z".into()),
        ];
        for v in variants {
            let parsed: Result<serde_json::Value, _> = serde_json::from_slice(&v.to_json_body());
            assert!(parsed.is_ok(), "invalid JSON body for {v}");
        }
    }
}
