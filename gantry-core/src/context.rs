use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use uuid::Uuid;

/// Everything the gateway needs to know about one inbound request.
/// Scoped to that request; dropped when the response is written.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique per-request identifier, also the audit record key.
    pub request_id: String,
    pub method: Method,
    /// Inbound path before any rewrite.
    pub original_path: String,
    /// Decoded query pairs, forwarded as request parameters — never
    /// concatenated back into the path string.
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Client IP chain as seen in the inbound `x-forwarded-for`,
    /// left-most entry first.
    pub client_ip_chain: Vec<String>,
    /// Connection-level peer address.
    pub remote_addr: String,
}

impl RequestContext {
    pub fn new(method: Method, original_path: impl Into<String>, remote_addr: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            method,
            original_path: original_path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            client_ip_chain: Vec::new(),
            remote_addr: remote_addr.into(),
        }
    }

    /// Effective client IP: left-most of the known chain, else the
    /// connection-level address.
    pub fn client_ip(&self) -> &str {
        self.client_ip_chain
            .first()
            .map(String::as_str)
            .unwrap_or(&self.remote_addr)
    }

    /// Path plus query string, as the client sent it.
    pub fn original_url(&self) -> String {
        match self.raw_query() {
            Some(q) => format!("{}?{}", self.original_path, q),
            None => self.original_path.clone(),
        }
    }

    fn raw_query(&self) -> Option<String> {
        if self.query.is_empty() {
            return None;
        }
        let joined = self
            .query
            .iter()
            .map(|(k, v)| if v.is_empty() { k.clone() } else { format!("{k}={v}") })
            .collect::<Vec<_>>()
            .join("&");
        Some(joined)
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.headers
            .get(http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
    }
}

/// What the gateway sends back to the client.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ProxyResponse {
    /// JSON error response, the shape used for every gateway-generated
    /// failure (404/401/403/502/500).
    pub fn json(status: StatusCode, body: Vec<u8>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        Self {
            status,
            headers,
            body: Bytes::from(body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_ip_prefers_leftmost_chain_entry() {
        let mut ctx = RequestContext::new(Method::GET, "/api/events", "10.0.0.9");
        ctx.client_ip_chain = vec!["203.0.113.7".into(), "198.51.100.1".into()];
        assert_eq!(ctx.client_ip(), "203.0.113.7");
    }

    #[test]
    fn client_ip_falls_back_to_remote_addr() {
        let ctx = RequestContext::new(Method::GET, "/api/events", "10.0.0.9");
        assert_eq!(ctx.client_ip(), "10.0.0.9");
    }

    #[test]
    fn original_url_includes_query() {
        let mut ctx = RequestContext::new(Method::GET, "/api/admin/reward-logs", "1.2.3.4");
        ctx.query = vec![("from".into(), "2024-01-01".into())];
        assert_eq!(ctx.original_url(), "/api/admin/reward-logs?from=2024-01-01");
    }

    #[test]
    fn original_url_without_query_is_plain_path() {
        let ctx = RequestContext::new(Method::GET, "/api/events/3", "1.2.3.4");
        assert_eq!(ctx.original_url(), "/api/events/3");
    }

    #[test]
    fn request_ids_are_unique() {
        let a = RequestContext::new(Method::GET, "/", "1.1.1.1");
        let b = RequestContext::new(Method::GET, "/", "1.1.1.1");
        assert_ne!(a.request_id, b.request_id);
    }

    #[test]
    fn json_response_sets_content_type() {
        let resp = ProxyResponse::json(StatusCode::NOT_FOUND, b"{}".to_vec());
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
        assert_eq!(
            resp.headers.get(http::header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }
}
