use crate::claims::Role;
use http::Method;
use serde::{Deserialize, Serialize};

/// Logical backend a route forwards to. The actual base URL comes from
/// configuration (`ServiceConfig::base_url`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKey {
    Event,
    Auth,
}

impl ServiceKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKey::Event => "event",
            ServiceKey::Auth => "auth",
        }
    }
}

/// Static mapping from a path prefix to a backend service, path rewrite,
/// and required roles. Loaded once at startup, immutable thereafter.
#[derive(Debug, Clone)]
pub struct RouteRule {
    /// Stable identifier, used in logs and audit records.
    pub id: String,
    /// Inbound prefix. Matching is `starts_with` with an implicit
    /// wildcard suffix: `/api/events` matches `/api/events/123`.
    pub path_prefix: String,
    /// Prefix substituted for `path_prefix` on the outbound path.
    pub rewrite_prefix: String,
    pub service: ServiceKey,
    /// Empty means the route is public.
    pub required_roles: Vec<Role>,
    /// Allowed methods. Empty means any method.
    pub methods: Vec<Method>,
}

impl RouteRule {
    pub fn new(
        id: impl Into<String>,
        path_prefix: impl Into<String>,
        rewrite_prefix: impl Into<String>,
        service: ServiceKey,
        required_roles: Vec<Role>,
    ) -> Self {
        Self {
            id: id.into(),
            path_prefix: path_prefix.into(),
            rewrite_prefix: rewrite_prefix.into(),
            service,
            required_roles,
            methods: Vec::new(),
        }
    }

    /// Restrict the rule to specific methods.
    pub fn with_methods(mut self, methods: Vec<Method>) -> Self {
        self.methods = methods;
        self
    }

    pub fn is_public(&self) -> bool {
        self.required_roles.is_empty()
    }

    pub fn method_allowed(&self, method: &Method) -> bool {
        self.methods.is_empty() || self.methods.contains(method)
    }

    pub fn matches(&self, method: &Method, path: &str) -> bool {
        path.starts_with(&self.path_prefix) && self.method_allowed(method)
    }

    /// Rewrite a matched inbound path for the outbound request.
    ///
    /// Defined only for paths that already matched this rule, and not
    /// idempotent on already-rewritten paths — call it exactly once per
    /// original inbound path.
    pub fn rewrite(&self, path: &str) -> String {
        let rest = path.strip_prefix(&self.path_prefix).unwrap_or(path);
        format!("{}{}", self.rewrite_prefix, rest)
    }
}
