use crate::claims::Role;
use crate::route::{RouteRule, ServiceKey};
use http::Method;
use tracing::warn;

/// Ordered, immutable route table.
///
/// Resolution is first-match-wins over the registration order, so more
/// specific prefixes (e.g. `/api/admin/reward-logs`) must be registered
/// before broader overlapping ones (e.g. `/api/events` before a
/// hypothetical `/api` catch-all). [`RouteTable::new`] logs a warning
/// for any rule shadowed by an earlier one, making the precedence
/// auditable instead of incidental.
#[derive(Debug, Clone)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

impl RouteTable {
    pub fn new(rules: Vec<RouteRule>) -> Self {
        for (i, rule) in rules.iter().enumerate() {
            for earlier in &rules[..i] {
                if rule.path_prefix.starts_with(&earlier.path_prefix)
                    && earlier.methods.is_empty()
                {
                    warn!(
                        shadowed = %rule.id,
                        by = %earlier.id,
                        "route rule is shadowed by an earlier, broader prefix"
                    );
                }
            }
        }
        Self { rules }
    }

    /// The built-in table for the event/reward platform:
    ///
    /// | prefix                   | roles                    | target | rewrite              |
    /// |--------------------------|--------------------------|--------|----------------------|
    /// | `/api/admin/reward-logs` | AUDITOR, OPERATOR, ADMIN | event  | `/admin/reward-logs` |
    /// | `/api/events`            | OPERATOR, ADMIN          | event  | `/events`            |
    /// | `/api/rewards`           | USER                     | event  | `/rewards`           |
    /// | `/api/auth`              | public                   | auth   | `/auth`              |
    ///
    /// `reward-logs` is registered first because `/api/admin/reward-logs`
    /// must win over any broader overlapping prefix added later.
    pub fn standard() -> Self {
        Self::new(vec![
            RouteRule::new(
                "reward-logs",
                "/api/admin/reward-logs",
                "/admin/reward-logs",
                ServiceKey::Event,
                vec![Role::Auditor, Role::Operator, Role::Admin],
            )
            .with_methods(vec![Method::GET]),
            RouteRule::new(
                "events",
                "/api/events",
                "/events",
                ServiceKey::Event,
                vec![Role::Operator, Role::Admin],
            ),
            RouteRule::new(
                "rewards",
                "/api/rewards",
                "/rewards",
                ServiceKey::Event,
                vec![Role::User],
            ),
            RouteRule::new("auth", "/api/auth", "/auth", ServiceKey::Auth, vec![]),
        ])
    }

    /// Resolve a request to at most one rule. `None` maps to 404 at the
    /// gateway boundary.
    pub fn resolve(&self, method: &Method, path: &str) -> Option<&RouteRule> {
        self.rules.iter().find(|r| r.matches(method, path))
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_resolves_each_prefix() {
        let table = RouteTable::standard();
        assert_eq!(table.resolve(&Method::POST, "/api/events/1").unwrap().id, "events");
        assert_eq!(table.resolve(&Method::POST, "/api/rewards/req").unwrap().id, "rewards");
        assert_eq!(table.resolve(&Method::POST, "/api/auth/login").unwrap().id, "auth");
        assert_eq!(
            table.resolve(&Method::GET, "/api/admin/reward-logs").unwrap().id,
            "reward-logs"
        );
    }

    #[test]
    fn unmatched_path_resolves_to_none() {
        let table = RouteTable::standard();
        assert!(table.resolve(&Method::GET, "/api/unknown").is_none());
        assert!(table.resolve(&Method::GET, "/").is_none());
    }

    #[test]
    fn more_specific_prefix_wins_by_registration_order() {
        // If /api/admin/reward-logs were registered after a broader
        // overlapping prefix, the broad rule would win. The standard
        // table registers it first.
        let table = RouteTable::standard();
        let rule = table.resolve(&Method::GET, "/api/admin/reward-logs").unwrap();
        assert_eq!(rule.service, ServiceKey::Event);
        assert_eq!(rule.rewrite_prefix, "/admin/reward-logs");
    }

    #[test]
    fn first_match_wins_for_overlapping_rules() {
        let table = RouteTable::new(vec![
            RouteRule::new("narrow", "/api/x/y", "/y", ServiceKey::Event, vec![]),
            RouteRule::new("broad", "/api/x", "/x", ServiceKey::Event, vec![]),
        ]);
        assert_eq!(table.resolve(&Method::GET, "/api/x/y/z").unwrap().id, "narrow");
        assert_eq!(table.resolve(&Method::GET, "/api/x/other").unwrap().id, "broad");
    }

    #[test]
    fn reward_logs_is_get_only() {
        let table = RouteTable::standard();
        assert!(table.resolve(&Method::POST, "/api/admin/reward-logs").is_none());
    }

    #[test]
    fn resolution_is_deterministic() {
        let table = RouteTable::standard();
        for _ in 0..3 {
            assert_eq!(table.resolve(&Method::GET, "/api/events/9").unwrap().id, "events");
        }
    }
}
