use crate::claims::{IdentityClaim, Role};

/// Terminal authorization decision, evaluated exactly once per request,
/// strictly before any outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthzDecision {
    Authorized,
    /// Credentials required but no verified claim was present.
    Unauthenticated,
    /// A verified claim was present but held none of the required roles.
    Forbidden,
}

/// Role gate. Fails closed: anything other than an explicit role
/// intersection (or a public route) is a denial.
///
/// - `required` empty ⇒ public route, always `Authorized`.
/// - no claim ⇒ `Unauthenticated`.
/// - claim without any required role ⇒ `Forbidden`.
pub fn authorize(claim: Option<&IdentityClaim>, required: &[Role]) -> AuthzDecision {
    if required.is_empty() {
        return AuthzDecision::Authorized;
    }
    match claim {
        None => AuthzDecision::Unauthenticated,
        Some(c) if c.has_any_role(required) => AuthzDecision::Authorized,
        Some(_) => AuthzDecision::Forbidden,
    }
}
