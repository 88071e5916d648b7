use serde::{Deserialize, Serialize};

/// Roles recognized by the gateway's route table.
///
/// Serialized in UPPERCASE so the wire form matches the role strings
/// carried in issued tokens (`"USER"`, `"ADMIN"`, …).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Operator,
    Auditor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Operator => "OPERATOR",
            Role::Auditor => "AUDITOR",
            Role::Admin => "ADMIN",
        }
    }
}

/// Verified caller identity, produced by the authentication layer once
/// per request. Never persisted beyond the request's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaim {
    /// Stable subject identifier (the token's `sub`).
    pub subject_id: String,
    pub username: String,
    pub roles: Vec<Role>,
}

impl IdentityClaim {
    /// True when the claim holds at least one of `required`.
    /// Any single matching role suffices.
    pub fn has_any_role(&self, required: &[Role]) -> bool {
        self.roles.iter().any(|r| required.contains(r))
    }
}

/// Result of the per-request authentication step.
///
/// The gateway never sees raw credentials — only this outcome.
#[derive(Debug, Clone)]
pub enum AuthOutcome {
    /// Credentials were presented and verified.
    Verified(IdentityClaim),
    /// Credentials were presented but rejected (bad signature, expired, …).
    Rejected(String),
    /// No credentials on the request.
    NotAttempted,
}

impl AuthOutcome {
    pub fn claim(&self) -> Option<&IdentityClaim> {
        match self {
            AuthOutcome::Verified(claim) => Some(claim),
            _ => None,
        }
    }
}
