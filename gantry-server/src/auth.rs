//! Bearer-token verification.
//!
//! Tokens are HS256 JWTs carrying the subject, username, and role set.
//! Verification happens once per request, before routing; the outcome
//! is threaded through the gateway as an [`AuthOutcome`] so public
//! routes can proceed even when credentials are absent or bad.

use gantry_core::claims::{AuthOutcome, IdentityClaim, Role};
use gantry_core::config::JwtConfig;
use http::HeaderValue;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

/// Wire shape of the token payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub username: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    pub exp: i64,
}

pub struct Authenticator {
    key: DecodingKey,
    validation: Validation,
}

impl Authenticator {
    pub fn new(cfg: &JwtConfig) -> Self {
        // Validation::new enables exp checking; expired tokens are
        // rejected, never treated as anonymous.
        let validation = Validation::new(Algorithm::HS256);
        Self {
            key: DecodingKey::from_secret(cfg.secret.as_bytes()),
            validation,
        }
    }

    /// Classify the request's credentials. `None` header means the
    /// client never attempted authentication; anything present that
    /// fails to verify is a rejection.
    pub fn authenticate(&self, header: Option<&HeaderValue>) -> AuthOutcome {
        let Some(value) = header else {
            return AuthOutcome::NotAttempted;
        };
        let Ok(raw) = value.to_str() else {
            return AuthOutcome::Rejected("authorization header is not valid UTF-8".into());
        };

        // Strip "Bearer " prefix if present
        let token = raw
            .strip_prefix("Bearer ")
            .or_else(|| raw.strip_prefix("bearer "))
            .unwrap_or(raw)
            .trim();
        if token.is_empty() {
            return AuthOutcome::Rejected("empty bearer token".into());
        }

        match decode::<JwtClaims>(token, &self.key, &self.validation) {
            Ok(data) => AuthOutcome::Verified(IdentityClaim {
                subject_id: data.claims.sub,
                username: data.claims.username,
                roles: data.claims.roles,
            }),
            Err(e) => AuthOutcome::Rejected(format!("token verification failed: {e}")),
        }
    }
}
