use crate::route::ServiceKey;
use figment::{Figment, providers::{Env, Format, Yaml}};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level gateway configuration.
///
/// Constructed once at startup and passed explicitly into the resolver,
/// forwarder, and recorder — there is no process-wide singleton.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GantryConfig {
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub services: ServiceConfig,
    #[serde(default)]
    pub jwt: JwtConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

/// Front-end listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenConfig {
    #[serde(default = "default_listen_addr")]
    pub addr: String,
}

/// Backend base URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_event_url")]
    pub event_url: String,
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
}

impl ServiceConfig {
    pub fn base_url(&self, key: ServiceKey) -> &str {
        match key {
            ServiceKey::Event => &self.event_url,
            ServiceKey::Auth => &self.auth_url,
        }
    }
}

/// Bearer-token verification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    #[serde(default = "default_jwt_secret")]
    pub secret: String,
}

/// Outbound client settings. One inbound request yields at most one
/// outbound attempt; there is no retry knob on purpose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

/// Audit persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_audit_path")]
    pub file_path: PathBuf,
    /// 0 disables size-based rotation.
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
    /// 0 keeps every rotated file.
    #[serde(default = "default_max_rotated")]
    pub max_rotated_files: usize,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Capture inbound headers into the audit record.
    #[serde(default)]
    pub capture_request_headers: bool,
    /// Capture request body (and response body on error outcomes).
    #[serde(default)]
    pub capture_bodies: bool,
    /// Record a SHA-256 digest of the request body.
    #[serde(default = "default_true")]
    pub hash_request_body: bool,
}

// ── Defaults ──────────────────────────────────────────────────

fn default_listen_addr() -> String { "0.0.0.0:3000".into() }
fn default_event_url() -> String { "http://127.0.0.1:8081".into() }
fn default_auth_url() -> String { "http://127.0.0.1:8082".into() }
fn default_jwt_secret() -> String { "change-me".into() }
fn default_connect_timeout() -> u64 { 2000 }
fn default_request_timeout() -> u64 { 10_000 }
fn default_audit_path() -> PathBuf { PathBuf::from("data/audit.log") }
fn default_max_file_size() -> u64 { 100 * 1024 * 1024 }
fn default_max_rotated() -> usize { 30 }
fn default_channel_capacity() -> usize { 4096 }
fn default_true() -> bool { true }

impl Default for ListenConfig {
    fn default() -> Self {
        Self { addr: default_listen_addr() }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            event_url: default_event_url(),
            auth_url: default_auth_url(),
        }
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self { secret: default_jwt_secret() }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            file_path: default_audit_path(),
            max_file_size_bytes: default_max_file_size(),
            max_rotated_files: default_max_rotated(),
            channel_capacity: default_channel_capacity(),
            capture_request_headers: false,
            capture_bodies: false,
            hash_request_body: default_true(),
        }
    }
}

impl GantryConfig {
    /// Load configuration from a YAML file plus `GANTRY_`-prefixed env
    /// overrides (`GANTRY_SERVICES__EVENT_URL=…`).
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config: GantryConfig = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("GANTRY_").split("__"))
            .extract()?;
        Ok(config)
    }
}
