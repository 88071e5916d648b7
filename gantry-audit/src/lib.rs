//! Audit trail for the gateway: one immutable record per inbound
//! request, regardless of outcome.
//!
//! Records are JSON lines shipped through a bounded channel to a
//! rotating file store, so persistence never sits on the request path.

pub mod entry;
pub mod file_store;
pub mod recorder;
pub mod sink;

pub use entry::{AuditLogEntry, AuthenticationStatus, AuthorizationStatus};
pub use file_store::FileStore;
pub use recorder::AuditRecorder;
pub use sink::{AuditSink, FileSink, MemorySink};
