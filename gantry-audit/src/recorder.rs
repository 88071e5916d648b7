//! Non-blocking recorder: a bounded channel in front of the sink.
//!
//! `record` is a `try_send` — it never waits on disk, and a persistence
//! failure (full channel, sink error) is reported through tracing only.
//! The client-visible response is never altered or delayed by audit
//! durability.

use crate::entry::AuditLogEntry;
use crate::sink::AuditSink;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, warn};

#[derive(Clone)]
pub struct AuditRecorder {
    tx: mpsc::Sender<AuditLogEntry>,
}

impl AuditRecorder {
    /// Spawn the writer task. The returned handle completes once every
    /// sender clone is dropped and the channel is drained — await it on
    /// shutdown to flush pending records.
    pub fn spawn(sink: Arc<dyn AuditSink>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<AuditLogEntry>(capacity.max(1));
        let handle = tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                if let Err(e) = sink.persist(&entry).await {
                    error!(request_id = %entry.request_id, error = %e, "audit persistence failed");
                }
            }
        });
        (Self { tx }, handle)
    }

    /// Queue one record. Dropping a record under overload is logged but
    /// never surfaces to the caller.
    pub fn record(&self, entry: AuditLogEntry) {
        if let Err(e) = self.tx.try_send(entry) {
            let entry = match &e {
                mpsc::error::TrySendError::Full(entry) => entry,
                mpsc::error::TrySendError::Closed(entry) => entry,
            };
            warn!(request_id = %entry.request_id, "audit record dropped: {e}");
        }
    }
}
