use crate::entry::AuditLogEntry;
use crate::file_store::FileStore;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Destination for audit records. One entry per call; implementations
/// must not block the request path (the recorder already decouples
/// them, but sinks should still keep writes short).
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn persist(&self, entry: &AuditLogEntry) -> anyhow::Result<()>;
}

/// Sink backed by the rotating JSONL [`FileStore`].
pub struct FileSink {
    store: FileStore,
}

impl FileSink {
    pub fn new(store: FileStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AuditSink for FileSink {
    async fn persist(&self, entry: &AuditLogEntry) -> anyhow::Result<()> {
        self.store.append(&entry.to_json_line())?;
        Ok(())
    }
}

/// In-memory sink for tests and buffering scenarios.
#[derive(Default)]
pub struct MemorySink {
    entries: Mutex<Vec<AuditLogEntry>>,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn entries(&self) -> Vec<AuditLogEntry> {
        self.entries.lock().expect("memory sink lock").clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("memory sink lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditSink for MemorySink {
    async fn persist(&self, entry: &AuditLogEntry) -> anyhow::Result<()> {
        self.entries.lock().expect("memory sink lock").push(entry.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_sink_stores_entries_in_order() {
        let sink = MemorySink::new();
        sink.persist(&AuditLogEntry::new("a")).await.unwrap();
        sink.persist(&AuditLogEntry::new("b")).await.unwrap();
        let entries = sink.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].request_id, "a");
        assert_eq!(entries[1].request_id, "b");
    }

    #[tokio::test]
    async fn file_sink_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let sink = FileSink::new(FileStore::open(&path, 0, 0).unwrap());

        let mut entry = AuditLogEntry::new("req-9");
        entry.status_code = 404;
        sink.persist(&entry).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(parsed["requestId"], "req-9");
        assert_eq!(parsed["statusCode"], 404);
    }
}
