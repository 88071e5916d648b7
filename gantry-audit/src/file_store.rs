//! Append-only JSONL audit store with daily and size-based rotation.
//!
//! The current file is renamed with a date suffix at UTC midnight
//! (`audit.log` → `audit.log.2025-01-15`) or when it exceeds the
//! configured size; old rotated files beyond the keep limit are pruned.

use chrono::{NaiveDate, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Rotating file-backed audit store. Thread-safe; accepts one JSON line
/// per call.
pub struct FileStore {
    path: PathBuf,
    /// 0 = size-based rotation disabled.
    max_size_bytes: u64,
    /// 0 = keep all rotated files.
    keep_rotated: usize,
    state: Mutex<OpenFile>,
}

struct OpenFile {
    writer: Option<BufWriter<File>>,
    opened_on: NaiveDate,
    written: u64,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>, max_size_bytes: u64, keep_rotated: usize) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let file = Self::open_append(&path)?;
        let written = file.metadata()?.len();
        info!(path = %path.display(), "audit store opened");

        Ok(Self {
            path,
            max_size_bytes,
            keep_rotated,
            state: Mutex::new(OpenFile {
                writer: Some(BufWriter::new(file)),
                opened_on: Utc::now().date_naive(),
                written,
            }),
        })
    }

    /// Append one JSON line, rotating first if the date changed or the
    /// size limit was crossed.
    pub fn append(&self, line: &str) -> io::Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| io::Error::other("audit store lock poisoned"))?;

        let today = Utc::now().date_naive();
        let over_size = self.max_size_bytes > 0 && state.written >= self.max_size_bytes;

        if today != state.opened_on || over_size {
            let suffix = if today != state.opened_on {
                state.opened_on.format("%Y-%m-%d").to_string()
            } else {
                Utc::now().format("%Y-%m-%d-%H%M%S").to_string()
            };
            self.rotate(&mut state, &suffix, today)?;
        }

        let writer = state
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::other("audit store has no open file"))?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        state.written += line.len() as u64 + 1;
        Ok(())
    }

    pub fn flush(&self) -> io::Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| io::Error::other("audit store lock poisoned"))?;
        match state.writer.as_mut() {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }

    fn rotate(&self, state: &mut OpenFile, suffix: &str, today: NaiveDate) -> io::Result<()> {
        if let Some(mut w) = state.writer.take() {
            w.flush()?;
        }

        let rotated = rotated_path(&self.path, suffix);
        if self.path.exists() {
            match fs::rename(&self.path, &rotated) {
                Ok(()) => info!(to = %rotated.display(), "rotated audit log"),
                Err(e) => warn!(error = %e, to = %rotated.display(), "audit log rotation failed"),
            }
        }

        if self.keep_rotated > 0
            && let Err(e) = prune_rotated(&self.path, self.keep_rotated)
        {
            warn!(error = %e, "failed to prune rotated audit logs");
        }

        state.writer = Some(BufWriter::new(Self::open_append(&self.path)?));
        state.opened_on = today;
        state.written = 0;
        Ok(())
    }

    fn open_append(path: &Path) -> io::Result<File> {
        OpenOptions::new().create(true).append(true).open(path)
    }
}

/// `audit.log` + `2025-01-15` → `audit.log.2025-01-15`.
fn rotated_path(base: &Path, suffix: &str) -> PathBuf {
    let mut p = base.as_os_str().to_owned();
    p.push(".");
    p.push(suffix);
    PathBuf::from(p)
}

/// Delete the oldest rotated files, keeping the newest `keep`. Suffixes
/// are dates, so lexicographic order is chronological.
fn prune_rotated(base: &Path, keep: usize) -> io::Result<()> {
    let parent = base.parent().unwrap_or(Path::new("."));
    let base_name = base.file_name().unwrap_or_default().to_string_lossy().into_owned();

    let mut rotated: Vec<PathBuf> = fs::read_dir(parent)?
        .filter_map(|e| e.ok())
        .filter(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            name.len() > base_name.len() + 1 && name.starts_with(&base_name)
                && name.as_bytes()[base_name.len()] == b'.'
        })
        .map(|e| e.path())
        .collect();
    rotated.sort();

    for path in rotated.iter().rev().skip(keep) {
        debug!(path = %path.display(), "pruning rotated audit log");
        fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn temp_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    fn read(path: &Path) -> String {
        let mut s = String::new();
        File::open(path).unwrap().read_to_string(&mut s).unwrap();
        s
    }

    #[test]
    fn rotated_path_appends_suffix() {
        assert_eq!(
            rotated_path(Path::new("/var/log/audit.log"), "2025-01-15"),
            PathBuf::from("/var/log/audit.log.2025-01-15")
        );
    }

    #[test]
    fn append_writes_newline_terminated_lines() {
        let dir = temp_dir();
        let path = dir.path().join("audit.log");
        let store = FileStore::open(&path, 0, 0).unwrap();
        store.append(r#"{"requestId":"a"}"#).unwrap();
        store.append(r#"{"requestId":"b"}"#).unwrap();

        let content = read(&path);
        let lines: Vec<&str> = content.trim().lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"a\""));
        assert!(content.ends_with('\n'));
    }

    #[test]
    fn open_creates_missing_parent_directories() {
        let dir = temp_dir();
        let path = dir.path().join("nested").join("deep").join("audit.log");
        let store = FileStore::open(&path, 0, 0).unwrap();
        store.append("x").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn size_rotation_moves_full_file_aside() {
        let dir = temp_dir();
        let path = dir.path().join("audit.log");
        let store = FileStore::open(&path, 16, 5).unwrap();

        store.append("0123456789abcdefgh").unwrap(); // 19 bytes > 16
        store.append("after-rotation").unwrap();

        assert!(read(&path).contains("after-rotation"));
        let rotated: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("audit.log."))
            .collect();
        assert_eq!(rotated.len(), 1, "expected exactly one rotated file");
    }

    #[test]
    fn prune_keeps_newest_files() {
        let dir = temp_dir();
        let base = dir.path().join("audit.log");
        for day in 1..=5 {
            File::create(dir.path().join(format!("audit.log.2025-02-{day:02}"))).unwrap();
        }

        prune_rotated(&base, 2).unwrap();

        let mut remaining: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        remaining.sort();
        assert_eq!(remaining, vec!["audit.log.2025-02-04", "audit.log.2025-02-05"]);
    }

    #[test]
    fn append_resumes_size_accounting_across_reopen() {
        let dir = temp_dir();
        let path = dir.path().join("audit.log");
        {
            let store = FileStore::open(&path, 0, 0).unwrap();
            store.append("first").unwrap();
        }
        let store = FileStore::open(&path, 0, 0).unwrap();
        store.append("second").unwrap();
        let content = read(&path);
        assert!(content.contains("first"));
        assert!(content.contains("second"));
    }

    #[test]
    fn flush_on_fresh_store_is_ok() {
        let dir = temp_dir();
        let store = FileStore::open(dir.path().join("audit.log"), 0, 0).unwrap();
        store.flush().unwrap();
    }
}
