use crate::models::CompletionRecord;
use serde::Serialize;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const HISTORY_FILE: &str = "history.json";

#[derive(Debug)]
pub enum StoreError {
    Io(io::Error),
    Serde(serde_json::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(err) => write!(f, "I/O error: {err}"),
            StoreError::Serde(err) => write!(f, "Serialization error: {err}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<io::Error> for StoreError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Append-only destination for completion records. The engine performs
/// at most one append per completed session; the sink does not dedupe.
pub trait CompletionSink {
    fn append(&self, record: &CompletionRecord) -> StoreResult<()>;
}

impl<S: CompletionSink + ?Sized> CompletionSink for std::sync::Arc<S> {
    fn append(&self, record: &CompletionRecord) -> StoreResult<()> {
        (**self).append(record)
    }
}

/// File-backed history: one JSON list under the base directory. Appends
/// read the full list, push, and write the whole list back.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    history_path: PathBuf,
}

impl HistoryStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        let history_path = base_dir.join(HISTORY_FILE);
        let store = Self { history_path };
        if !store.history_path.exists() {
            store.write_json(&Vec::<CompletionRecord>::new())?;
        }
        Ok(store)
    }

    pub fn history_path(&self) -> &Path {
        &self.history_path
    }

    pub fn load(&self) -> StoreResult<Vec<CompletionRecord>> {
        if !self.history_path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.history_path)?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        let records = serde_json::from_str(&contents)?;
        Ok(records)
    }

    fn write_json<T: Serialize + ?Sized>(&self, value: &T) -> StoreResult<()> {
        if let Some(parent) = self.history_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp_path = self.history_path.with_extension("tmp");
        let file = fs::File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        match fs::rename(&temp_path, &self.history_path) {
            Ok(()) => Ok(()),
            Err(_err) if self.history_path.exists() => {
                let _ = fs::remove_file(&self.history_path);
                fs::rename(&temp_path, &self.history_path).map_err(StoreError::from)
            }
            Err(err) => Err(StoreError::from(err)),
        }
    }
}

impl CompletionSink for HistoryStore {
    fn append(&self, record: &CompletionRecord) -> StoreResult<()> {
        let mut records = self.load()?;
        records.push(record.clone());
        self.write_json(&records)
    }
}

/// In-memory sink for tests and embedding callers that handle
/// persistence themselves.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<CompletionRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<CompletionRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

impl CompletionSink for MemorySink {
    fn append(&self, record: &CompletionRecord) -> StoreResult<()> {
        if let Ok(mut records) = self.records.lock() {
            records.push(record.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{CompletionSink, HistoryStore, MemorySink};
    use crate::models::CompletionRecord;

    fn sample_record(routine_id: &str, duration_seconds: u64) -> CompletionRecord {
        CompletionRecord {
            routine_id: routine_id.to_string(),
            duration_seconds,
            completed_at: "2025-01-01T10:00:00+00:00".to_string(),
            step_count: 5,
        }
    }

    #[test]
    fn new_store_starts_with_empty_history() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = HistoryStore::new(dir.path()).expect("create store");
        assert!(store.history_path().exists());
        assert!(store.load().expect("load").is_empty());
    }

    #[test]
    fn append_preserves_existing_records() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = HistoryStore::new(dir.path()).expect("create store");

        store
            .append(&sample_record("posture", 600))
            .expect("first append");
        store
            .append(&sample_record("posture_strength", 1500))
            .expect("second append");

        let records = store.load().expect("load");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].routine_id, "posture");
        assert_eq!(records[1].routine_id, "posture_strength");
        assert_eq!(records[1].duration_seconds, 1500);
    }

    #[test]
    fn load_tolerates_blank_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = HistoryStore::new(dir.path()).expect("create store");
        std::fs::write(store.history_path(), "  \n").expect("blank out file");
        assert!(store.load().expect("load").is_empty());
    }

    #[test]
    fn memory_sink_collects_records() {
        let sink = MemorySink::new();
        sink.append(&sample_record("posture", 600)).expect("append");
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].step_count, 5);
    }
}
