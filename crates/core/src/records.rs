//! Append-only storage for assessment records.
//!
//! Records are opaque JSON payloads keyed by subject, record type and a time-prefixed
//! [`RecordId`]. Ids generated by one store are strictly increasing, so sorting by id sorts by
//! creation time.
//!
//! ## File layout
//!
//! ```text
//! <data_dir>/
//! └── <subject_id>/
//!     └── <record_type>/
//!         └── 20260111T143522.045Z-550e8400e29b41d4a716446655440000.json
//! ```
//!
//! Subject ids and record types become path components, so both are restricted to ASCII
//! alphanumerics plus `-`, `_` and `.`, and may not be `.` or `..`.

use crate::{TriageError, TriageResult};
use chrono::{DateTime, Duration, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;
use uuid::Uuid;

/// Time-prefixed record identifier: `YYYYMMDDTHHMMSS.mmmZ-<32 hex uuid>`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId {
    timestamp: DateTime<Utc>,
    uuid: Uuid,
}

impl RecordId {
    /// Generate a new id strictly later than `last` (by at least 1 ms when the clock lags).
    pub fn generate(last: Option<&RecordId>) -> Self {
        let now = Utc::now().trunc_subsecs(3);
        let timestamp = match last {
            Some(prev) if now <= prev.timestamp => prev.timestamp + Duration::milliseconds(1),
            _ => now,
        };

        Self {
            timestamp,
            uuid: Uuid::new_v4(),
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.timestamp.format("%Y%m%dT%H%M%S%.3fZ"),
            self.uuid.simple()
        )
    }
}

impl FromStr for RecordId {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ts_str, uuid_str) = s
            .split_once('-')
            .ok_or_else(|| TriageError::InvalidInput(format!("invalid record id: '{s}'")))?;

        let ts_no_z = ts_str.strip_suffix('Z').ok_or_else(|| {
            TriageError::InvalidInput(format!("record id timestamp must end with 'Z': '{s}'"))
        })?;
        let naive = NaiveDateTime::parse_from_str(ts_no_z, "%Y%m%dT%H%M%S%.3f").map_err(|e| {
            TriageError::InvalidInput(format!("invalid record id timestamp '{ts_str}': {e}"))
        })?;

        if uuid_str.len() != 32 {
            return Err(TriageError::InvalidInput(format!(
                "record id uuid must be 32 hex characters: '{s}'"
            )));
        }
        let uuid = Uuid::parse_str(uuid_str)
            .map_err(|e| TriageError::InvalidInput(format!("invalid record id uuid: {e}")))?;

        Ok(Self {
            timestamp: DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc),
            uuid,
        })
    }
}

impl Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: RecordId,
    pub subject_id: String,
    pub record_type: String,
    pub timestamp: DateTime<Utc>,
    pub payload: serde_json::Value,
}

/// Persistence sink for assessment-related records.
pub trait RecordStore: Send + Sync {
    fn append_record(
        &self,
        subject_id: &str,
        record_type: &str,
        payload: serde_json::Value,
    ) -> TriageResult<StoredRecord>;

    /// Records for a subject, newest first, optionally filtered by type and truncated.
    fn list_records(
        &self,
        subject_id: &str,
        record_type: Option<&str>,
        limit: Option<usize>,
    ) -> TriageResult<Vec<StoredRecord>>;
}

/// Check that `value` is usable as a single path component.
pub fn validate_path_component(field: &str, value: &str) -> TriageResult<()> {
    if value.is_empty() || value == "." || value == ".." {
        return Err(TriageError::InvalidInput(format!(
            "{field} cannot be empty, '.' or '..'"
        )));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(TriageError::InvalidInput(format!(
            "{field} may only contain ASCII letters, digits, '-', '_' and '.': {value}"
        )));
    }
    Ok(())
}

fn next_record(
    last_id: &Mutex<Option<RecordId>>,
    subject_id: &str,
    record_type: &str,
    payload: serde_json::Value,
) -> TriageResult<StoredRecord> {
    validate_path_component("subject_id", subject_id)?;
    validate_path_component("record_type", record_type)?;

    let mut last = last_id.lock().map_err(|_| TriageError::StorePoisoned)?;
    let id = RecordId::generate(last.as_ref());
    *last = Some(id.clone());

    Ok(StoredRecord {
        timestamp: id.timestamp(),
        id,
        subject_id: subject_id.to_owned(),
        record_type: record_type.to_owned(),
        payload,
    })
}

fn newest_first(mut records: Vec<StoredRecord>, limit: Option<usize>) -> Vec<StoredRecord> {
    records.sort_by(|a, b| b.id.cmp(&a.id));
    if let Some(limit) = limit {
        records.truncate(limit);
    }
    records
}

/// JSON-file-per-record store rooted at a data directory.
#[derive(Debug)]
pub struct FileRecordStore {
    data_dir: PathBuf,
    last_id: Mutex<Option<RecordId>>,
}

impl FileRecordStore {
    /// Create a store rooted at `data_dir`, creating the directory if needed.
    pub fn new(data_dir: impl Into<PathBuf>) -> TriageResult<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir).map_err(TriageError::RecordDirCreation)?;
        Ok(Self {
            data_dir,
            last_id: Mutex::new(None),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn read_type_dir(&self, dir: &Path, out: &mut Vec<StoredRecord>) -> TriageResult<()> {
        let entries = match fs::read_dir(dir) {
            Ok(it) => it,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(TriageError::RecordRead(e)),
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let contents = fs::read_to_string(&path).map_err(TriageError::RecordRead)?;
            match serde_json::from_str::<StoredRecord>(&contents) {
                Ok(record) => out.push(record),
                Err(e) => tracing::warn!("skipping unreadable record {}: {}", path.display(), e),
            }
        }
        Ok(())
    }
}

impl RecordStore for FileRecordStore {
    fn append_record(
        &self,
        subject_id: &str,
        record_type: &str,
        payload: serde_json::Value,
    ) -> TriageResult<StoredRecord> {
        let record = next_record(&self.last_id, subject_id, record_type, payload)?;

        let dir = self.data_dir.join(subject_id).join(record_type);
        fs::create_dir_all(&dir).map_err(TriageError::RecordDirCreation)?;

        let json = serde_json::to_string_pretty(&record).map_err(TriageError::Serialization)?;
        let path = dir.join(format!("{}.json", record.id));
        fs::write(&path, json).map_err(TriageError::RecordWrite)?;

        tracing::debug!("stored {} record at {}", record_type, path.display());
        Ok(record)
    }

    fn list_records(
        &self,
        subject_id: &str,
        record_type: Option<&str>,
        limit: Option<usize>,
    ) -> TriageResult<Vec<StoredRecord>> {
        validate_path_component("subject_id", subject_id)?;
        let subject_dir = self.data_dir.join(subject_id);
        let mut records = Vec::new();

        match record_type {
            Some(record_type) => {
                validate_path_component("record_type", record_type)?;
                self.read_type_dir(&subject_dir.join(record_type), &mut records)?;
            }
            None => {
                let entries = match fs::read_dir(&subject_dir) {
                    Ok(it) => it,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(records),
                    Err(e) => return Err(TriageError::RecordRead(e)),
                };
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.is_dir() {
                        self.read_type_dir(&path, &mut records)?;
                    }
                }
            }
        }

        Ok(newest_first(records, limit))
    }
}

/// In-process store, for tests and one-shot CLI runs.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<Vec<StoredRecord>>,
    last_id: Mutex<Option<RecordId>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordStore for MemoryRecordStore {
    fn append_record(
        &self,
        subject_id: &str,
        record_type: &str,
        payload: serde_json::Value,
    ) -> TriageResult<StoredRecord> {
        let record = next_record(&self.last_id, subject_id, record_type, payload)?;
        self.records
            .lock()
            .map_err(|_| TriageError::StorePoisoned)?
            .push(record.clone());
        Ok(record)
    }

    fn list_records(
        &self,
        subject_id: &str,
        record_type: Option<&str>,
        limit: Option<usize>,
    ) -> TriageResult<Vec<StoredRecord>> {
        validate_path_component("subject_id", subject_id)?;
        if let Some(record_type) = record_type {
            validate_path_component("record_type", record_type)?;
        }
        let records = self.records.lock().map_err(|_| TriageError::StorePoisoned)?;
        let matching = records
            .iter()
            .filter(|r| r.subject_id == subject_id)
            .filter(|r| record_type.map_or(true, |t| r.record_type == t))
            .cloned()
            .collect();
        Ok(newest_first(matching, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_ids_are_strictly_increasing() {
        let first = RecordId::generate(None);
        let second = RecordId::generate(Some(&first));
        assert!(second > first);
        assert!(second.timestamp() > first.timestamp());
    }

    #[test]
    fn record_id_display_parses_back() {
        let id = RecordId::generate(None);
        let text = id.to_string();
        assert_eq!(text.len(), "20260111T143522.045Z-".len() + 32);

        let parsed: RecordId = text.parse().expect("parse");
        assert_eq!(parsed.to_string(), text);
    }

    #[test]
    fn record_id_rejects_malformed_input() {
        assert!("nonsense".parse::<RecordId>().is_err());
        assert!("20260111T143522.045-550e8400e29b41d4a716446655440000"
            .parse::<RecordId>()
            .is_err());
        assert!("20260111T143522.045Z-550e8400"
            .parse::<RecordId>()
            .is_err());
    }

    #[test]
    fn path_components_are_validated() {
        assert!(validate_path_component("subject_id", "alice_01").is_ok());
        assert!(validate_path_component("subject_id", "a.b-c").is_ok());
        assert!(validate_path_component("subject_id", "").is_err());
        assert!(validate_path_component("subject_id", "..").is_err());
        assert!(validate_path_component("subject_id", "../etc").is_err());
        assert!(validate_path_component("subject_id", "a/b").is_err());
        assert!(validate_path_component("subject_id", "bob smith").is_err());
    }

    #[test]
    fn file_store_appends_and_lists_newest_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileRecordStore::new(dir.path().join("records")).expect("store");

        for n in 0..3 {
            store
                .append_record("alice", "symptom_assessment", json!({ "n": n }))
                .expect("append");
        }
        store
            .append_record("alice", "emergency_activation", json!({ "n": 99 }))
            .expect("append");

        let all = store.list_records("alice", None, None).expect("list");
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].payload, json!({ "n": 99 }));

        let assessments = store
            .list_records("alice", Some("symptom_assessment"), Some(2))
            .expect("list");
        assert_eq!(assessments.len(), 2);
        assert_eq!(assessments[0].payload, json!({ "n": 2 }));
        assert_eq!(assessments[1].payload, json!({ "n": 1 }));
    }

    #[test]
    fn file_store_writes_one_file_per_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileRecordStore::new(dir.path()).expect("store");
        let record = store
            .append_record("bob", "symptom_assessment", json!({}))
            .expect("append");

        let path = dir
            .path()
            .join("bob")
            .join("symptom_assessment")
            .join(format!("{}.json", record.id));
        assert!(path.is_file());

        let stored: StoredRecord =
            serde_json::from_str(&fs::read_to_string(path).expect("read")).expect("parse");
        assert_eq!(stored, record);
    }

    #[test]
    fn file_store_unknown_subject_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileRecordStore::new(dir.path()).expect("store");
        assert!(store.list_records("nobody", None, None).expect("list").is_empty());
        assert!(store
            .list_records("nobody", Some("symptom_assessment"), None)
            .expect("list")
            .is_empty());
    }

    #[test]
    fn file_store_rejects_traversal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileRecordStore::new(dir.path()).expect("store");
        let err = store
            .append_record("..", "symptom_assessment", json!({}))
            .expect_err("should reject");
        assert!(matches!(err, TriageError::InvalidInput(_)));
        assert!(store.list_records("../x", None, None).is_err());
    }

    #[test]
    fn memory_store_filters_by_subject_and_type() {
        let store = MemoryRecordStore::new();
        store.append_record("a", "x", json!(1)).expect("append");
        store.append_record("b", "x", json!(2)).expect("append");
        store.append_record("a", "y", json!(3)).expect("append");

        assert_eq!(store.len(), 3);
        let a = store.list_records("a", None, None).expect("list");
        assert_eq!(a.iter().map(|r| r.payload.clone()).collect::<Vec<_>>(), vec![json!(3), json!(1)]);

        let ax = store.list_records("a", Some("x"), None).expect("list");
        assert_eq!(ax.len(), 1);
        assert_eq!(ax[0].payload, json!(1));
    }
}
