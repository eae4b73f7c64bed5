use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::Utc;

use crate::io::lock::LockError;
use crate::io::recovery::{self, RecoveryCategory, RecoveryEntry};
use crate::model::list::{ListError, TaskList};

/// Error type for task storage
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not read {location}: {source}")]
    ReadError {
        location: String,
        source: std::io::Error,
    },
    #[error("could not write {location}: {source}")]
    WriteError {
        location: String,
        source: std::io::Error,
    },
    #[error("could not parse tasks stored in {location}: {source}")]
    ParseError {
        location: String,
        source: serde_json::Error,
    },
    #[error("tasks stored in {location} are invalid: {source}")]
    InvalidList {
        location: String,
        source: ListError,
    },
    #[error("could not serialize tasks: {0}")]
    SerializeError(#[from] serde_json::Error),
    #[error(transparent)]
    LockError(#[from] LockError),
}

impl StoreError {
    /// The stored value exists but is not a usable task list
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            StoreError::ParseError { .. } | StoreError::InvalidList { .. }
        )
    }
}

/// Storage capability for the task list: one named slot holding the whole
/// list as a JSON array.
pub trait TaskStore {
    /// Human-readable location of the slot, used in messages
    fn location(&self) -> String;

    /// Raw slot value, `None` if nothing has been stored yet
    fn read_slot(&self) -> Result<Option<String>, StoreError>;

    /// Overwrite the slot with `value`
    fn write_slot(&mut self, value: &str) -> Result<(), StoreError>;

    /// Set aside a value that failed to load before the slot is reset.
    fn quarantine(&mut self, _raw: &str, _error: &StoreError) -> Result<(), StoreError> {
        Ok(())
    }

    /// Read the list. An absent or empty slot is an empty list.
    fn load(&self) -> Result<TaskList, StoreError> {
        match self.read_slot()? {
            Some(raw) if !raw.trim().is_empty() => parse_slot(&raw, &self.location()),
            _ => Ok(TaskList::new()),
        }
    }

    /// Serialize the whole list and replace the slot contents.
    fn save(&mut self, list: &TaskList) -> Result<(), StoreError> {
        let value = serde_json::to_string(list)?;
        self.write_slot(&value)
    }
}

/// Parse and validate a raw slot value
pub fn parse_slot(raw: &str, location: &str) -> Result<TaskList, StoreError> {
    let list: TaskList = serde_json::from_str(raw).map_err(|e| StoreError::ParseError {
        location: location.to_string(),
        source: e,
    })?;
    list.validate().map_err(|e| StoreError::InvalidList {
        location: location.to_string(),
        source: e,
    })?;
    Ok(list)
}

// ---------------------------------------------------------------------------
// File-backed slot
// ---------------------------------------------------------------------------

/// A slot stored as `<dir>/<slot>.json`
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    /// Slot file for `slot` inside `dir`
    pub fn in_dir(dir: &Path, slot: &str) -> Self {
        Self::new(dir.join(format!("{}.json", slot)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the slot, its lock and its recovery log
    pub fn data_dir(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }

    /// Where a corrupt slot value is copied before reset
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".bak");
        PathBuf::from(name)
    }
}

impl TaskStore for FileStore {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn read_slot(&self) -> Result<Option<String>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&self.path)
            .map(Some)
            .map_err(|e| StoreError::ReadError {
                location: self.location(),
                source: e,
            })
    }

    fn write_slot(&mut self, value: &str) -> Result<(), StoreError> {
        let result = fs::create_dir_all(self.data_dir())
            .and_then(|_| recovery::atomic_write(&self.path, value.as_bytes()));
        if let Err(e) = result {
            recovery::log_recovery(
                self.data_dir(),
                RecoveryEntry {
                    timestamp: Utc::now(),
                    category: RecoveryCategory::Write,
                    description: "could not save task list".to_string(),
                    fields: vec![
                        ("Slot".to_string(), self.location()),
                        ("Error".to_string(), e.to_string()),
                    ],
                    body: value.to_string(),
                },
            );
            return Err(StoreError::WriteError {
                location: self.location(),
                source: e,
            });
        }
        Ok(())
    }

    fn quarantine(&mut self, raw: &str, error: &StoreError) -> Result<(), StoreError> {
        let bak = self.backup_path();
        fs::write(&bak, raw).map_err(|e| StoreError::WriteError {
            location: bak.display().to_string(),
            source: e,
        })?;
        recovery::log_recovery(
            self.data_dir(),
            RecoveryEntry {
                timestamp: Utc::now(),
                category: RecoveryCategory::Corrupt,
                description: "unreadable task list reset".to_string(),
                fields: vec![
                    ("Slot".to_string(), self.location()),
                    ("Error".to_string(), error.to_string()),
                ],
                body: raw.to_string(),
            },
        );
        eprintln!(
            "warning: could not load {} (backed up as {}): {}",
            self.location(),
            bak.display(),
            error
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory slot
// ---------------------------------------------------------------------------

/// A slot held in memory. Clones share the same slot, the way every page of
/// a site shares one browser key-value store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Rc<RefCell<Option<String>>>,
    quarantined: Rc<RefCell<Vec<String>>>,
    fail_writes: Rc<Cell<bool>>,
    writes: Rc<Cell<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose slot already holds `raw`
    pub fn with_value(raw: impl Into<String>) -> Self {
        let store = Self::new();
        store.slot.replace(Some(raw.into()));
        store
    }

    pub fn value(&self) -> Option<String> {
        self.slot.borrow().clone()
    }

    /// Values set aside by [`TaskStore::quarantine`], oldest first
    pub fn quarantined(&self) -> Vec<String> {
        self.quarantined.borrow().clone()
    }

    /// Make every following write fail, as a full storage quota would
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    /// Number of successful writes
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }
}

impl TaskStore for MemoryStore {
    fn location(&self) -> String {
        "memory".to_string()
    }

    fn read_slot(&self) -> Result<Option<String>, StoreError> {
        Ok(self.value())
    }

    fn write_slot(&mut self, value: &str) -> Result<(), StoreError> {
        if self.fail_writes.get() {
            return Err(StoreError::WriteError {
                location: self.location(),
                source: std::io::Error::other("storage quota exceeded"),
            });
        }
        self.slot.replace(Some(value.to_string()));
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn quarantine(&mut self, raw: &str, _error: &StoreError) -> Result<(), StoreError> {
        self.quarantined.borrow_mut().push(raw.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::TaskId;
    use crate::ops::task_ops::{add_task, toggle_task};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample() -> TaskList {
        let list = add_task(&TaskList::new(), "Buy milk", Utc.timestamp_millis_opt(1_000).unwrap());
        let list = add_task(&list, "Walk dog", Utc.timestamp_millis_opt(2_000).unwrap());
        toggle_task(&list, TaskId(1_000))
    }

    #[test]
    fn memory_round_trip() {
        let mut store = MemoryStore::new();
        let list = sample();
        store.save(&list).unwrap();
        assert_eq!(store.load().unwrap(), list);
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn absent_or_empty_slot_loads_empty() {
        assert!(MemoryStore::new().load().unwrap().is_empty());
        assert!(MemoryStore::with_value("").load().unwrap().is_empty());
        assert!(MemoryStore::with_value("[]").load().unwrap().is_empty());
    }

    #[test]
    fn loads_browser_written_value() {
        let raw = r#"[{"id":1714557600250,"text":"Walk dog","completed":false,"createdAt":"2024-05-01T10:00:00.250Z"},{"id":1714557500000,"text":"Buy milk","completed":true,"createdAt":"2024-05-01T09:58:20.000Z"}]"#;
        let list = MemoryStore::with_value(raw).load().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.tasks()[0].text, "Walk dog");
        assert!(list.tasks()[1].completed);
    }

    #[test]
    fn corrupt_value_is_a_parse_error() {
        let err = MemoryStore::with_value("not json {{{").load().unwrap_err();
        assert!(matches!(err, StoreError::ParseError { .. }));
        assert!(err.is_corrupt());

        let err = MemoryStore::with_value(r#"{"id":1}"#).load().unwrap_err();
        assert!(err.is_corrupt());
    }

    #[test]
    fn duplicate_ids_are_invalid() {
        let raw = r#"[{"id":1,"text":"a","completed":false,"createdAt":"2024-05-01T10:00:00Z"},{"id":1,"text":"b","completed":false,"createdAt":"2024-05-01T10:00:00Z"}]"#;
        let err = MemoryStore::with_value(raw).load().unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidList {
                source: ListError::DuplicateId(TaskId(1)),
                ..
            }
        ));
    }

    #[test]
    fn failing_writes_leave_slot_untouched() {
        let mut store = MemoryStore::with_value("[]");
        store.set_fail_writes(true);
        let err = store.save(&sample()).unwrap_err();
        assert!(matches!(err, StoreError::WriteError { .. }));
        assert_eq!(store.value().as_deref(), Some("[]"));
        assert!(!err.is_corrupt());
    }

    #[test]
    fn clones_share_one_slot() {
        let store = MemoryStore::new();
        let mut writer = store.clone();
        writer.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), sample());
    }

    #[test]
    fn file_round_trip_creates_directory() {
        let tmp = TempDir::new().unwrap();
        let mut store = FileStore::in_dir(&tmp.path().join("nested/data"), "todos");
        assert!(store.load().unwrap().is_empty());

        let list = sample();
        store.save(&list).unwrap();
        assert!(store.path().ends_with("nested/data/todos.json"));
        assert_eq!(store.load().unwrap(), list);

        // The file holds a flat JSON array
        let raw = fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
    }

    #[test]
    fn file_save_replaces_previous_contents() {
        let tmp = TempDir::new().unwrap();
        let mut store = FileStore::in_dir(tmp.path(), "todos");
        store.save(&sample()).unwrap();
        store.save(&TaskList::new()).unwrap();
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "[]");
    }

    #[test]
    fn file_quarantine_backs_up_and_logs() {
        let tmp = TempDir::new().unwrap();
        let mut store = FileStore::in_dir(tmp.path(), "todos");
        fs::write(store.path(), "garbage").unwrap();

        let err = store.load().unwrap_err();
        store.quarantine("garbage", &err).unwrap();

        assert_eq!(fs::read_to_string(store.backup_path()).unwrap(), "garbage");
        assert!(store.backup_path().ends_with("todos.json.bak"));
        let entries = recovery::read_recovery_entries(tmp.path(), None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, RecoveryCategory::Corrupt);
        assert_eq!(entries[0].body, "garbage");
    }
}
