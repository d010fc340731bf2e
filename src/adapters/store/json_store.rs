use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::adapters::store::memory::{MemoryStore, SourceSchema, StoreDump};
use crate::core::errors::{AuditrailError, Result};
use crate::core::models::audit_log::{AuditLog, AuditLogType, FieldMap, NewAuditLog};
use crate::core::models::record::{Record, SaveOutcome};
use crate::core::traits::audit_store::{AuditLogStore, LogFilter};
use crate::core::traits::record_store::{RecordStore, Transactional};

/// One JSON object per line, append-order.
pub const AUDIT_LOG_FILE: &str = "audit.jsonl";
/// Live records plus the id counter.
pub const RECORDS_FILE: &str = "records.json";

#[derive(Serialize, Deserialize)]
struct RecordsFile {
    next_id: u64,
    #[serde(default)]
    records: HashMap<String, BTreeMap<String, FieldMap>>,
}

/// File-backed store: a [`MemoryStore`] loaded from and flushed to a
/// `.auditrail` directory.
///
/// Every standalone mutation persists immediately; inside a transaction
/// persistence is deferred until `commit` (or `rollback`, which flushes
/// the restored state). Writes go through a temp file in the same
/// directory and an atomic rename, so a crash never leaves a half-written
/// store behind.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    inner: MemoryStore,
    tx_active: AtomicBool,
}

impl JsonFileStore {
    /// Open an existing store directory, loading whatever state it holds.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(AuditrailError::NotInitialized { path: dir });
        }

        let store = Self {
            dir,
            inner: MemoryStore::new(),
            tx_active: AtomicBool::new(false),
        };
        store.load()?;
        Ok(store)
    }

    /// Create the store directory (if needed) and both files.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let store = Self {
            dir,
            inner: MemoryStore::new(),
            tx_active: AtomicBool::new(false),
        };
        store.persist()?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Register a source schema for validation. Schemas come from the
    /// config file each run and are not persisted with the data.
    pub fn define_schema(&self, source: &str, schema: SourceSchema) {
        self.inner.define_schema(source, schema);
    }

    fn load(&self) -> Result<()> {
        let mut dump = StoreDump::default();

        let audit_path = self.dir.join(AUDIT_LOG_FILE);
        if audit_path.is_file() {
            let raw = fs::read_to_string(&audit_path)?;
            for line in raw.lines() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let entry: AuditLog = serde_json::from_str(line).map_err(|err| {
                    AuditrailError::StoreError {
                        detail: format!("corrupt line in {AUDIT_LOG_FILE}: {err}"),
                    }
                })?;
                dump.next_id = dump.next_id.max(entry.id + 1);
                dump.entries.push(entry);
            }
        }

        let records_path = self.dir.join(RECORDS_FILE);
        if records_path.is_file() {
            let raw = fs::read_to_string(&records_path)?;
            let file: RecordsFile =
                serde_json::from_str(&raw).map_err(|err| AuditrailError::StoreError {
                    detail: format!("corrupt {RECORDS_FILE}: {err}"),
                })?;
            dump.next_id = dump.next_id.max(file.next_id);
            dump.records = file.records;
        }

        self.inner.load_dump(dump)
    }

    fn persist(&self) -> Result<()> {
        let dump = self.inner.dump()?;

        let mut lines = String::new();
        for entry in &dump.entries {
            let json = serde_json::to_string(entry).map_err(|err| AuditrailError::StoreError {
                detail: format!("failed to encode audit entry #{}: {err}", entry.id),
            })?;
            lines.push_str(&json);
            lines.push('\n');
        }
        self.write_atomic(AUDIT_LOG_FILE, lines.as_bytes())?;

        let records = RecordsFile {
            next_id: dump.next_id,
            records: dump.records,
        };
        let json =
            serde_json::to_string_pretty(&records).map_err(|err| AuditrailError::StoreError {
                detail: format!("failed to encode {RECORDS_FILE}: {err}"),
            })?;
        self.write_atomic(RECORDS_FILE, json.as_bytes())?;

        Ok(())
    }

    fn write_atomic(&self, file_name: &str, contents: &[u8]) -> Result<()> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(contents)?;
        tmp.persist(self.dir.join(file_name))
            .map_err(|err| AuditrailError::Io(err.error))?;
        Ok(())
    }

    fn persist_if_idle(&self) -> Result<()> {
        if self.tx_active.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.persist()
    }
}

impl AuditLogStore for JsonFileStore {
    fn append(&self, entry: NewAuditLog) -> Result<u64> {
        let id = self.inner.append(entry)?;
        self.persist_if_idle()?;
        Ok(id)
    }

    fn get_entry(&self, id: u64) -> Result<Option<AuditLog>> {
        self.inner.get_entry(id)
    }

    fn find_by_source_and_key(&self, source: &str, primary_key: &str) -> Result<Vec<AuditLog>> {
        self.inner.find_by_source_and_key(source, primary_key)
    }

    fn find_latest_delete(&self, source: &str, primary_key: &str) -> Result<Option<AuditLog>> {
        self.inner.find_latest_delete(source, primary_key)
    }

    fn query(&self, filter: &LogFilter) -> Result<Vec<AuditLog>> {
        self.inner.query(filter)
    }

    fn count_since(
        &self,
        log_type: AuditLogType,
        source: &str,
        since: DateTime<Utc>,
    ) -> Result<usize> {
        self.inner.count_since(log_type, source, since)
    }

    fn count_older_than(
        &self,
        cutoff: DateTime<Utc>,
        source: Option<&str>,
    ) -> Result<Vec<(String, usize)>> {
        self.inner.count_older_than(cutoff, source)
    }

    fn delete_older_than(&self, cutoff: DateTime<Utc>, source: Option<&str>) -> Result<usize> {
        let deleted = self.inner.delete_older_than(cutoff, source)?;
        self.persist_if_idle()?;
        Ok(deleted)
    }
}

impl RecordStore for JsonFileStore {
    fn get(&self, source: &str, primary_key: &str) -> Result<Record> {
        self.inner.get(source, primary_key)
    }

    fn exists(&self, source: &str, primary_key: &str) -> Result<bool> {
        self.inner.exists(source, primary_key)
    }

    fn patch_and_save(&self, record: &Record, changes: &FieldMap) -> Result<SaveOutcome> {
        let outcome = self.inner.patch_and_save(record, changes)?;
        self.persist_if_idle()?;
        Ok(outcome)
    }

    fn insert_new(
        &self,
        source: &str,
        primary_key: &str,
        fields: &FieldMap,
        check_rules: bool,
    ) -> Result<SaveOutcome> {
        let outcome = self.inner.insert_new(source, primary_key, fields, check_rules)?;
        self.persist_if_idle()?;
        Ok(outcome)
    }

    fn remove(&self, source: &str, primary_key: &str) -> Result<()> {
        self.inner.remove(source, primary_key)?;
        self.persist_if_idle()
    }

    fn has_column(&self, source: &str, field: &str) -> bool {
        self.inner.has_column(source, field)
    }
}

impl Transactional for JsonFileStore {
    fn begin(&self) -> Result<()> {
        self.inner.begin()?;
        self.tx_active.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        self.inner.commit()?;
        self.tx_active.store(false, Ordering::SeqCst);
        self.persist()
    }

    fn rollback(&self) -> Result<()> {
        self.inner.rollback()?;
        self.tx_active.store(false, Ordering::SeqCst);
        self.persist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn draft(source: &str, pk: &str) -> NewAuditLog {
        NewAuditLog {
            transaction: "tx".into(),
            log_type: AuditLogType::Create,
            source: source.into(),
            parent_source: None,
            primary_key: Some(pk.into()),
            display_value: None,
            username: None,
            original: None,
            changed: Some(r#"{"a":1}"#.into()),
            meta: None,
        }
    }

    #[test]
    fn open_refuses_missing_directory() {
        let err = JsonFileStore::open("/no/such/store").unwrap_err();
        assert!(matches!(err, AuditrailError::NotInitialized { .. }));
    }

    #[test]
    fn create_writes_both_files() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(".auditrail");
        JsonFileStore::create(&dir).unwrap();

        assert!(dir.join(AUDIT_LOG_FILE).is_file());
        assert!(dir.join(RECORDS_FILE).is_file());
    }

    #[test]
    fn state_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(".auditrail");

        {
            let store = JsonFileStore::create(&dir).unwrap();
            store.append(draft("articles", "1")).unwrap();
            let mut fields = FieldMap::new();
            fields.insert("title".into(), json!("Hello"));
            store.insert_new("articles", "1", &fields, true).unwrap();
        }

        let reopened = JsonFileStore::open(&dir).unwrap();
        let series = reopened.find_by_source_and_key("articles", "1").unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].changed_fields()["a"], json!(1));

        let record = reopened.get("articles", "1").unwrap();
        assert_eq!(record.fields["title"], json!("Hello"));
    }

    #[test]
    fn ids_keep_climbing_after_reopen() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(".auditrail");

        let first = {
            let store = JsonFileStore::create(&dir).unwrap();
            store.append(draft("articles", "1")).unwrap()
        };

        let reopened = JsonFileStore::open(&dir).unwrap();
        let second = reopened.append(draft("articles", "1")).unwrap();
        assert!(second > first);
    }

    #[test]
    fn audit_file_is_one_json_object_per_line() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(".auditrail");

        let store = JsonFileStore::create(&dir).unwrap();
        store.append(draft("articles", "1")).unwrap();
        store.append(draft("articles", "2")).unwrap();

        let raw = fs::read_to_string(dir.join(AUDIT_LOG_FILE)).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(value["source"], json!("articles"));
        }
    }

    #[test]
    fn transaction_defers_persistence_until_commit() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(".auditrail");

        let store = JsonFileStore::create(&dir).unwrap();
        store.begin().unwrap();
        store.append(draft("articles", "1")).unwrap();

        let raw = fs::read_to_string(dir.join(AUDIT_LOG_FILE)).unwrap();
        assert!(raw.is_empty());

        store.commit().unwrap();
        let raw = fs::read_to_string(dir.join(AUDIT_LOG_FILE)).unwrap();
        assert_eq!(raw.lines().count(), 1);
    }

    #[test]
    fn rollback_flushes_the_restored_state() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(".auditrail");

        let store = JsonFileStore::create(&dir).unwrap();
        store.append(draft("articles", "1")).unwrap();

        store.begin().unwrap();
        store.append(draft("articles", "2")).unwrap();
        store.rollback().unwrap();

        let raw = fs::read_to_string(dir.join(AUDIT_LOG_FILE)).unwrap();
        assert_eq!(raw.lines().count(), 1);

        let reopened = JsonFileStore::open(&dir).unwrap();
        assert!(reopened.get_entry(2).unwrap().is_none());
    }

    #[test]
    fn corrupt_audit_line_is_a_store_error() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(".auditrail");
        JsonFileStore::create(&dir).unwrap();
        fs::write(dir.join(AUDIT_LOG_FILE), "not json\n").unwrap();

        let err = JsonFileStore::open(&dir).unwrap_err();
        assert!(matches!(err, AuditrailError::StoreError { .. }));
    }
}
