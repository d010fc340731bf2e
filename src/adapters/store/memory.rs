use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::{AuditrailError, Result};
use crate::core::models::audit_log::{AuditLog, AuditLogType, FieldMap, NewAuditLog};
use crate::core::models::record::{Record, SaveOutcome};
use crate::core::traits::audit_store::{AuditLogStore, LogFilter};
use crate::core::traits::record_store::{RecordStore, Transactional};

/// Declared shape of a source's records.
///
/// `required` constraints are structural and always enforced; `columns`
/// and `max_lengths` are business rules that administrative restores skip.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceSchema {
    /// Known columns. When declared, writes naming other fields are
    /// rejected (business rule) and `has_column` answers from this list.
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub max_lengths: HashMap<String, usize>,
    /// Field whose value labels the record in audit entries.
    pub display_field: Option<String>,
}

/// Serializable snapshot of the whole store, shared with the file-backed
/// adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreDump {
    pub next_id: u64,
    pub entries: Vec<AuditLog>,
    /// source -> primary key -> fields
    pub records: HashMap<String, BTreeMap<String, FieldMap>>,
}

impl Default for StoreDump {
    fn default() -> Self {
        Self {
            next_id: 1,
            entries: Vec::new(),
            records: HashMap::new(),
        }
    }
}

/// Mutex-guarded in-memory store implementing both storage ports plus
/// snapshot-based transactions.
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<StoreDump>,
    snapshot: Mutex<Option<StoreDump>>,
    schemas: Mutex<HashMap<String, SourceSchema>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_schemas(HashMap::new())
    }

    pub fn with_schemas(schemas: HashMap<String, SourceSchema>) -> Self {
        Self {
            state: Mutex::new(StoreDump::default()),
            snapshot: Mutex::new(None),
            schemas: Mutex::new(schemas),
        }
    }

    /// Register or replace a source schema after construction.
    pub fn define_schema(&self, source: &str, schema: SourceSchema) {
        if let Ok(mut schemas) = self.schemas.lock() {
            schemas.insert(source.to_string(), schema);
        }
    }

    pub fn dump(&self) -> Result<StoreDump> {
        Ok(self.locked_state()?.clone())
    }

    pub fn load_dump(&self, dump: StoreDump) -> Result<()> {
        *self.locked_state()? = dump;
        Ok(())
    }

    fn locked_state(&self) -> Result<MutexGuard<'_, StoreDump>> {
        self.state.lock().map_err(|_| AuditrailError::StoreError {
            detail: "store mutex poisoned".into(),
        })
    }

    fn locked_snapshot(&self) -> Result<MutexGuard<'_, Option<StoreDump>>> {
        self.snapshot.lock().map_err(|_| AuditrailError::StoreError {
            detail: "snapshot mutex poisoned".into(),
        })
    }

    fn schema(&self, source: &str) -> Option<SourceSchema> {
        self.schemas.lock().ok()?.get(source).cloned()
    }

    /// Validate a full field map against the source schema. Required
    /// fields must be present and non-null; column and length checks only
    /// run when `check_rules` is set.
    fn validate(&self, source: &str, fields: &FieldMap, check_rules: bool) -> Option<String> {
        let schema = self.schema(source)?;

        for required in &schema.required {
            match fields.get(required) {
                None | Some(Value::Null) => {
                    return Some(format!("required field '{required}' is missing"));
                }
                Some(Value::String(s)) if s.is_empty() => {
                    return Some(format!("required field '{required}' is empty"));
                }
                _ => {}
            }
        }

        if !check_rules {
            return None;
        }

        if let Some(columns) = &schema.columns {
            for field in fields.keys() {
                if !columns.iter().any(|c| c == field) {
                    return Some(format!("unknown column '{field}' for source '{source}'"));
                }
            }
        }

        for (field, max) in &schema.max_lengths {
            if let Some(Value::String(s)) = fields.get(field)
                && s.chars().count() > *max
            {
                return Some(format!(
                    "field '{field}' exceeds maximum length of {max} characters"
                ));
            }
        }

        None
    }
}

/// Replay order: `created` ascending, ties broken by `id`.
fn sort_replay_order(entries: &mut [AuditLog]) {
    entries.sort_by(|a, b| a.created.cmp(&b.created).then(a.id.cmp(&b.id)));
}

impl AuditLogStore for MemoryStore {
    fn append(&self, entry: NewAuditLog) -> Result<u64> {
        let mut state = self.locked_state()?;
        let id = state.next_id;
        state.next_id += 1;
        state.entries.push(AuditLog {
            id,
            transaction: entry.transaction,
            log_type: entry.log_type,
            source: entry.source,
            parent_source: entry.parent_source,
            primary_key: entry.primary_key,
            display_value: entry.display_value,
            username: entry.username,
            original: entry.original,
            changed: entry.changed,
            meta: entry.meta,
            created: Utc::now(),
        });
        Ok(id)
    }

    fn get_entry(&self, id: u64) -> Result<Option<AuditLog>> {
        let state = self.locked_state()?;
        Ok(state.entries.iter().find(|e| e.id == id).cloned())
    }

    fn find_by_source_and_key(&self, source: &str, primary_key: &str) -> Result<Vec<AuditLog>> {
        let state = self.locked_state()?;
        let mut matched: Vec<AuditLog> = state
            .entries
            .iter()
            .filter(|e| e.source == source && e.primary_key.as_deref() == Some(primary_key))
            .cloned()
            .collect();
        sort_replay_order(&mut matched);
        Ok(matched)
    }

    fn find_latest_delete(&self, source: &str, primary_key: &str) -> Result<Option<AuditLog>> {
        let mut deletes: Vec<AuditLog> = self
            .find_by_source_and_key(source, primary_key)?
            .into_iter()
            .filter(|e| e.log_type == AuditLogType::Delete)
            .collect();
        Ok(deletes.pop())
    }

    fn query(&self, filter: &LogFilter) -> Result<Vec<AuditLog>> {
        let state = self.locked_state()?;
        let mut matched: Vec<AuditLog> = state
            .entries
            .iter()
            .filter(|e| {
                if let Some(source) = &filter.source
                    && &e.source != source
                {
                    return false;
                }
                if let Some(pk) = &filter.primary_key
                    && e.primary_key.as_deref() != Some(pk.as_str())
                {
                    return false;
                }
                if let Some(log_type) = filter.log_type
                    && e.log_type != log_type
                {
                    return false;
                }
                if let Some(user) = &filter.username {
                    let needle = user.to_lowercase();
                    let matches = e
                        .username
                        .as_ref()
                        .is_some_and(|u| u.to_lowercase().contains(&needle));
                    if !matches {
                        return false;
                    }
                }
                if let Some(since) = filter.since
                    && e.created < since
                {
                    return false;
                }
                true
            })
            .cloned()
            .collect();
        sort_replay_order(&mut matched);
        Ok(matched)
    }

    fn count_since(
        &self,
        log_type: AuditLogType,
        source: &str,
        since: DateTime<Utc>,
    ) -> Result<usize> {
        let state = self.locked_state()?;
        Ok(state
            .entries
            .iter()
            .filter(|e| e.log_type == log_type && e.source == source && e.created >= since)
            .count())
    }

    fn count_older_than(
        &self,
        cutoff: DateTime<Utc>,
        source: Option<&str>,
    ) -> Result<Vec<(String, usize)>> {
        let state = self.locked_state()?;
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for entry in &state.entries {
            if entry.created >= cutoff {
                continue;
            }
            if let Some(wanted) = source
                && entry.source != wanted
            {
                continue;
            }
            *counts.entry(entry.source.clone()).or_insert(0) += 1;
        }
        Ok(counts.into_iter().collect())
    }

    fn delete_older_than(&self, cutoff: DateTime<Utc>, source: Option<&str>) -> Result<usize> {
        let mut state = self.locked_state()?;
        let before = state.entries.len();
        state.entries.retain(|e| {
            let stale = e.created < cutoff && source.is_none_or(|s| e.source == s);
            !stale
        });
        Ok(before - state.entries.len())
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, source: &str, primary_key: &str) -> Result<Record> {
        let state = self.locked_state()?;
        state
            .records
            .get(source)
            .and_then(|by_key| by_key.get(primary_key))
            .map(|fields| Record {
                source: source.to_string(),
                primary_key: primary_key.to_string(),
                fields: fields.clone(),
            })
            .ok_or_else(|| AuditrailError::RecordNotFound {
                source_name: source.to_string(),
                primary_key: primary_key.to_string(),
            })
    }

    fn exists(&self, source: &str, primary_key: &str) -> Result<bool> {
        let state = self.locked_state()?;
        Ok(state
            .records
            .get(source)
            .is_some_and(|by_key| by_key.contains_key(primary_key)))
    }

    fn patch_and_save(&self, record: &Record, changes: &FieldMap) -> Result<SaveOutcome> {
        let mut patched = record.fields.clone();
        for (field, value) in changes {
            patched.insert(field.clone(), value.clone());
        }

        if let Some(reason) = self.validate(&record.source, &patched, true) {
            return Ok(SaveOutcome::Invalid(reason));
        }

        let mut state = self.locked_state()?;
        state
            .records
            .entry(record.source.clone())
            .or_default()
            .insert(record.primary_key.clone(), patched.clone());

        Ok(SaveOutcome::Saved(Record {
            source: record.source.clone(),
            primary_key: record.primary_key.clone(),
            fields: patched,
        }))
    }

    fn insert_new(
        &self,
        source: &str,
        primary_key: &str,
        fields: &FieldMap,
        check_rules: bool,
    ) -> Result<SaveOutcome> {
        if let Some(reason) = self.validate(source, fields, check_rules) {
            return Ok(SaveOutcome::Invalid(reason));
        }

        let mut state = self.locked_state()?;
        state
            .records
            .entry(source.to_string())
            .or_default()
            .insert(primary_key.to_string(), fields.clone());

        Ok(SaveOutcome::Saved(Record {
            source: source.to_string(),
            primary_key: primary_key.to_string(),
            fields: fields.clone(),
        }))
    }

    fn remove(&self, source: &str, primary_key: &str) -> Result<()> {
        let mut state = self.locked_state()?;
        let removed = state
            .records
            .get_mut(source)
            .and_then(|by_key| by_key.remove(primary_key));
        match removed {
            Some(_) => Ok(()),
            None => Err(AuditrailError::RecordNotFound {
                source_name: source.to_string(),
                primary_key: primary_key.to_string(),
            }),
        }
    }

    fn has_column(&self, source: &str, field: &str) -> bool {
        self.schema(source)
            .and_then(|s| s.columns)
            .is_some_and(|columns| columns.iter().any(|c| c == field))
    }
}

impl Transactional for MemoryStore {
    fn begin(&self) -> Result<()> {
        let current = self.locked_state()?.clone();
        *self.locked_snapshot()? = Some(current);
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        *self.locked_snapshot()? = None;
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        if let Some(saved) = self.locked_snapshot()?.take() {
            *self.locked_state()? = saved;
        }
        Ok(())
    }
}
