use chrono::Utc;
use serde_json::Value;

use crate::core::errors::Result;
use crate::core::models::audit_log::{
    AuditLogType, FieldMap, NewAuditLog, RevertMeta, encode_field_map,
};
use crate::core::models::record::{Record, SaveOutcome};
use crate::core::services::reconstructor::StateReconstructor;
use crate::core::traits::audit_store::AuditLogStore;
use crate::core::traits::record_store::{RecordStore, Transactional};

/// Result of a revert or restore operation. Expected failures are values;
/// only a missing live revert target escalates to an error.
#[derive(Debug, Clone, PartialEq)]
pub enum RevertOutcome {
    Applied(Record),
    Blocked(RevertBlocked),
}

/// Ordinary, expected reasons a revert or restore did not happen.
#[derive(Debug, Clone, PartialEq)]
pub enum RevertBlocked {
    /// The record store rejected the patched or inserted field map.
    ValidationFailed(String),
    /// Restore refused to overwrite a live record.
    AlreadyExists { source: String, primary_key: String },
    /// No delete-type audit entry exists for the requested key.
    NothingToRestore { source: String, primary_key: String },
}

impl RevertBlocked {
    pub fn describe(&self) -> String {
        match self {
            RevertBlocked::ValidationFailed(reason) => {
                format!("validation failed: {reason}")
            }
            RevertBlocked::AlreadyExists { source, primary_key } => {
                format!("a live record already exists at {source}/{primary_key}")
            }
            RevertBlocked::NothingToRestore { source, primary_key } => {
                format!("no delete entry found for {source}/{primary_key}")
            }
        }
    }
}

/// Reverts records to reconstructed past states and restores deleted
/// records from their last delete snapshot. Every operation runs as one
/// atomic unit against the record store and the audit log, and every
/// successful operation appends a new revert-type audit entry.
pub struct RevertService<'a, S>
where
    S: AuditLogStore + RecordStore + Transactional,
{
    store: &'a S,
}

impl<'a, S> RevertService<'a, S>
where
    S: AuditLogStore + RecordStore + Transactional,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Revert the whole record to its state as of `target_entry_id`.
    pub fn revert_full(
        &self,
        source: &str,
        primary_key: &str,
        target_entry_id: u64,
    ) -> Result<RevertOutcome> {
        self.transactional(|| {
            let reconstructor = StateReconstructor::new(self.store);
            let target_state =
                reconstructor.reconstruct_state(source, primary_key, target_entry_id)?;

            let record = self.store.get(source, primary_key)?;
            let current_state = record.fields.clone();

            match self.store.patch_and_save(&record, &target_state)? {
                SaveOutcome::Invalid(reason) => {
                    Ok(RevertOutcome::Blocked(RevertBlocked::ValidationFailed(reason)))
                }
                SaveOutcome::Saved(updated) => {
                    self.append_revert_entry(
                        source,
                        primary_key,
                        target_entry_id,
                        "full",
                        &current_state,
                        &target_state,
                    )?;
                    Ok(RevertOutcome::Applied(updated))
                }
            }
        })
    }

    /// Revert only the named fields. An empty `fields` list is a legal
    /// no-op: the record is saved unchanged and a revert entry recording
    /// no field changes is still written.
    pub fn revert_partial(
        &self,
        source: &str,
        primary_key: &str,
        target_entry_id: u64,
        fields: &[String],
    ) -> Result<RevertOutcome> {
        self.transactional(|| {
            let reconstructor = StateReconstructor::new(self.store);
            let full_target =
                reconstructor.reconstruct_state(source, primary_key, target_entry_id)?;

            let target_state: FieldMap = full_target
                .into_iter()
                .filter(|(field, _)| fields.contains(field))
                .collect();

            let record = self.store.get(source, primary_key)?;
            let current_state = record.extract(fields);

            match self.store.patch_and_save(&record, &target_state)? {
                SaveOutcome::Invalid(reason) => {
                    Ok(RevertOutcome::Blocked(RevertBlocked::ValidationFailed(reason)))
                }
                SaveOutcome::Saved(updated) => {
                    self.append_revert_entry(
                        source,
                        primary_key,
                        target_entry_id,
                        "partial",
                        &current_state,
                        &target_state,
                    )?;
                    Ok(RevertOutcome::Applied(updated))
                }
            }
        })
    }

    /// Recreate a deleted record from its most recent delete snapshot.
    pub fn restore_deleted(&self, source: &str, primary_key: &str) -> Result<RevertOutcome> {
        self.transactional(|| {
            let Some(delete_entry) = self.store.find_latest_delete(source, primary_key)? else {
                return Ok(RevertOutcome::Blocked(RevertBlocked::NothingToRestore {
                    source: source.to_string(),
                    primary_key: primary_key.to_string(),
                }));
            };

            let snapshot = delete_entry.original_fields();

            if self.store.exists(source, primary_key)? {
                return Ok(RevertOutcome::Blocked(RevertBlocked::AlreadyExists {
                    source: source.to_string(),
                    primary_key: primary_key.to_string(),
                }));
            }

            // Timestamp columns absent from the snapshot are filled with
            // the restore time, when the schema declares them.
            let mut fields = snapshot.clone();
            for column in ["created", "modified"] {
                if self.store.has_column(source, column) && !fields.contains_key(column) {
                    fields.insert(column.to_string(), Value::String(Utc::now().to_rfc3339()));
                }
            }

            match self.store.insert_new(source, primary_key, &fields, false)? {
                SaveOutcome::Invalid(reason) => {
                    Ok(RevertOutcome::Blocked(RevertBlocked::ValidationFailed(reason)))
                }
                SaveOutcome::Saved(restored) => {
                    self.append_revert_entry(
                        source,
                        primary_key,
                        delete_entry.id,
                        "restore",
                        &FieldMap::new(),
                        &snapshot,
                    )?;
                    Ok(RevertOutcome::Applied(restored))
                }
            }
        })
    }

    /// Run `op` inside the store's transaction boundary. Any blocked
    /// outcome or error rolls the whole unit back.
    fn transactional(
        &self,
        op: impl FnOnce() -> Result<RevertOutcome>,
    ) -> Result<RevertOutcome> {
        self.store.begin()?;
        match op() {
            Ok(RevertOutcome::Applied(record)) => {
                self.store.commit()?;
                Ok(RevertOutcome::Applied(record))
            }
            Ok(blocked) => {
                self.store.rollback()?;
                Ok(blocked)
            }
            Err(err) => {
                self.store.rollback()?;
                Err(err)
            }
        }
    }

    fn append_revert_entry(
        &self,
        source: &str,
        primary_key: &str,
        target_entry_id: u64,
        revert_type: &str,
        current_state: &FieldMap,
        target_state: &FieldMap,
    ) -> Result<u64> {
        let meta = RevertMeta {
            revert_to_audit_id: target_entry_id,
            revert_type: revert_type.to_string(),
        };

        self.store.append(NewAuditLog {
            transaction: uuid::Uuid::new_v4().to_string(),
            log_type: AuditLogType::Revert,
            source: source.to_string(),
            parent_source: None,
            primary_key: Some(primary_key.to_string()),
            display_value: None,
            username: None,
            original: encode_field_map(Some(current_state)),
            changed: encode_field_map(Some(target_state)),
            meta: serde_json::to_string(&meta).ok(),
        })
    }
}
