use crate::core::errors::Result;
use crate::core::models::audit_log::FieldMap;
use crate::core::models::record::{Record, SaveOutcome};

/// Port for the live record storage.
pub trait RecordStore: Send + Sync {
    /// Load a record. A missing record is a hard `RecordNotFound` error,
    /// not a `SaveOutcome`; callers reverting a record that does not exist
    /// have a bug.
    fn get(&self, source: &str, primary_key: &str) -> Result<Record>;

    fn exists(&self, source: &str, primary_key: &str) -> Result<bool>;

    /// Apply `changes` on top of the record's current fields and save.
    /// Unnamed fields are untouched. Validation rejection comes back as
    /// `SaveOutcome::Invalid`.
    fn patch_and_save(&self, record: &Record, changes: &FieldMap) -> Result<SaveOutcome>;

    /// Insert a brand-new record with a forced primary key. With
    /// `check_rules` false, business-rule validation is skipped but
    /// required-field constraints still apply (administrative restore).
    fn insert_new(
        &self,
        source: &str,
        primary_key: &str,
        fields: &FieldMap,
        check_rules: bool,
    ) -> Result<SaveOutcome>;

    /// Remove a record. Missing records are a hard `RecordNotFound` error.
    fn remove(&self, source: &str, primary_key: &str) -> Result<()>;

    /// Whether the source's schema declares the given column. Sources
    /// without a declared schema report `false` for everything.
    fn has_column(&self, source: &str, field: &str) -> bool;
}

/// Atomic unit-of-work boundary spanning the record store and the audit
/// log. Snapshot semantics: everything between `begin` and `commit` either
/// lands together or is discarded by `rollback`.
pub trait Transactional: Send + Sync {
    fn begin(&self) -> Result<()>;
    fn commit(&self) -> Result<()>;
    fn rollback(&self) -> Result<()>;
}
