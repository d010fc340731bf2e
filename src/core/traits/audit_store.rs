use chrono::{DateTime, Utc};

use crate::core::errors::Result;
use crate::core::models::audit_log::{AuditLog, AuditLogType, NewAuditLog};

/// Filters for browsing the audit log.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub source: Option<String>,
    pub primary_key: Option<String>,
    pub log_type: Option<AuditLogType>,
    pub username: Option<String>,
    pub since: Option<DateTime<Utc>>,
}

/// Port for the audit-log storage. Entries are append-only; the store
/// exclusively owns entry identity (`id`) and ordering (`created` ascending,
/// ties broken by `id`).
pub trait AuditLogStore: Send + Sync {
    /// Append a new entry, assigning its id and creation timestamp.
    fn append(&self, entry: NewAuditLog) -> Result<u64>;

    /// Fetch a single entry by id.
    fn get_entry(&self, id: u64) -> Result<Option<AuditLog>>;

    /// All entries for a `(source, primary_key)` pair, in replay order.
    fn find_by_source_and_key(&self, source: &str, primary_key: &str) -> Result<Vec<AuditLog>>;

    /// The most recent delete-type entry for a key, if any.
    fn find_latest_delete(&self, source: &str, primary_key: &str) -> Result<Option<AuditLog>>;

    /// All entries matching the filter, in replay order.
    fn query(&self, filter: &LogFilter) -> Result<Vec<AuditLog>>;

    /// Count entries of a type for a source created at or after `since`.
    fn count_since(
        &self,
        log_type: AuditLogType,
        source: &str,
        since: DateTime<Utc>,
    ) -> Result<usize>;

    /// Per-source counts of entries older than `cutoff`, sorted by source.
    fn count_older_than(
        &self,
        cutoff: DateTime<Utc>,
        source: Option<&str>,
    ) -> Result<Vec<(String, usize)>>;

    /// Delete entries older than `cutoff`, returning how many were removed.
    /// Retention purge only; normal operation never deletes entries.
    fn delete_older_than(&self, cutoff: DateTime<Utc>, source: Option<&str>) -> Result<usize>;
}
