use uuid::Uuid;

use crate::core::errors::Result;
use crate::core::models::audit_log::{
    encode_field_map, AuditLog, AuditLogType, FieldMap, NewAuditLog,
};
use crate::core::traits::audit_store::AuditLogStore;

/// Who performed a change. Stored in the legacy combined form
/// `"id<separator>display"` so older tooling keeps parsing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub id: String,
    pub display: Option<String>,
}

impl Actor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display: None,
        }
    }

    pub fn with_display(id: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display: Some(display.into()),
        }
    }
}

/// Settings for how audit entries are built.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Fields never written to the trail (secrets, noise).
    pub ignored_fields: Vec<String>,
    /// Separator in the combined `"id:display"` username form.
    pub user_separator: String,
    /// Per-source field whose value becomes the entry's display value.
    pub display_fields: std::collections::HashMap<String, String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            ignored_fields: Vec::new(),
            user_separator: ":".to_string(),
            display_fields: std::collections::HashMap::new(),
        }
    }
}

/// Builds and appends audit entries from before/after field maps.
///
/// Each call is one logical operation and gets its own transaction id.
/// Extraction rules: `create` stores the full new state in `changed` and no
/// `original`; `update` stores only the fields that actually differ;
/// `delete` stores the final snapshot in `original` and no `changed`.
pub struct EventCapture<'a> {
    store: &'a dyn AuditLogStore,
    config: CaptureConfig,
}

impl<'a> EventCapture<'a> {
    pub fn new(store: &'a dyn AuditLogStore, config: CaptureConfig) -> Self {
        Self { store, config }
    }

    /// Append a `create` entry. Returns the stored entry.
    pub fn record_create(
        &self,
        source: &str,
        primary_key: &str,
        fields: &FieldMap,
        actor: Option<&Actor>,
        meta: Option<&FieldMap>,
    ) -> Result<AuditLog> {
        let visible = self.strip_ignored(fields);

        let id = self.store.append(NewAuditLog {
            transaction: new_transaction_id(),
            log_type: AuditLogType::Create,
            source: source.to_string(),
            parent_source: None,
            primary_key: Some(primary_key.to_string()),
            display_value: self.display_value(source, fields),
            username: actor.map(|a| self.format_username(a)),
            original: None,
            changed: encode_field_map(Some(&visible)),
            meta: encode_field_map(meta),
        })?;

        self.fetch(id)
    }

    /// Append an `update` entry for the fields that changed between the two
    /// maps. A no-op update (nothing differs once ignored fields are
    /// stripped) writes nothing and returns `None`.
    pub fn record_update(
        &self,
        source: &str,
        primary_key: &str,
        before: &FieldMap,
        after: &FieldMap,
        actor: Option<&Actor>,
        meta: Option<&FieldMap>,
    ) -> Result<Option<AuditLog>> {
        let mut changed = FieldMap::new();
        let mut original = FieldMap::new();

        for (field, new_value) in after {
            if self.is_ignored(field) {
                continue;
            }
            if before.get(field) != Some(new_value) {
                changed.insert(field.clone(), new_value.clone());
                original.insert(
                    field.clone(),
                    before.get(field).cloned().unwrap_or(serde_json::Value::Null),
                );
            }
        }

        if changed.is_empty() {
            return Ok(None);
        }

        let id = self.store.append(NewAuditLog {
            transaction: new_transaction_id(),
            log_type: AuditLogType::Update,
            source: source.to_string(),
            parent_source: None,
            primary_key: Some(primary_key.to_string()),
            display_value: self.display_value(source, after),
            username: actor.map(|a| self.format_username(a)),
            original: encode_field_map(Some(&original)),
            changed: encode_field_map(Some(&changed)),
            meta: encode_field_map(meta),
        })?;

        self.fetch(id).map(Some)
    }

    /// Append a `delete` entry holding the record's final snapshot.
    pub fn record_delete(
        &self,
        source: &str,
        primary_key: &str,
        snapshot: &FieldMap,
        actor: Option<&Actor>,
        meta: Option<&FieldMap>,
    ) -> Result<AuditLog> {
        let visible = self.strip_ignored(snapshot);

        let id = self.store.append(NewAuditLog {
            transaction: new_transaction_id(),
            log_type: AuditLogType::Delete,
            source: source.to_string(),
            parent_source: None,
            primary_key: Some(primary_key.to_string()),
            display_value: self.display_value(source, snapshot),
            username: actor.map(|a| self.format_username(a)),
            original: encode_field_map(Some(&visible)),
            changed: None,
            meta: encode_field_map(meta),
        })?;

        self.fetch(id)
    }

    fn fetch(&self, id: u64) -> Result<AuditLog> {
        self.store
            .get_entry(id)?
            .ok_or(crate::core::errors::AuditrailError::EntryNotFound { id })
    }

    fn is_ignored(&self, field: &str) -> bool {
        self.config.ignored_fields.iter().any(|f| f == field)
    }

    fn strip_ignored(&self, fields: &FieldMap) -> FieldMap {
        fields
            .iter()
            .filter(|(field, _)| !self.is_ignored(field))
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect()
    }

    fn display_value(&self, source: &str, fields: &FieldMap) -> Option<String> {
        let field = self.config.display_fields.get(source)?;
        match fields.get(field)? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    fn format_username(&self, actor: &Actor) -> String {
        match &actor.display {
            Some(display) => format!("{}{}{}", actor.id, self.config.user_separator, display),
            None => actor.id.clone(),
        }
    }
}

/// Split a stored combined username back into `(id, display)`.
pub fn split_username<'u>(username: &'u str, separator: &str) -> (&'u str, Option<&'u str>) {
    match username.split_once(separator) {
        Some((id, display)) if !display.is_empty() => (id, Some(display)),
        _ => (username, None),
    }
}

fn new_transaction_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::store::memory::MemoryStore;
    use serde_json::json;

    fn map(pairs: &[(&str, serde_json::Value)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn capture_with(store: &MemoryStore, config: CaptureConfig) -> EventCapture<'_> {
        EventCapture::new(store, config)
    }

    #[test]
    fn create_stores_full_state_in_changed() {
        let store = MemoryStore::new();
        let capture = capture_with(&store, CaptureConfig::default());

        let entry = capture
            .record_create("articles", "1", &map(&[("title", json!("Hi"))]), None, None)
            .unwrap();

        assert_eq!(entry.log_type, AuditLogType::Create);
        assert!(entry.original.is_none());
        assert_eq!(entry.changed_fields(), map(&[("title", json!("Hi"))]));
        assert!(!entry.transaction.is_empty());
    }

    #[test]
    fn update_stores_only_dirty_fields() {
        let store = MemoryStore::new();
        let capture = capture_with(&store, CaptureConfig::default());

        let before = map(&[("title", json!("A")), ("body", json!("same"))]);
        let after = map(&[("title", json!("B")), ("body", json!("same"))]);

        let entry = capture
            .record_update("articles", "1", &before, &after, None, None)
            .unwrap()
            .expect("a dirty field produces an entry");

        assert_eq!(entry.changed_fields(), map(&[("title", json!("B"))]));
        assert_eq!(entry.original_fields(), map(&[("title", json!("A"))]));
    }

    #[test]
    fn no_op_update_writes_nothing() {
        let store = MemoryStore::new();
        let capture = capture_with(&store, CaptureConfig::default());

        let state = map(&[("title", json!("A"))]);
        let entry = capture
            .record_update("articles", "1", &state, &state, None, None)
            .unwrap();

        assert!(entry.is_none());
        assert!(store.find_by_source_and_key("articles", "1").unwrap().is_empty());
    }

    #[test]
    fn delete_stores_snapshot_in_original() {
        let store = MemoryStore::new();
        let capture = capture_with(&store, CaptureConfig::default());

        let snapshot = map(&[("title", json!("Bye"))]);
        let entry = capture
            .record_delete("articles", "1", &snapshot, None, None)
            .unwrap();

        assert_eq!(entry.log_type, AuditLogType::Delete);
        assert!(entry.changed.is_none());
        assert_eq!(entry.original_fields(), snapshot);
    }

    #[test]
    fn ignored_fields_never_reach_the_trail() {
        let store = MemoryStore::new();
        let capture = capture_with(
            &store,
            CaptureConfig {
                ignored_fields: vec!["password".to_string()],
                ..CaptureConfig::default()
            },
        );

        let entry = capture
            .record_create(
                "users",
                "1",
                &map(&[("name", json!("ada")), ("password", json!("s3cret"))]),
                None,
                None,
            )
            .unwrap();
        assert!(!entry.changed_fields().contains_key("password"));

        let before = map(&[("password", json!("s3cret"))]);
        let after = map(&[("password", json!("other"))]);
        let update = capture
            .record_update("users", "1", &before, &after, None, None)
            .unwrap();
        assert!(update.is_none());
    }

    #[test]
    fn actor_is_recorded_in_combined_form() {
        let store = MemoryStore::new();
        let capture = capture_with(&store, CaptureConfig::default());

        let actor = Actor::with_display("7", "Grace Hopper");
        let entry = capture
            .record_create("articles", "1", &map(&[]), Some(&actor), None)
            .unwrap();

        assert_eq!(entry.username.as_deref(), Some("7:Grace Hopper"));
        let (id, display) = split_username(entry.username.as_deref().unwrap(), ":");
        assert_eq!(id, "7");
        assert_eq!(display, Some("Grace Hopper"));
    }

    #[test]
    fn custom_separator_is_honored() {
        let store = MemoryStore::new();
        let capture = capture_with(
            &store,
            CaptureConfig {
                user_separator: "|".to_string(),
                ..CaptureConfig::default()
            },
        );

        let actor = Actor::with_display("7", "Grace");
        let entry = capture
            .record_create("articles", "1", &map(&[]), Some(&actor), None)
            .unwrap();

        assert_eq!(entry.username.as_deref(), Some("7|Grace"));
    }

    #[test]
    fn display_value_comes_from_configured_field() {
        let store = MemoryStore::new();
        let mut config = CaptureConfig::default();
        config
            .display_fields
            .insert("articles".to_string(), "title".to_string());
        let capture = capture_with(&store, config);

        let entry = capture
            .record_create("articles", "1", &map(&[("title", json!("Hello"))]), None, None)
            .unwrap();

        assert_eq!(entry.display_value.as_deref(), Some("Hello"));
    }

    #[test]
    fn meta_passes_through() {
        let store = MemoryStore::new();
        let capture = capture_with(&store, CaptureConfig::default());

        let meta = map(&[("ip", json!("10.0.0.1"))]);
        let entry = capture
            .record_create("articles", "1", &map(&[]), None, Some(&meta))
            .unwrap();

        assert_eq!(entry.meta_fields(), meta);
    }

    #[test]
    fn each_operation_gets_its_own_transaction() {
        let store = MemoryStore::new();
        let capture = capture_with(&store, CaptureConfig::default());

        let first = capture
            .record_create("articles", "1", &map(&[]), None, None)
            .unwrap();
        let second = capture
            .record_delete("articles", "1", &map(&[]), None, None)
            .unwrap();

        assert_ne!(first.transaction, second.transaction);
    }

    #[test]
    fn split_username_without_separator_is_id_only() {
        assert_eq!(split_username("system", ":"), ("system", None));
    }
}
