use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A flat map of field name to JSON value, as stored in the
/// `original`/`changed`/`meta` columns of an audit entry.
pub type FieldMap = serde_json::Map<String, serde_json::Value>;

/// Kinds of mutation an audit entry can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditLogType {
    Create,
    Update,
    Delete,
    Revert,
}

impl AuditLogType {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditLogType::Create => "create",
            AuditLogType::Update => "update",
            AuditLogType::Delete => "delete",
            AuditLogType::Revert => "revert",
        }
    }
}

impl std::str::FromStr for AuditLogType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "create" => Ok(AuditLogType::Create),
            "update" => Ok(AuditLogType::Update),
            "delete" => Ok(AuditLogType::Delete),
            "revert" => Ok(AuditLogType::Revert),
            other => Err(format!("unknown audit log type '{other}'")),
        }
    }
}

/// One immutable entry in the audit log.
///
/// The `original`, `changed` and `meta` columns hold serialized JSON, kept
/// as raw strings so that `null` survives as `null` and historical rows
/// with malformed payloads can still be listed. Use the `*_fields()`
/// accessors for decoded access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: u64,
    /// Groups entries created in the same logical operation.
    pub transaction: String,
    #[serde(rename = "type")]
    pub log_type: AuditLogType,
    pub source: String,
    /// Source that triggered this change via a cascade, if any.
    pub parent_source: Option<String>,
    pub primary_key: Option<String>,
    pub display_value: Option<String>,
    /// Actor, in the legacy combined `"id:display"` form.
    pub username: Option<String>,
    pub original: Option<String>,
    pub changed: Option<String>,
    pub meta: Option<String>,
    pub created: DateTime<Utc>,
}

impl AuditLog {
    /// Decoded `original` field map. Lenient: `None` or malformed JSON
    /// yields an empty map, historical integrity cannot be enforced
    /// retroactively.
    pub fn original_fields(&self) -> FieldMap {
        decode_field_map(self.original.as_deref())
    }

    /// Decoded `changed` field map, lenient like `original_fields`.
    pub fn changed_fields(&self) -> FieldMap {
        decode_field_map(self.changed.as_deref())
    }

    /// Decoded `meta` map, lenient like `original_fields`.
    pub fn meta_fields(&self) -> FieldMap {
        decode_field_map(self.meta.as_deref())
    }
}

/// An audit entry draft. The store assigns `id` and `created` at append
/// time; ordering is by `created` ascending with `id` as tiebreaker.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditLog {
    pub transaction: String,
    pub log_type: AuditLogType,
    pub source: String,
    pub parent_source: Option<String>,
    pub primary_key: Option<String>,
    pub display_value: Option<String>,
    pub username: Option<String>,
    pub original: Option<String>,
    pub changed: Option<String>,
    pub meta: Option<String>,
}

/// Serialize a field map for storage. `None` stays `None` so the stored
/// column is `null`, never the string `"null"`.
pub fn encode_field_map(map: Option<&FieldMap>) -> Option<String> {
    map.map(|m| serde_json::Value::Object(m.clone()).to_string())
}

fn decode_field_map(raw: Option<&str>) -> FieldMap {
    match raw {
        None => FieldMap::new(),
        Some(text) => match serde_json::from_str::<serde_json::Value>(text) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => FieldMap::new(),
        },
    }
}

/// Provenance recorded in the `meta` column of revert-type entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevertMeta {
    pub revert_to_audit_id: u64,
    pub revert_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry_with(original: Option<&str>, changed: Option<&str>) -> AuditLog {
        AuditLog {
            id: 1,
            transaction: "tx".into(),
            log_type: AuditLogType::Update,
            source: "articles".into(),
            parent_source: None,
            primary_key: Some("1".into()),
            display_value: None,
            username: None,
            original: original.map(String::from),
            changed: changed.map(String::from),
            meta: None,
            created: Utc::now(),
        }
    }

    #[test]
    fn type_round_trips_through_serde() {
        let json = serde_json::to_string(&AuditLogType::Revert).unwrap();
        assert_eq!(json, "\"revert\"");
        let back: AuditLogType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AuditLogType::Revert);
    }

    #[test]
    fn decodes_valid_field_maps() {
        let entry = entry_with(Some(r#"{"title":"A"}"#), Some(r#"{"title":"B"}"#));
        assert_eq!(entry.original_fields()["title"], json!("A"));
        assert_eq!(entry.changed_fields()["title"], json!("B"));
    }

    #[test]
    fn malformed_payload_decodes_to_empty_map() {
        let entry = entry_with(Some("{not json"), Some("[1,2,3]"));
        assert!(entry.original_fields().is_empty());
        // Valid JSON but not an object is treated the same way
        assert!(entry.changed_fields().is_empty());
    }

    #[test]
    fn absent_payload_decodes_to_empty_map() {
        let entry = entry_with(None, None);
        assert!(entry.original_fields().is_empty());
        assert!(entry.changed_fields().is_empty());
        assert!(entry.meta_fields().is_empty());
    }

    #[test]
    fn encode_preserves_null_as_null() {
        assert_eq!(encode_field_map(None), None);

        let mut map = FieldMap::new();
        map.insert("note".into(), serde_json::Value::Null);
        let encoded = encode_field_map(Some(&map)).unwrap();
        assert_eq!(encoded, r#"{"note":null}"#);
    }

    #[test]
    fn entry_serializes_type_under_legacy_name() {
        let entry = entry_with(None, None);
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], json!("update"));
    }
}
