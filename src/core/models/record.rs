use serde::{Deserialize, Serialize};

use crate::core::models::audit_log::FieldMap;

/// A live application record as seen through the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub source: String,
    pub primary_key: String,
    pub fields: FieldMap,
}

impl Record {
    /// Extract the values of the given fields; absent fields are skipped.
    pub fn extract(&self, fields: &[String]) -> FieldMap {
        let mut out = FieldMap::new();
        for name in fields {
            if let Some(value) = self.fields.get(name) {
                out.insert(name.clone(), value.clone());
            }
        }
        out
    }
}

/// Result of a record-store write. Validation rejection is an ordinary
/// outcome, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved(Record),
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_returns_only_named_present_fields() {
        let mut fields = FieldMap::new();
        fields.insert("title".into(), json!("A"));
        fields.insert("body".into(), json!("text"));
        let record = Record {
            source: "articles".into(),
            primary_key: "1".into(),
            fields,
        };

        let extracted = record.extract(&["title".into(), "missing".into()]);
        assert_eq!(extracted.len(), 1);
        assert_eq!(extracted["title"], json!("A"));
    }
}
