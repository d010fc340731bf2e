use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::core::errors::Result;
use crate::core::models::audit_log::{AuditLogType, FieldMap};
use crate::core::traits::audit_store::AuditLogStore;

/// One field that a revert would change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub current: Value,
    pub target: Value,
}

/// Replays a record's audit history to compute its field-state at a past
/// point in time.
pub struct StateReconstructor<'a> {
    store: &'a dyn AuditLogStore,
}

impl<'a> StateReconstructor<'a> {
    pub fn new(store: &'a dyn AuditLogStore) -> Self {
        Self { store }
    }

    /// Reconstruct the record's state as of `target_entry_id` (inclusive).
    ///
    /// Walks the ordered series for `(source, primary_key)`:
    /// - `create` replaces the accumulator with the entry's changed map
    /// - `update` and `revert` merge their changed map on top (a revert is
    ///   a real mutation and becomes the new baseline)
    /// - `delete` does not contribute forward state
    ///
    /// Lenient: no entries yields an empty map, and a target id
    /// that is not part of the series replays the entire history rather
    /// than erroring.
    pub fn reconstruct_state(
        &self,
        source: &str,
        primary_key: &str,
        target_entry_id: u64,
    ) -> Result<FieldMap> {
        let entries = self.store.find_by_source_and_key(source, primary_key)?;

        let mut state = FieldMap::new();

        for entry in &entries {
            match entry.log_type {
                AuditLogType::Create => {
                    state = entry.changed_fields();
                }
                AuditLogType::Update | AuditLogType::Revert => {
                    for (field, value) in entry.changed_fields() {
                        state.insert(field, value);
                    }
                }
                AuditLogType::Delete => {}
            }

            if entry.id == target_entry_id {
                break;
            }
        }

        Ok(state)
    }

    /// Fields that differ between the current and target state.
    ///
    /// Only target-directed changes are surfaced: every key of `target`
    /// that is absent from `current` or holds a different value appears in
    /// the result; keys present only in `current` are never reported.
    /// Deterministic, may be empty.
    pub fn calculate_diff(
        &self,
        current: &FieldMap,
        target: &FieldMap,
    ) -> BTreeMap<String, FieldChange> {
        let mut diff = BTreeMap::new();

        for (field, value) in target {
            let current_value = current.get(field).cloned().unwrap_or(Value::Null);
            if current.get(field) != Some(value) {
                diff.insert(
                    field.clone(),
                    FieldChange {
                        current: current_value,
                        target: value.clone(),
                    },
                );
            }
        }

        diff
    }
}
