use chrono::{Duration, Timelike};
use serde_json::Value;

use crate::core::errors::{AuditrailError, Result};
use crate::core::models::alert::{Alert, AlertEntrySummary, Severity};
use crate::core::models::audit_log::{AuditLog, AuditLogType, FieldMap};
use crate::core::traits::audit_store::AuditLogStore;

/// A monitor rule inspects each freshly appended entry and may raise an
/// alert. Rules read the store but never write to it.
pub trait AlertRule: Send + Sync + std::fmt::Debug {
    /// Stable tag used in configuration and failure reports.
    fn name(&self) -> &str;

    fn evaluate(&self, entry: &AuditLog, store: &dyn AuditLogStore) -> Result<Option<Alert>>;
}

/// Closed registry of rule tags. Unknown tags are a configuration error,
/// not a lookup through arbitrary type names.
pub fn build_rule(tag: &str, settings: &FieldMap) -> Result<Box<dyn AlertRule>> {
    match tag {
        MassDeleteRule::TAG => Ok(Box::new(MassDeleteRule::from_settings(settings))),
        UnusualTimeRule::TAG => Ok(Box::new(UnusualTimeRule::from_settings(settings))),
        other => Err(AuditrailError::UnknownRule {
            tag: other.to_string(),
        }),
    }
}

fn setting_u64(settings: &FieldMap, key: &str, default: u64) -> u64 {
    settings
        .get(key)
        .and_then(Value::as_u64)
        .unwrap_or(default)
}

/// Raises when a source accumulates too many deletes in a short window.
#[derive(Debug)]
pub struct MassDeleteRule {
    threshold: usize,
    timeframe_minutes: u64,
}

impl MassDeleteRule {
    pub const TAG: &'static str = "mass_delete";

    pub fn new(threshold: usize, timeframe_minutes: u64) -> Self {
        Self {
            threshold,
            timeframe_minutes,
        }
    }

    fn from_settings(settings: &FieldMap) -> Self {
        Self::new(
            setting_u64(settings, "threshold", 10) as usize,
            setting_u64(settings, "timeframe_minutes", 60),
        )
    }
}

impl AlertRule for MassDeleteRule {
    fn name(&self) -> &str {
        Self::TAG
    }

    fn evaluate(&self, entry: &AuditLog, store: &dyn AuditLogStore) -> Result<Option<Alert>> {
        if entry.log_type != AuditLogType::Delete {
            return Ok(None);
        }

        let since = entry.created - Duration::minutes(self.timeframe_minutes as i64);
        let count = store.count_since(AuditLogType::Delete, &entry.source, since)?;

        if count < self.threshold {
            return Ok(None);
        }

        let mut context = serde_json::Map::new();
        context.insert("delete_count".to_string(), Value::from(count));
        context.insert("threshold".to_string(), Value::from(self.threshold));
        context.insert(
            "timeframe_minutes".to_string(),
            Value::from(self.timeframe_minutes),
        );

        Ok(Some(Alert {
            rule_name: Self::TAG.to_string(),
            severity: Severity::High,
            message: format!(
                "{count} deletes on '{}' within {} minutes (threshold {})",
                entry.source, self.timeframe_minutes, self.threshold,
            ),
            entry: AlertEntrySummary::from_entry(entry),
            context,
        }))
    }
}

/// Raises when activity happens inside the configured quiet hours.
///
/// The window may wrap midnight: start 22, end 6 covers 22:00-05:59 UTC.
#[derive(Debug)]
pub struct UnusualTimeRule {
    start_hour: u32,
    end_hour: u32,
}

impl UnusualTimeRule {
    pub const TAG: &'static str = "unusual_time";

    pub fn new(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start_hour: start_hour % 24,
            end_hour: end_hour % 24,
        }
    }

    fn from_settings(settings: &FieldMap) -> Self {
        Self::new(
            setting_u64(settings, "start_hour", 22) as u32,
            setting_u64(settings, "end_hour", 6) as u32,
        )
    }

    fn in_quiet_hours(&self, hour: u32) -> bool {
        if self.start_hour <= self.end_hour {
            hour >= self.start_hour && hour < self.end_hour
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

impl AlertRule for UnusualTimeRule {
    fn name(&self) -> &str {
        Self::TAG
    }

    fn evaluate(&self, entry: &AuditLog, _store: &dyn AuditLogStore) -> Result<Option<Alert>> {
        let hour = entry.created.hour();
        if !self.in_quiet_hours(hour) {
            return Ok(None);
        }

        let mut context = serde_json::Map::new();
        context.insert("hour".to_string(), Value::from(hour));
        context.insert("quiet_start".to_string(), Value::from(self.start_hour));
        context.insert("quiet_end".to_string(), Value::from(self.end_hour));

        Ok(Some(Alert {
            rule_name: Self::TAG.to_string(),
            severity: Severity::Medium,
            message: format!(
                "{} on '{}' at {:02}:00 UTC, inside quiet hours {:02}:00-{:02}:00",
                entry.log_type.as_str(),
                entry.source,
                hour,
                self.start_hour,
                self.end_hour,
            ),
            entry: AlertEntrySummary::from_entry(entry),
            context,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::store::memory::MemoryStore;
    use crate::core::models::audit_log::NewAuditLog;

    fn delete_draft(source: &str, pk: &str) -> NewAuditLog {
        NewAuditLog {
            transaction: "tx".into(),
            log_type: AuditLogType::Delete,
            source: source.into(),
            parent_source: None,
            primary_key: Some(pk.into()),
            display_value: None,
            username: None,
            original: Some("{}".into()),
            changed: None,
            meta: None,
        }
    }

    fn last_entry(store: &MemoryStore, source: &str, pk: &str) -> AuditLog {
        store
            .find_by_source_and_key(source, pk)
            .unwrap()
            .pop()
            .unwrap()
    }

    #[test]
    fn mass_delete_stays_quiet_below_threshold() {
        let store = MemoryStore::new();
        store.append(delete_draft("articles", "1")).unwrap();
        let entry = last_entry(&store, "articles", "1");

        let rule = MassDeleteRule::new(3, 60);
        assert!(rule.evaluate(&entry, &store).unwrap().is_none());
    }

    #[test]
    fn mass_delete_fires_at_threshold() {
        let store = MemoryStore::new();
        for pk in ["1", "2", "3"] {
            store.append(delete_draft("articles", pk)).unwrap();
        }
        let entry = last_entry(&store, "articles", "3");

        let rule = MassDeleteRule::new(3, 60);
        let alert = rule.evaluate(&entry, &store).unwrap().expect("threshold hit");

        assert_eq!(alert.rule_name, "mass_delete");
        assert_eq!(alert.severity, Severity::High);
        assert_eq!(alert.context["delete_count"], serde_json::json!(3));
    }

    #[test]
    fn mass_delete_counts_per_source() {
        let store = MemoryStore::new();
        store.append(delete_draft("articles", "1")).unwrap();
        store.append(delete_draft("comments", "1")).unwrap();
        store.append(delete_draft("comments", "2")).unwrap();
        let entry = last_entry(&store, "articles", "1");

        let rule = MassDeleteRule::new(2, 60);
        assert!(rule.evaluate(&entry, &store).unwrap().is_none());
    }

    #[test]
    fn mass_delete_ignores_non_delete_entries() {
        let store = MemoryStore::new();
        store
            .append(NewAuditLog {
                log_type: AuditLogType::Create,
                original: None,
                changed: Some("{}".into()),
                ..delete_draft("articles", "1")
            })
            .unwrap();
        let entry = last_entry(&store, "articles", "1");

        let rule = MassDeleteRule::new(1, 60);
        assert!(rule.evaluate(&entry, &store).unwrap().is_none());
    }

    #[test]
    fn quiet_hours_window_wraps_midnight() {
        let rule = UnusualTimeRule::new(22, 6);
        assert!(rule.in_quiet_hours(23));
        assert!(rule.in_quiet_hours(2));
        assert!(!rule.in_quiet_hours(12));
        assert!(!rule.in_quiet_hours(6));
    }

    #[test]
    fn quiet_hours_window_without_wrap() {
        let rule = UnusualTimeRule::new(1, 5);
        assert!(rule.in_quiet_hours(3));
        assert!(!rule.in_quiet_hours(0));
        assert!(!rule.in_quiet_hours(5));
    }

    #[test]
    fn registry_rejects_unknown_tags() {
        let err = build_rule("teleport", &FieldMap::new()).unwrap_err();
        assert!(matches!(err, AuditrailError::UnknownRule { .. }));
    }

    #[test]
    fn registry_builds_known_rules_with_settings() {
        let mut settings = FieldMap::new();
        settings.insert("threshold".into(), serde_json::json!(2));
        let rule = build_rule("mass_delete", &settings).unwrap();
        assert_eq!(rule.name(), "mass_delete");

        let rule = build_rule("unusual_time", &FieldMap::new()).unwrap();
        assert_eq!(rule.name(), "unusual_time");
    }
}
