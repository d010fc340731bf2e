use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::adapters::channels::build_channel;
use crate::adapters::channels::console::ConsoleChannel;
use crate::adapters::store::json_store::JsonFileStore;
use crate::cli::{context, output};
use crate::config::app_config::AppConfig;
use crate::core::errors::{AuditrailError, Result};
use crate::core::models::audit_log::{AuditLog, AuditLogType, FieldMap};
use crate::core::monitor::rules::build_rule;
use crate::core::monitor::AuditMonitor;
use crate::core::services::capture::Actor;
use crate::core::traits::audit_store::AuditLogStore;
use crate::core::traits::channel::AlertChannel;

/// Load the config from the active store directory.
pub fn load_config() -> Result<AppConfig> {
    AppConfig::load(context::auditrail_dir())
}

/// Open the file-backed store and register the configured source schemas.
pub fn open_store(config: &AppConfig) -> Result<JsonFileStore> {
    let store = JsonFileStore::open(context::auditrail_dir())?;
    for (source, schema) in &config.sources {
        store.define_schema(source, schema.clone());
    }
    Ok(store)
}

/// Build the monitor from config. Disabled or empty config yields an
/// empty monitor; an unknown rule or channel tag fails here, before any
/// data is touched. A monitor with rules but no channels gets the
/// console channel so alerts are never silently dropped.
pub fn build_monitor(config: &AppConfig) -> Result<AuditMonitor> {
    if !config.monitor.enabled {
        return Ok(AuditMonitor::new(Vec::new(), Vec::new()));
    }

    let mut rules = Vec::new();
    for entry in &config.monitor.rules {
        rules.push(build_rule(&entry.tag, &entry.settings_map())?);
    }

    let mut channels: Vec<Box<dyn AlertChannel>> = Vec::new();
    for entry in &config.monitor.channels {
        channels.push(build_channel(
            &entry.tag,
            &entry.settings_map(),
            context::auditrail_dir(),
        )?);
    }
    if !rules.is_empty() && channels.is_empty() {
        channels.push(Box::new(ConsoleChannel));
    }

    Ok(AuditMonitor::new(rules, channels))
}

/// Run the monitor against a freshly appended entry, surfacing rule and
/// channel failures as warnings.
pub fn run_monitor(monitor: &AuditMonitor, entry: &AuditLog, store: &dyn AuditLogStore) {
    if monitor.is_empty() {
        return;
    }
    let report = monitor.inspect(entry, store);
    for failure in &report.failures {
        output::warning(failure);
    }
}

/// Turn the global `--user` flag into an actor. Accepts a bare id or the
/// combined `"id<separator>display"` form.
pub fn actor_from_flag(user: Option<&str>, separator: &str) -> Option<Actor> {
    user.map(|raw| match raw.split_once(separator) {
        Some((id, display)) if !display.is_empty() => Actor::with_display(id, display),
        _ => Actor::new(raw),
    })
}

/// Parse `field=value` assignments. Values are JSON when they parse as
/// JSON (numbers, booleans, null, quoted strings) and plain strings
/// otherwise.
pub fn parse_field_assignments(pairs: &[String]) -> Result<FieldMap> {
    let mut fields = FieldMap::new();
    for pair in pairs {
        let (name, raw) = pair
            .split_once('=')
            .ok_or_else(|| AuditrailError::ValidationFailed {
                detail: format!("expected field=value, got '{pair}'"),
            })?;
        if name.is_empty() {
            return Err(AuditrailError::ValidationFailed {
                detail: format!("empty field name in '{pair}'"),
            });
        }
        let value =
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        fields.insert(name.to_string(), value);
    }
    Ok(fields)
}

/// Parse a date string (ISO 8601: `YYYY-MM-DD`) into a UTC DateTime.
pub fn parse_since(s: &str) -> Result<DateTime<Utc>> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| AuditrailError::InvalidConfig {
            detail: format!(
                "Invalid date format: '{s}'. Expected ISO 8601 (YYYY-MM-DD), e.g. 2026-01-15"
            ),
        })
        .map(|d| Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0).expect("midnight is always valid")))
}

/// Parse the `--type` filter value.
pub fn parse_log_type(s: &str) -> Result<AuditLogType> {
    s.parse()
        .map_err(|detail: String| AuditrailError::InvalidConfig { detail })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assignments_parse_json_values_and_fall_back_to_strings() {
        let fields = parse_field_assignments(&[
            "title=Hello world".to_string(),
            "views=42".to_string(),
            "published=true".to_string(),
            "subtitle=null".to_string(),
        ])
        .unwrap();

        assert_eq!(fields["title"], json!("Hello world"));
        assert_eq!(fields["views"], json!(42));
        assert_eq!(fields["published"], json!(true));
        assert_eq!(fields["subtitle"], Value::Null);
    }

    #[test]
    fn assignment_without_equals_is_rejected() {
        let err = parse_field_assignments(&["title".to_string()]).unwrap_err();
        assert!(matches!(err, AuditrailError::ValidationFailed { .. }));
    }

    #[test]
    fn actor_flag_splits_combined_form() {
        let actor = actor_from_flag(Some("7:Grace"), ":").unwrap();
        assert_eq!(actor.id, "7");
        assert_eq!(actor.display.as_deref(), Some("Grace"));

        let actor = actor_from_flag(Some("system"), ":").unwrap();
        assert_eq!(actor.id, "system");
        assert!(actor.display.is_none());
    }

    #[test]
    fn since_rejects_garbage() {
        assert!(parse_since("2026-01-15").is_ok());
        assert!(parse_since("yesterday").is_err());
    }
}
