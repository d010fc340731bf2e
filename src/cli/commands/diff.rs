use std::collections::BTreeSet;

use serde_json::Value;

use crate::cli::commands::helpers;
use crate::cli::output;
use crate::core::errors::{AuditrailError, Result};
use crate::core::models::audit_log::AuditLog;
use crate::core::services::diff_engine::{html_escape, DiffEngine};
use crate::core::traits::audit_store::AuditLogStore;

/// Execute the `auditrail diff` command.
///
/// Renders a standalone HTML report for one audit entry: one card per
/// changed field, inline or side-by-side.
pub fn execute(id: u64, out_file: Option<&str>, side_by_side: bool) -> Result<()> {
    let config = helpers::load_config()?;
    let store = helpers::open_store(&config)?;

    let entry = store
        .get_entry(id)?
        .ok_or(AuditrailError::EntryNotFound { id })?;

    let engine = DiffEngine::new(config.diff.context_lines);
    let report = render_report(&entry, &engine, side_by_side);

    match out_file {
        Some(path) => {
            std::fs::write(path, report)?;
            output::success(&format!("Wrote diff report for entry #{id} to {path}"));
        }
        None => println!("{report}"),
    }

    Ok(())
}

fn render_report(entry: &AuditLog, engine: &DiffEngine, side_by_side: bool) -> String {
    let original = entry.original_fields();
    let changed = entry.changed_fields();

    let mut fields: BTreeSet<&String> = changed.keys().collect();
    fields.extend(original.keys());

    let mut cards = String::new();
    for field in fields {
        let old_value = original.get(field.as_str());
        let new_value = changed.get(field.as_str());
        if old_value == new_value {
            continue;
        }

        let old_text = old_value.map(value_as_text).unwrap_or_default();
        let new_text = new_value.map(value_as_text).unwrap_or_default();

        let diff = if side_by_side {
            engine.compare_side_by_side(&old_text, &new_text)
        } else {
            engine.compare(&old_text, &new_text)
        };

        cards.push_str(&format!(
            "<section class=\"field-card\">\n\
             <h2>{}</h2>\n{diff}\n</section>\n",
            html_escape(field),
        ));
    }

    if cards.is_empty() {
        cards.push_str("<p class=\"text-muted\">This entry carries no field changes.</p>\n");
    }

    let title = html_escape(&format!(
        "Entry #{} - {} on {}{}",
        entry.id,
        entry.log_type.as_str(),
        entry.source,
        entry
            .primary_key
            .as_deref()
            .map(|pk| format!("/{pk}"))
            .unwrap_or_default(),
    ));

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n<style>\n{STYLESHEET}</style>\n</head>\n<body>\n\
         <h1>{title}</h1>\n\
         <p class=\"entry-meta\">{} &middot; transaction {} &middot; {}</p>\n\
         {cards}</body>\n</html>\n",
        entry.created.format("%Y-%m-%d %H:%M:%S UTC"),
        html_escape(&entry.transaction),
        html_escape(entry.username.as_deref().unwrap_or("unknown user")),
    )
}

/// Field values as diffable text: strings raw, everything else as
/// pretty-printed JSON so multi-line structures diff line by line.
fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

const STYLESHEET: &str = r#"body { font-family: -apple-system, 'Segoe UI', sans-serif; margin: 2rem auto; max-width: 60rem; color: #222; }
h1 { font-size: 1.3rem; }
.entry-meta { color: #777; font-size: 0.85rem; }
.field-card { border: 1px solid #ddd; border-radius: 6px; padding: 1rem; margin: 1rem 0; }
.field-card h2 { font-size: 1rem; margin: 0 0 0.75rem; font-family: monospace; }
table.diff-wrapper { width: 100%; border-collapse: collapse; font-family: monospace; font-size: 0.85rem; }
table.diff-wrapper th { text-align: left; color: #999; font-weight: normal; border-bottom: 1px solid #eee; padding: 0.2rem 0.5rem; }
table.diff-wrapper td { padding: 0.15rem 0.5rem; vertical-align: top; white-space: pre-wrap; word-wrap: break-word; }
td.line-num, th.line-num { width: 3rem; text-align: right; color: #999; user-select: none; }
td.sign, th.sign { width: 1rem; color: #999; }
tr.added td { background: #e6ffec; }
tr.removed td { background: #ffebe9; }
tr.changed td.old { background: #ffebe9; }
tr.changed td.new { background: #e6ffec; }
tr.separator td { color: #999; background: #fafafa; }
ins { background: #abf2bc; text-decoration: none; }
del { background: #ffc0bd; }
.empty-line { color: #999; }
.diff-whitespace-change .p-2 { font-family: monospace; font-size: 0.85rem; }
.text-muted { color: #777; }
.text-center { text-align: center; }
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::audit_log::AuditLogType;
    use chrono::Utc;

    fn entry(original: Option<&str>, changed: Option<&str>) -> AuditLog {
        AuditLog {
            id: 3,
            transaction: "tx".into(),
            log_type: AuditLogType::Update,
            source: "articles".into(),
            parent_source: None,
            primary_key: Some("1".into()),
            display_value: None,
            username: Some("7:Grace".into()),
            original: original.map(String::from),
            changed: changed.map(String::from),
            meta: None,
            created: Utc::now(),
        }
    }

    #[test]
    fn report_has_one_card_per_changed_field() {
        let entry = entry(
            Some(r#"{"title":"A","body":"same"}"#),
            Some(r#"{"title":"B","body":"same"}"#),
        );
        let report = render_report(&entry, &DiffEngine::default(), false);

        assert_eq!(report.matches("field-card").count(), 2); // css class + one card
        assert!(report.contains("<h2>title</h2>"));
        assert!(!report.contains("<h2>body</h2>"));
    }

    #[test]
    fn entry_without_changes_says_so() {
        let entry = entry(None, None);
        let report = render_report(&entry, &DiffEngine::default(), false);
        assert!(report.contains("no field changes"));
    }

    #[test]
    fn report_is_a_standalone_document() {
        let entry = entry(None, Some(r#"{"title":"A"}"#));
        let report = render_report(&entry, &DiffEngine::default(), false);
        assert!(report.starts_with("<!DOCTYPE html>"));
        assert!(report.contains("<style>"));
        assert!(report.contains("Entry #3"));
    }

    #[test]
    fn side_by_side_layout_is_used_when_asked() {
        let entry = entry(Some(r#"{"title":"A"}"#), Some(r#"{"title":"B"}"#));
        let report = render_report(&entry, &DiffEngine::default(), true);
        assert!(report.contains("diff-side-by-side"));
    }
}
