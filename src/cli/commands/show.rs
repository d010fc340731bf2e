use colored::Colorize;

use crate::cli::commands::helpers;
use crate::cli::output;
use crate::core::errors::{AuditrailError, Result};
use crate::core::models::audit_log::FieldMap;
use crate::core::traits::audit_store::AuditLogStore;

/// Execute the `auditrail show` command: one entry, in full.
pub fn execute(id: u64) -> Result<()> {
    let config = helpers::load_config()?;
    let store = helpers::open_store(&config)?;

    let entry = store
        .get_entry(id)?
        .ok_or(AuditrailError::EntryNotFound { id })?;

    output::header(&format!("Audit entry #{id}"));
    println!();
    println!("  {:<14} {}", "type".bold(), entry.log_type.as_str());
    println!("  {:<14} {}", "source".bold(), entry.source);
    if let Some(pk) = &entry.primary_key {
        println!("  {:<14} {}", "primary key".bold(), pk);
    }
    if let Some(display) = &entry.display_value {
        println!("  {:<14} {}", "display".bold(), display);
    }
    if let Some(username) = &entry.username {
        println!("  {:<14} {}", "user".bold(), username);
    }
    println!("  {:<14} {}", "transaction".bold(), entry.transaction);
    println!(
        "  {:<14} {}",
        "created".bold(),
        entry.created.format("%Y-%m-%d %H:%M:%S UTC"),
    );

    let original = entry.original_fields();
    let changed = entry.changed_fields();
    if !changed.is_empty() || !original.is_empty() {
        println!();
        print_field_changes(&original, &changed);
    }

    let meta = entry.meta_fields();
    if !meta.is_empty() {
        println!();
        println!("  {}", "meta".bold());
        for (field, value) in &meta {
            println!("    {field} = {value}");
        }
    }

    println!();
    Ok(())
}

/// Textual per-field summary: `field: old -> new` where both sides exist,
/// otherwise just the side the entry carries.
fn print_field_changes(original: &FieldMap, changed: &FieldMap) {
    println!("  {}", "changes".bold());

    for (field, new_value) in changed {
        match original.get(field) {
            Some(old_value) => println!(
                "    {field}: {} {} {}",
                old_value.to_string().red(),
                "->".dimmed(),
                new_value.to_string().green(),
            ),
            None => println!("    {field}: {}", new_value.to_string().green()),
        }
    }

    // Fields only in the original (delete snapshots).
    for (field, old_value) in original {
        if !changed.contains_key(field) {
            println!("    {field}: {}", old_value.to_string().red());
        }
    }
}
