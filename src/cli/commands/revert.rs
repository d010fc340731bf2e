use colored::Colorize;

use crate::cli::commands::helpers;
use crate::cli::output;
use crate::core::errors::Result;
use crate::core::services::reconstructor::StateReconstructor;
use crate::core::services::revert_service::{RevertOutcome, RevertService};
use crate::core::traits::record_store::RecordStore;

/// Execute the `auditrail revert` command.
///
/// Full revert by default; `--fields` narrows it to a partial revert and
/// `--preview` prints the would-be changes without touching anything.
pub fn execute(
    source: &str,
    key: &str,
    entry_id: u64,
    fields: &[String],
    preview: bool,
) -> Result<()> {
    let config = helpers::load_config()?;
    let store = helpers::open_store(&config)?;

    if preview {
        return print_preview(&store, source, key, entry_id, fields);
    }

    let service = RevertService::new(&store);
    let outcome = if fields.is_empty() {
        service.revert_full(source, key, entry_id)?
    } else {
        service.revert_partial(source, key, entry_id, fields)?
    };

    match outcome {
        RevertOutcome::Applied(record) => {
            output::success(&format!(
                "Reverted {source}/{key} to its state at entry #{entry_id}",
            ));
            if !fields.is_empty() {
                println!("  Fields: {}", fields.join(", "));
            }
            for (field, value) in &record.fields {
                println!("  {:<20} {}", field.bold(), value);
            }
            println!();
        }
        RevertOutcome::Blocked(blocked) => {
            output::warning(&format!("Revert blocked: {}", blocked.describe()));
            println!("  Nothing was changed.");
        }
    }

    Ok(())
}

/// Show what a revert would change, read-only.
fn print_preview(
    store: &crate::adapters::store::json_store::JsonFileStore,
    source: &str,
    key: &str,
    entry_id: u64,
    fields: &[String],
) -> Result<()> {
    let reconstructor = StateReconstructor::new(store);
    let mut target = reconstructor.reconstruct_state(source, key, entry_id)?;

    if !fields.is_empty() {
        target.retain(|field, _| fields.iter().any(|f| f == field));
    }

    let record = store.get(source, key)?;
    let current = if fields.is_empty() {
        record.fields.clone()
    } else {
        record.extract(fields)
    };

    let diff = reconstructor.calculate_diff(&current, &target);

    output::header(&format!(
        "Preview: revert {source}/{key} to entry #{entry_id}"
    ));
    if diff.is_empty() {
        output::success("Already at the target state, nothing to change");
        return Ok(());
    }

    println!();
    for (field, change) in &diff {
        println!(
            "  {}: {} {} {}",
            field.bold(),
            change.current.to_string().red(),
            "->".dimmed(),
            change.target.to_string().green(),
        );
    }
    println!("\n  Run again without --preview to apply.");

    Ok(())
}
