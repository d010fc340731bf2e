use colored::Colorize;

use crate::cli::commands::helpers;
use crate::cli::output;
use crate::core::errors::Result;
use crate::core::services::revert_service::{RevertOutcome, RevertService};

/// Execute the `auditrail restore` command: bring a deleted record back
/// from its last delete entry.
pub fn execute(source: &str, key: &str) -> Result<()> {
    let config = helpers::load_config()?;
    let store = helpers::open_store(&config)?;

    let service = RevertService::new(&store);

    match service.restore_deleted(source, key)? {
        RevertOutcome::Applied(record) => {
            output::success(&format!("Restored {source}/{key}"));
            for (field, value) in &record.fields {
                println!("  {:<20} {}", field.bold(), value);
            }
            println!();
        }
        RevertOutcome::Blocked(blocked) => {
            output::warning(&format!("Restore blocked: {}", blocked.describe()));
            println!("  Nothing was changed.");
        }
    }

    Ok(())
}
