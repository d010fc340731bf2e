use colored::Colorize;

use crate::cli::commands::helpers;
use crate::cli::{output, RecordAction};
use crate::core::errors::{AuditrailError, Result};
use crate::core::models::record::SaveOutcome;
use crate::core::services::capture::EventCapture;
use crate::core::traits::record_store::{RecordStore, Transactional};

/// Execute the `auditrail record` subcommands.
///
/// Every mutation runs inside a transaction: the record write and its
/// audit entry land together or not at all.
pub fn execute(action: &RecordAction, user: Option<&str>) -> Result<()> {
    let config = helpers::load_config()?;
    let store = helpers::open_store(&config)?;
    let monitor = helpers::build_monitor(&config)?;

    let capture_config = config.capture_config();
    let actor = helpers::actor_from_flag(user, &capture_config.user_separator);
    let capture = EventCapture::new(&store, capture_config.clone());

    match action {
        RecordAction::Set {
            source,
            key,
            fields,
        } => {
            let changes = helpers::parse_field_assignments(fields)?;

            store.begin()?;
            let result = (|| {
                if store.exists(source, key)? {
                    let record = store.get(source, key)?;
                    let before = record.fields.clone();

                    let saved = match store.patch_and_save(&record, &changes)? {
                        SaveOutcome::Saved(saved) => saved,
                        SaveOutcome::Invalid(reason) => {
                            return Err(AuditrailError::ValidationFailed { detail: reason });
                        }
                    };

                    let entry =
                        capture.record_update(source, key, &before, &saved.fields, actor.as_ref(), None)?;
                    Ok((saved, entry))
                } else {
                    let saved = match store.insert_new(source, key, &changes, true)? {
                        SaveOutcome::Saved(saved) => saved,
                        SaveOutcome::Invalid(reason) => {
                            return Err(AuditrailError::ValidationFailed { detail: reason });
                        }
                    };

                    let entry = capture
                        .record_create(source, key, &saved.fields, actor.as_ref(), None)
                        .map(Some)?;
                    Ok((saved, entry))
                }
            })();

            match result {
                Ok((_, entry)) => {
                    store.commit()?;
                    match &entry {
                        Some(entry) => output::success(&format!(
                            "Saved {source}/{key}, logged entry #{} ({})",
                            entry.id,
                            entry.log_type.as_str(),
                        )),
                        None => output::success(&format!("{source}/{key} unchanged, nothing logged")),
                    }
                    if let Some(entry) = entry {
                        helpers::run_monitor(&monitor, &entry, &store);
                    }
                    Ok(())
                }
                Err(err) => {
                    store.rollback()?;
                    Err(err)
                }
            }
        }

        RecordAction::Delete { source, key } => {
            store.begin()?;
            let result = (|| {
                let record = store.get(source, key)?;
                store.remove(source, key)?;
                capture.record_delete(source, key, &record.fields, actor.as_ref(), None)
            })();

            match result {
                Ok(entry) => {
                    store.commit()?;
                    output::success(&format!(
                        "Deleted {source}/{key}, final state kept in entry #{}",
                        entry.id,
                    ));
                    helpers::run_monitor(&monitor, &entry, &store);
                    Ok(())
                }
                Err(err) => {
                    store.rollback()?;
                    Err(err)
                }
            }
        }

        RecordAction::Show { source, key } => {
            let record = store.get(source, key)?;

            output::header(&format!("{source}/{key}"));
            for (field, value) in &record.fields {
                println!("  {:<20} {}", field.bold(), value);
            }
            println!();
            Ok(())
        }
    }
}
