use std::io::{self, BufRead, Write};

use chrono::{Duration, Utc};
use colored::Colorize;

use crate::cli::commands::helpers;
use crate::cli::output;
use crate::core::errors::Result;
use crate::core::traits::audit_store::AuditLogStore;

/// Execute the `auditrail cleanup` command.
///
/// Purges entries older than the retention period, per source. `--days`
/// overrides the configured periods, `--dry-run` only reports, `--force`
/// skips the confirmation prompt.
pub fn execute(
    source: Option<&str>,
    days_override: Option<u64>,
    dry_run: bool,
    force: bool,
) -> Result<()> {
    let config = helpers::load_config()?;
    let store = helpers::open_store(&config)?;

    let now = Utc::now();

    // Every source that currently has entries, or just the requested one.
    let sources: Vec<String> = match source {
        Some(s) => vec![s.to_string()],
        None => store
            .count_older_than(now, None)?
            .into_iter()
            .map(|(source, _)| source)
            .collect(),
    };

    // Per-source plan: retention days, cutoff, stale count.
    let mut plan = Vec::new();
    let mut total = 0usize;
    for source in &sources {
        let days = days_override.unwrap_or_else(|| config.retention_days(source));
        let cutoff = now - Duration::days(days as i64);
        let stale: usize = store
            .count_older_than(cutoff, Some(source.as_str()))?
            .into_iter()
            .map(|(_, count)| count)
            .sum();
        total += stale;
        plan.push((source.clone(), days, cutoff, stale));
    }

    output::header("auditrail cleanup");
    println!();
    for (source, days, _, stale) in &plan {
        println!(
            "  {:<24} keep {:>4} days   {:>6} stale",
            source.bold(),
            days,
            if *stale > 0 {
                stale.to_string().yellow().to_string()
            } else {
                stale.to_string().dimmed().to_string()
            },
        );
    }
    println!();

    if total == 0 {
        output::success("Nothing to purge");
        return Ok(());
    }

    if dry_run {
        output::warning(&format!("Dry run: {total} entries would be deleted"));
        return Ok(());
    }

    if !force && !confirm(total)? {
        output::warning("Aborted, nothing deleted");
        return Ok(());
    }

    let mut deleted = 0usize;
    for (source, _, cutoff, stale) in &plan {
        if *stale == 0 {
            continue;
        }
        deleted += store.delete_older_than(*cutoff, Some(source.as_str()))?;
    }

    output::success(&format!("Deleted {deleted} audit entries"));
    Ok(())
}

fn confirm(total: usize) -> Result<bool> {
    print!("  Delete {total} audit entries permanently? [y/N]: ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    let answer = input.trim().to_lowercase();

    Ok(answer == "y" || answer == "yes")
}
