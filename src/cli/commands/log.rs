use colored::Colorize;

use crate::cli::commands::helpers;
use crate::cli::output;
use crate::config::app_config::LinksSection;
use crate::core::errors::Result;
use crate::core::models::audit_log::{AuditLog, AuditLogType};
use crate::core::services::capture::split_username;
use crate::core::traits::audit_store::{AuditLogStore, LogFilter};

/// Execute the `auditrail log` command.
///
/// Displays the audit trail with optional filters for source, key, type,
/// user, date and entry count.
pub fn execute(
    source: Option<&str>,
    key: Option<&str>,
    log_type: Option<&str>,
    user: Option<&str>,
    since: Option<&str>,
    last: Option<usize>,
) -> Result<()> {
    let config = helpers::load_config()?;
    let store = helpers::open_store(&config)?;

    let filter = LogFilter {
        source: source.map(String::from),
        primary_key: key.map(String::from),
        log_type: log_type.map(helpers::parse_log_type).transpose()?,
        username: user.map(String::from),
        since: since.map(helpers::parse_since).transpose()?,
    };

    let entries = store.query(&filter)?;

    if entries.is_empty() {
        output::header("auditrail log");
        output::warning("No audit entries found");
        if source.is_some() || key.is_some() || log_type.is_some() || user.is_some() || since.is_some()
        {
            println!("  Try removing filters to see all entries.");
        }
        return Ok(());
    }

    // Apply --last N (take from the end)
    let display: Vec<&AuditLog> = match last {
        Some(n) => entries
            .iter()
            .rev()
            .take(n)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect(),
        None => entries.iter().collect(),
    };

    output::header(&format!("auditrail log ({} entries)", display.len()));
    println!();

    for entry in &display {
        print_entry(entry, &config.capture.user_separator, &config.links);
    }

    Ok(())
}

/// Print a single audit entry as a formatted row, with optional link
/// lines when URL patterns are configured.
fn print_entry(entry: &AuditLog, user_separator: &str, links: &LinksSection) {
    let date = entry.created.format("%Y-%m-%d %H:%M:%S");
    let log_type = format_log_type(entry.log_type);

    let target = match &entry.primary_key {
        Some(pk) => format!("{}/{}", entry.source, pk),
        None => entry.source.clone(),
    };

    let label = entry
        .display_value
        .as_deref()
        .map(|d| format!("\"{d}\""))
        .unwrap_or_default();

    let who = entry
        .username
        .as_deref()
        .map(|raw| {
            let (id, display) = split_username(raw, user_separator);
            display.map(String::from).unwrap_or_else(|| id.to_string())
        })
        .unwrap_or_else(|| "—".to_string());

    println!(
        "  {:>4} {} {} {:<8} {:<24} {} {}",
        format!("#{}", entry.id).dimmed(),
        date.to_string().dimmed(),
        "│".dimmed(),
        log_type,
        target,
        label,
        who.dimmed(),
    );

    if let Some(pattern) = &links.record
        && let Some(pk) = &entry.primary_key
    {
        let url = pattern
            .replace("{source}", &entry.source)
            .replace("{primary_key}", pk)
            .replace("{display}", entry.display_value.as_deref().unwrap_or(""));
        println!("       {}", url.underline().dimmed());
    }

    if let Some(pattern) = &links.user
        && let Some(raw) = &entry.username
    {
        let (id, _) = split_username(raw, user_separator);
        let url = pattern.replace("{user}", id);
        println!("       {}", url.underline().dimmed());
    }
}

/// Format an entry type as a colored string.
fn format_log_type(log_type: AuditLogType) -> String {
    match log_type {
        AuditLogType::Create => "create".green().to_string(),
        AuditLogType::Update => "update".blue().to_string(),
        AuditLogType::Delete => "delete".red().to_string(),
        AuditLogType::Revert => "revert".yellow().to_string(),
    }
}
