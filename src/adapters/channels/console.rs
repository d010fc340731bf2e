use colored::Colorize;

use crate::core::errors::Result;
use crate::core::models::alert::{Alert, Severity};
use crate::core::traits::channel::AlertChannel;

/// Prints alerts to stderr so they stay visible next to command output.
#[derive(Debug)]
pub struct ConsoleChannel;

impl AlertChannel for ConsoleChannel {
    fn name(&self) -> &str {
        "console"
    }

    fn send(&self, alert: &Alert) -> Result<()> {
        let tag = match alert.severity {
            Severity::Critical | Severity::High => "ALERT".red().bold(),
            Severity::Medium => "ALERT".yellow().bold(),
            Severity::Low => "ALERT".cyan(),
        };

        eprintln!(
            "{tag} [{}/{}] {}",
            alert.rule_name,
            alert.severity.as_str(),
            alert.message,
        );
        eprintln!(
            "        entry #{} {} on {}{}",
            alert.entry.id,
            alert.entry.log_type,
            alert.entry.source,
            alert
                .entry
                .primary_key
                .as_deref()
                .map(|pk| format!("/{pk}"))
                .unwrap_or_default(),
        );

        Ok(())
    }
}
