use serde::{Deserialize, Serialize};

use crate::core::models::audit_log::AuditLog;

/// Severity of a triggered alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// A notification produced by a monitor rule, ready for channel dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub rule_name: String,
    pub severity: Severity,
    pub message: String,
    /// Summary of the audit entry that triggered the rule.
    pub entry: AlertEntrySummary,
    /// Rule-specific context (thresholds, counts, ...).
    pub context: serde_json::Map<String, serde_json::Value>,
}

/// The slice of the triggering audit entry that travels with an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEntrySummary {
    pub id: u64,
    #[serde(rename = "type")]
    pub log_type: String,
    pub source: String,
    pub primary_key: Option<String>,
    pub transaction: String,
    pub created: String,
}

impl AlertEntrySummary {
    pub fn from_entry(entry: &AuditLog) -> Self {
        Self {
            id: entry.id,
            log_type: entry.log_type.as_str().to_string(),
            source: entry.source.clone(),
            primary_key: entry.primary_key.clone(),
            transaction: entry.transaction.clone(),
            created: entry.created.to_rfc3339(),
        }
    }
}
