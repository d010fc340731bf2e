use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::adapters::store::memory::SourceSchema;
use crate::core::errors::{AuditrailError, Result};
use crate::core::models::audit_log::FieldMap;
use crate::core::services::capture::CaptureConfig;

/// Top-level Auditrail configuration read from `.auditrail/config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub auditrail: AuditrailSection,
    #[serde(default)]
    pub capture: CaptureSection,
    #[serde(default)]
    pub diff: DiffSection,
    #[serde(default)]
    pub retention: RetentionSection,
    #[serde(default)]
    pub links: LinksSection,
    /// Per-source schemas driving validation and display values.
    #[serde(default)]
    pub sources: HashMap<String, SourceSchema>,
    #[serde(default)]
    pub monitor: MonitorSection,
}

impl AppConfig {
    /// Load the configuration from `.auditrail/config.toml`.
    pub fn load(auditrail_dir: &Path) -> Result<Self> {
        let config_path = auditrail_dir.join("config.toml");
        if !config_path.exists() {
            return Err(AuditrailError::InvalidConfig {
                detail: "config.toml not found. Run 'auditrail init' first.".into(),
            });
        }
        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content).map_err(|e| AuditrailError::InvalidConfig {
            detail: format!("Failed to parse config.toml: {e}"),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (source, days) in &self.retention.sources {
            if *days == 0 {
                return Err(AuditrailError::InvalidConfig {
                    detail: format!(
                        "retention for source '{source}' is 0 days; that would delete everything"
                    ),
                });
            }
        }
        if self.retention.default_days == 0 {
            return Err(AuditrailError::InvalidConfig {
                detail: "default retention is 0 days; that would delete everything".into(),
            });
        }
        Ok(())
    }

    /// Retention period for a source, falling back to the default.
    pub fn retention_days(&self, source: &str) -> u64 {
        self.retention
            .sources
            .get(source)
            .copied()
            .unwrap_or(self.retention.default_days)
    }

    /// Capture settings plus the per-source display fields declared in
    /// `[sources.*]`.
    pub fn capture_config(&self) -> CaptureConfig {
        let display_fields = self
            .sources
            .iter()
            .filter_map(|(source, schema)| {
                schema
                    .display_field
                    .clone()
                    .map(|field| (source.clone(), field))
            })
            .collect();

        CaptureConfig {
            ignored_fields: self.capture.ignored_fields.clone(),
            user_separator: self.capture.user_separator.clone(),
            display_fields,
        }
    }
}

/// The `[auditrail]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditrailSection {
    pub version: String,
}

/// The `[capture]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CaptureSection {
    #[serde(default)]
    pub ignored_fields: Vec<String>,
    #[serde(default = "default_user_separator")]
    pub user_separator: String,
}

impl Default for CaptureSection {
    fn default() -> Self {
        Self {
            ignored_fields: Vec::new(),
            user_separator: default_user_separator(),
        }
    }
}

fn default_user_separator() -> String {
    ":".to_string()
}

/// The `[diff]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DiffSection {
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,
}

impl Default for DiffSection {
    fn default() -> Self {
        Self {
            context_lines: default_context_lines(),
        }
    }
}

fn default_context_lines() -> usize {
    3
}

/// The `[retention]` section: a default plus per-source overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct RetentionSection {
    #[serde(default = "default_retention_days")]
    pub default_days: u64,
    #[serde(default)]
    pub sources: HashMap<String, u64>,
}

impl Default for RetentionSection {
    fn default() -> Self {
        Self {
            default_days: default_retention_days(),
            sources: HashMap::new(),
        }
    }
}

fn default_retention_days() -> u64 {
    90
}

/// The `[links]` section: URL patterns shown next to log entries.
///
/// Placeholders: `{user}` in the user pattern; `{source}`, `{primary_key}`
/// and `{display}` in the record pattern.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinksSection {
    pub user: Option<String>,
    pub record: Option<String>,
}

/// The `[monitor]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonitorSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub rules: Vec<MonitorEntry>,
    #[serde(default)]
    pub channels: Vec<MonitorEntry>,
}

/// One `[[monitor.rules]]` or `[[monitor.channels]]` entry: a registry tag
/// plus free-form settings handed to the matching constructor.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorEntry {
    #[serde(rename = "type")]
    pub tag: String,
    #[serde(flatten)]
    pub settings: toml::Table,
}

impl MonitorEntry {
    /// Settings as a JSON map, the form the registries consume.
    pub fn settings_map(&self) -> FieldMap {
        match serde_json::to_value(&self.settings) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => FieldMap::new(),
        }
    }
}
