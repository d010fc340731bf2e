pub mod console;
pub mod file;
pub mod webhook;

use std::path::Path;

use serde_json::Value;

use crate::adapters::channels::console::ConsoleChannel;
use crate::adapters::channels::file::FileChannel;
use crate::adapters::channels::webhook::WebhookChannel;
use crate::core::errors::{AuditrailError, Result};
use crate::core::models::audit_log::FieldMap;
use crate::core::traits::channel::AlertChannel;

/// Closed registry of channel tags, mirror of the rule registry. The
/// `file` channel defaults to `alerts.jsonl` inside the store directory.
pub fn build_channel(
    tag: &str,
    settings: &FieldMap,
    store_dir: &Path,
) -> Result<Box<dyn AlertChannel>> {
    match tag {
        "console" => Ok(Box::new(ConsoleChannel)),
        "file" => {
            let path = match settings.get("path").and_then(Value::as_str) {
                Some(path) => Path::new(path).to_path_buf(),
                None => store_dir.join("alerts.jsonl"),
            };
            Ok(Box::new(FileChannel::new(path)))
        }
        "webhook" => {
            let url = settings
                .get("url")
                .and_then(Value::as_str)
                .ok_or_else(|| AuditrailError::InvalidConfig {
                    detail: "webhook channel requires a 'url' setting".to_string(),
                })?;
            let max_retries = settings
                .get("max_retries")
                .and_then(Value::as_u64)
                .unwrap_or(3) as u32;
            let timeout_secs = settings
                .get("timeout_secs")
                .and_then(Value::as_u64)
                .unwrap_or(10);
            Ok(Box::new(WebhookChannel::new(url, max_retries, timeout_secs)?))
        }
        other => Err(AuditrailError::UnknownChannel {
            tag: other.to_string(),
        }),
    }
}
