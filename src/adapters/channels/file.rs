use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use crate::core::errors::{AuditrailError, Result};
use crate::core::models::alert::Alert;
use crate::core::traits::channel::AlertChannel;

/// Appends alerts to a JSON-lines file, one object per alert.
#[derive(Debug)]
pub struct FileChannel {
    path: PathBuf,
}

impl FileChannel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AlertChannel for FileChannel {
    fn name(&self) -> &str {
        "file"
    }

    fn send(&self, alert: &Alert) -> Result<()> {
        let json = serde_json::to_string(alert).map_err(|err| AuditrailError::ChannelError {
            channel: self.name().to_string(),
            detail: format!("failed to encode alert: {err}"),
        })?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|err| AuditrailError::ChannelError {
                channel: self.name().to_string(),
                detail: format!("cannot open {}: {err}", self.path.display()),
            })?;

        writeln!(file, "{json}").map_err(|err| AuditrailError::ChannelError {
            channel: self.name().to_string(),
            detail: format!("cannot write {}: {err}", self.path.display()),
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::alert::{AlertEntrySummary, Severity};
    use tempfile::TempDir;

    fn alert(message: &str) -> Alert {
        Alert {
            rule_name: "unusual_time".into(),
            severity: Severity::Medium,
            message: message.into(),
            entry: AlertEntrySummary {
                id: 7,
                log_type: "update".into(),
                source: "articles".into(),
                primary_key: Some("3".into()),
                transaction: "tx".into(),
                created: "2026-01-01T03:00:00+00:00".into(),
            },
            context: serde_json::Map::new(),
        }
    }

    #[test]
    fn alerts_append_as_json_lines() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("alerts.jsonl");
        let channel = FileChannel::new(&path);

        channel.send(&alert("first")).unwrap();
        channel.send(&alert("second")).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);

        let decoded: Alert = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(decoded.message, "first");
        assert_eq!(decoded.entry.id, 7);
    }

    #[test]
    fn unwritable_path_is_a_channel_error() {
        let channel = FileChannel::new("/no/such/dir/alerts.jsonl");
        let err = channel.send(&alert("x")).unwrap_err();
        assert!(matches!(err, AuditrailError::ChannelError { .. }));
    }
}
