use std::path::PathBuf;

/// All domain errors for Auditrail.
///
/// Expected revert/restore failures (validation rejection, pre-existing
/// record, nothing to restore) are NOT errors; they are surfaced as
/// `RevertOutcome::Blocked` values. Only genuine caller bugs and
/// infrastructure problems land here.
#[derive(Debug, thiserror::Error)]
pub enum AuditrailError {
    #[error(
        "Record not found: {source_name}/{primary_key}\n\n  \
         A revert targets a live record, and no record with this key exists.\n  \
         If the record was deleted, use 'auditrail restore {source_name} {primary_key}' instead."
    )]
    RecordNotFound {
        source_name: String,
        primary_key: String,
    },

    #[error(
        "Audit entry #{id} not found\n\n  \
         Run 'auditrail log' to browse available entries."
    )]
    EntryNotFound { id: u64 },

    #[error("Audit store error: {detail}")]
    StoreError { detail: String },

    #[error("Validation failed: {detail}")]
    ValidationFailed { detail: String },

    #[error("Invalid configuration: {detail}")]
    InvalidConfig { detail: String },

    #[error(
        "Unknown monitor rule '{tag}'\n\n  \
         Supported rules: mass_delete, unusual_time.\n  \
         Check the [[monitor.rules]] entries in .auditrail/config.toml."
    )]
    UnknownRule { tag: String },

    #[error(
        "Unknown alert channel '{tag}'\n\n  \
         Supported channels: console, file, webhook.\n  \
         Check the [[monitor.channels]] entries in .auditrail/config.toml."
    )]
    UnknownChannel { tag: String },

    #[error("Alert channel '{channel}' failed: {detail}")]
    ChannelError { channel: String, detail: String },

    #[error(
        "Store not found at {}\n\n  \
         Run 'auditrail init' to create a store in the current directory,\n  \
         or pass --dir to point at an existing one.",
        path.display()
    )]
    NotInitialized { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AuditrailError>;
