use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static AUDITRAIL_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Initialize the global store directory path.
/// If `custom` is provided, uses that path; otherwise defaults to `.auditrail`.
pub fn init(custom: Option<&str>) {
    let dir = custom
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".auditrail"));
    let _ = AUDITRAIL_DIR.set(dir);
}

/// Get the current store directory path.
pub fn auditrail_dir() -> &'static Path {
    AUDITRAIL_DIR
        .get()
        .map(|p| p.as_path())
        .unwrap_or(Path::new(".auditrail"))
}
