use crate::core::errors::Result;
use crate::core::models::alert::Alert;

/// Port for alert delivery. A failing channel never aborts capture; the
/// monitor reports the failure and moves on.
pub trait AlertChannel: Send + Sync + std::fmt::Debug {
    /// Stable tag used in configuration and failure reports.
    fn name(&self) -> &str;

    fn send(&self, alert: &Alert) -> Result<()>;
}
