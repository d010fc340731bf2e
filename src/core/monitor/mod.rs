pub mod rules;

use crate::core::models::alert::Alert;
use crate::core::models::audit_log::AuditLog;
use crate::core::monitor::rules::AlertRule;
use crate::core::traits::audit_store::AuditLogStore;
use crate::core::traits::channel::AlertChannel;

/// Outcome of one monitor pass: the alerts that were raised plus any
/// rule or channel failures, reported as plain text for the caller to
/// surface. Failures never abort the pass.
#[derive(Debug, Default)]
pub struct MonitorReport {
    pub alerts: Vec<Alert>,
    pub failures: Vec<String>,
}

/// Runs every configured rule against a freshly appended entry and
/// fans raised alerts out to every configured channel.
pub struct AuditMonitor {
    rules: Vec<Box<dyn AlertRule>>,
    channels: Vec<Box<dyn AlertChannel>>,
}

impl AuditMonitor {
    pub fn new(rules: Vec<Box<dyn AlertRule>>, channels: Vec<Box<dyn AlertChannel>>) -> Self {
        Self { rules, channels }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate all rules against `entry`. A failing rule is recorded and
    /// skipped; a failing channel is recorded and the remaining channels
    /// still receive the alert.
    pub fn inspect(&self, entry: &AuditLog, store: &dyn AuditLogStore) -> MonitorReport {
        let mut report = MonitorReport::default();

        for rule in &self.rules {
            match rule.evaluate(entry, store) {
                Ok(Some(alert)) => {
                    self.dispatch(&alert, &mut report.failures);
                    report.alerts.push(alert);
                }
                Ok(None) => {}
                Err(err) => {
                    report
                        .failures
                        .push(format!("rule '{}' failed: {err}", rule.name()));
                }
            }
        }

        report
    }

    fn dispatch(&self, alert: &Alert, failures: &mut Vec<String>) {
        for channel in &self.channels {
            if let Err(err) = channel.send(alert) {
                failures.push(format!("channel '{}' failed: {err}", channel.name()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::store::memory::MemoryStore;
    use crate::core::errors::{AuditrailError, Result};
    use crate::core::models::alert::{AlertEntrySummary, Severity};
    use crate::core::models::audit_log::{AuditLogType, NewAuditLog};
    use std::sync::Mutex;

    #[derive(Debug)]
    struct AlwaysFires;

    impl AlertRule for AlwaysFires {
        fn name(&self) -> &str {
            "always_fires"
        }

        fn evaluate(
            &self,
            entry: &AuditLog,
            _store: &dyn AuditLogStore,
        ) -> Result<Option<Alert>> {
            Ok(Some(Alert {
                rule_name: self.name().to_string(),
                severity: Severity::Low,
                message: "fired".to_string(),
                entry: AlertEntrySummary::from_entry(entry),
                context: serde_json::Map::new(),
            }))
        }
    }

    #[derive(Debug)]
    struct AlwaysErrs;

    impl AlertRule for AlwaysErrs {
        fn name(&self) -> &str {
            "always_errs"
        }

        fn evaluate(
            &self,
            _entry: &AuditLog,
            _store: &dyn AuditLogStore,
        ) -> Result<Option<Alert>> {
            Err(AuditrailError::StoreError {
                detail: "boom".to_string(),
            })
        }
    }

    #[derive(Debug)]
    struct Recorder {
        sent: Mutex<Vec<String>>,
        fail: bool,
    }

    impl Recorder {
        fn new(fail: bool) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    impl AlertChannel for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn send(&self, alert: &Alert) -> Result<()> {
            if self.fail {
                return Err(AuditrailError::ChannelError {
                    channel: self.name().to_string(),
                    detail: "unreachable".to_string(),
                });
            }
            self.sent
                .lock()
                .expect("recorder mutex")
                .push(alert.rule_name.clone());
            Ok(())
        }
    }

    fn entry(store: &MemoryStore) -> AuditLog {
        let id = store
            .append(NewAuditLog {
                transaction: "tx".into(),
                log_type: AuditLogType::Create,
                source: "articles".into(),
                parent_source: None,
                primary_key: Some("1".into()),
                display_value: None,
                username: None,
                original: None,
                changed: Some("{}".into()),
                meta: None,
            })
            .unwrap();
        store.get_entry(id).unwrap().unwrap()
    }

    #[test]
    fn alerts_reach_every_channel() {
        let store = MemoryStore::new();
        let entry = entry(&store);

        let monitor = AuditMonitor::new(
            vec![Box::new(AlwaysFires)],
            vec![Box::new(Recorder::new(false)), Box::new(Recorder::new(false))],
        );

        let report = monitor.inspect(&entry, &store);
        assert_eq!(report.alerts.len(), 1);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn failing_rule_is_reported_not_fatal() {
        let store = MemoryStore::new();
        let entry = entry(&store);

        let monitor = AuditMonitor::new(
            vec![Box::new(AlwaysErrs), Box::new(AlwaysFires)],
            vec![Box::new(Recorder::new(false))],
        );

        let report = monitor.inspect(&entry, &store);
        assert_eq!(report.alerts.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].contains("always_errs"));
    }

    #[test]
    fn failing_channel_does_not_block_others() {
        let store = MemoryStore::new();
        let entry = entry(&store);

        let monitor = AuditMonitor::new(
            vec![Box::new(AlwaysFires)],
            vec![Box::new(Recorder::new(true)), Box::new(Recorder::new(false))],
        );

        let report = monitor.inspect(&entry, &store);
        assert_eq!(report.alerts.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].contains("recorder"));
    }

    #[test]
    fn empty_monitor_raises_nothing() {
        let store = MemoryStore::new();
        let entry = entry(&store);

        let monitor = AuditMonitor::new(Vec::new(), Vec::new());
        assert!(monitor.is_empty());

        let report = monitor.inspect(&entry, &store);
        assert!(report.alerts.is_empty());
        assert!(report.failures.is_empty());
    }
}
