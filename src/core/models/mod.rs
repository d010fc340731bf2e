pub mod alert;
pub mod audit_log;
pub mod record;
