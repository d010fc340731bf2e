pub mod audit_store;
pub mod channel;
pub mod record_store;
