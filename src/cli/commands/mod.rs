pub mod cleanup;
pub mod diff;
pub mod helpers;
pub mod init;
pub mod log;
pub mod record;
pub mod restore;
pub mod revert;
pub mod show;
