pub mod capture;
pub mod diff_engine;
pub mod reconstructor;
pub mod revert_service;
