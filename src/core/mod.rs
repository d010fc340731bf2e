pub mod errors;
pub mod models;
pub mod monitor;
pub mod services;
pub mod traits;
