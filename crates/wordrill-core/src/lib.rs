//! wordrill-core - Spaced-repetition review for dictation practice
//!
//! This crate provides the review engine used by the wordrill CLI:
//!
//! - **scheduling**: Ebbinghaus intervals, memory levels and commit rules
//! - **registry**: Review pool fed by failed dictations
//! - **session**: Session assembly and completion
//! - **analysis**: Error-driven performance analysis
//! - **stats**: Dashboard statistics and auto-refresh
//! - **db**: SQLite persistence behind the `store` traits
//! - **service**: Facade wiring everything together

pub mod analysis;
pub mod config;
pub mod db;
pub mod error;
pub mod registry;
pub mod scheduling;
pub mod service;
pub mod session;
pub mod stats;
pub mod store;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use service::ReviewService;
