//! Review sessions.
//!
//! ```text
//!  review pool ──▶ SessionBuilder ──▶ ReviewSession (Open)
//!  error log  ──┘                          │
//!                                          ▼ results
//!                               SessionLifecycle::complete
//!                                          │
//!                                          ▼
//!                          ReviewSession (Completed) + updated states
//! ```

pub mod builder;
pub mod lifecycle;

pub use builder::{SessionBuilder, recommended_settings};
pub use lifecycle::{
    CompletedSession, LevelChange, ReviewProgress, ReviewSessionSummary, SessionLifecycle,
};
