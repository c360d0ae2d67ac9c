//! Spaced-repetition scheduling.
//!
//! ```text
//! ┌──────────────┐   intervals, levels,   ┌──────────────────────┐
//! │    engine    │ ─────────────────────▶ │        policy        │
//! │ (pure math)  │   difficulty, urgency  │ PriorityPolicy       │
//! └──────────────┘                        │   UrgencyScoring     │
//!                                         │   DueDateScoring     │
//!                                         │ CommitPolicy         │
//!                                         │   PostSessionCommit  │
//!                                         │   StreakAwareCommit  │
//!                                         └──────────────────────┘
//! ```
//!
//! The error-driven ranking lives with the analyzer in [`crate::analysis`].

pub mod engine;
pub mod policy;

pub use engine::{
    EBBINGHAUS_INTERVALS, LearningEfficiency, MEMORY_STRENGTH, ScheduledReview, difficulty_score,
    estimated_next_review_date, interval_days, is_due, learning_efficiency, memory_strength,
    next_memory_level, next_review_date, predict_schedule, review_priority,
};
pub use policy::{
    CommitPolicy, DueDateScoring, PostSessionCommit, PriorityPolicy, StreakAwareCommit,
    UrgencyScoring, commit_policy_for,
};
