//! Named scheduling strategies.
//!
//! Ranking and commit rules differ by call site, so each formula is its own
//! strategy instead of a flag on one function.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::engine;
use crate::error::{Error, Result};
use crate::types::{MemoryLevel, MemoryState, clamp_difficulty};

/// Ranks memory states for a review session. Higher is more urgent.
pub trait PriorityPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    fn priority(&self, state: &MemoryState, now: DateTime<Utc>) -> f64;
}

/// Applies one review outcome to a memory state.
pub trait CommitPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns the updated state; the input is left untouched.
    fn commit(&self, state: &MemoryState, is_correct: bool, now: DateTime<Utc>) -> MemoryState;
}

// ─────────────────────────────────────────────────────────────────────────────
// Priority Policies
// ─────────────────────────────────────────────────────────────────────────────

/// Engine urgency: overdue days weigh ten points each.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrgencyScoring;

impl PriorityPolicy for UrgencyScoring {
    fn name(&self) -> &'static str {
        "urgency"
    }

    fn priority(&self, state: &MemoryState, now: DateTime<Utc>) -> f64 {
        engine::review_priority(state, now)
    }
}

/// Session-building rank: weak levels first, then errors, difficulty and
/// lateness.
///
/// `(8 - level) * 10 + errors * 5 + difficulty + days_overdue * 2`
#[derive(Debug, Clone, Copy, Default)]
pub struct DueDateScoring;

impl PriorityPolicy for DueDateScoring {
    fn name(&self) -> &'static str {
        "due_date"
    }

    fn priority(&self, state: &MemoryState, now: DateTime<Utc>) -> f64 {
        let days_overdue = state.days_overdue(now).max(0.0);
        (8.0 - state.memory_level.get() as f64) * 10.0
            + state.error_count as f64 * 5.0
            + state.difficulty_score as f64
            + days_overdue * 2.0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commit Policies
// ─────────────────────────────────────────────────────────────────────────────

/// Post-session rule: success climbs one level, failure resets to level 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostSessionCommit;

impl CommitPolicy for PostSessionCommit {
    fn name(&self) -> &'static str {
        "post_session"
    }

    fn commit(&self, state: &MemoryState, is_correct: bool, now: DateTime<Utc>) -> MemoryState {
        let level = if is_correct {
            state.memory_level.raise(1)
        } else {
            MemoryLevel::MIN
        };
        apply_outcome(state, level, is_correct, now)
    }
}

/// Engine rule: streak bonuses on success, graded penalties on failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreakAwareCommit;

impl CommitPolicy for StreakAwareCommit {
    fn name(&self) -> &'static str {
        "streak_aware"
    }

    fn commit(&self, state: &MemoryState, is_correct: bool, now: DateTime<Utc>) -> MemoryState {
        let error_count = if is_correct {
            state.error_count
        } else {
            state.error_count.saturating_add(1)
        };
        let level = engine::next_memory_level(
            state.memory_level,
            is_correct,
            error_count,
            state.success_streak,
        );
        apply_outcome(state, level, is_correct, now)
    }
}

/// Counters shared by every commit rule. Errors decrement on success and never
/// go below zero.
fn apply_outcome(
    state: &MemoryState,
    level: MemoryLevel,
    is_correct: bool,
    now: DateTime<Utc>,
) -> MemoryState {
    let mut next = state.clone();
    next.memory_level = level;

    if is_correct {
        next.error_count = state.error_count.saturating_sub(1);
        next.success_streak = state.success_streak.saturating_add(1);
        next.difficulty_score = clamp_difficulty(state.difficulty_score as i64 - 1);
    } else {
        next.error_count = state.error_count.saturating_add(1);
        next.success_streak = 0;
        next.difficulty_score = clamp_difficulty(state.difficulty_score as i64 + 1);
    }

    next.last_review_date = now;
    next.next_review_date = now + Duration::days(engine::interval_days(level));
    next.updated_at = now;
    next
}

/// Commit rule for a settings `algorithm` or config `commit_rule` name.
pub fn commit_policy_for(name: &str) -> Result<Arc<dyn CommitPolicy>> {
    match name {
        "ebbinghaus" | "post_session" => Ok(Arc::new(PostSessionCommit)),
        "streak_aware" | "adaptive" => Ok(Arc::new(StreakAwareCommit)),
        other => Err(Error::validation(format!("unknown commit rule: {}", other))),
    }
}
