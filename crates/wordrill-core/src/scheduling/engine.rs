//! Ebbinghaus interval math.
//!
//! Every function here is pure; callers pass `now` explicitly.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::types::{DAY_MS, MemoryLevel, MemoryState, clamp_difficulty};

/// Review interval in days, indexed by memory level.
///
/// Levels 6 and 7 share the 30 day maintenance interval.
pub const EBBINGHAUS_INTERVALS: [i64; 8] = [1, 2, 4, 7, 15, 30, 30, 30];

/// Retention strength in percent, indexed by memory level.
pub const MEMORY_STRENGTH: [u8; 8] = [0, 14, 29, 43, 57, 71, 86, 100];

/// Level from which an item counts as mastered for efficiency reports.
pub const MASTERED_LEVEL: u8 = 6;

pub fn interval_days(level: MemoryLevel) -> i64 {
    EBBINGHAUS_INTERVALS[level.index()]
}

pub fn memory_strength(level: MemoryLevel) -> u8 {
    MEMORY_STRENGTH[level.index()]
}

pub fn is_due(state: &MemoryState, now: DateTime<Utc>) -> bool {
    state.is_due(now)
}

/// Date of the next review after answering.
///
/// The interval comes from the level one step up on success, one step down
/// on failure.
pub fn next_review_date(state: &MemoryState, is_correct: bool, now: DateTime<Utc>) -> DateTime<Utc> {
    let target = if is_correct {
        state.memory_level.raise(1)
    } else {
        state.memory_level.lower(1)
    };
    now + Duration::days(interval_days(target).max(1))
}

/// Level after answering.
///
/// `success_streak` is the streak before this answer; `error_count` includes
/// this answer when it is a failure.
pub fn next_memory_level(
    level: MemoryLevel,
    is_correct: bool,
    error_count: u32,
    success_streak: u32,
) -> MemoryLevel {
    if is_correct {
        // The >=3 streak band subsumes the >=5 band, which only ever adds the base step.
        let step = if success_streak >= 3 && level.get() < 6 { 2 } else { 1 };
        level.raise(step)
    } else {
        let step = if error_count >= 5 {
            3
        } else if error_count >= 3 && level.get() > 2 {
            2
        } else {
            1
        };
        level.lower(step)
    }
}

/// Difficulty in `1..=10` from error history and recent accuracy.
pub fn difficulty_score(
    error_count: u32,
    _success_streak: u32,
    total_reviews: u32,
    recent_accuracy: f64,
) -> u8 {
    let mut score: i64 = 5;

    score += match error_count {
        0 => -2,
        1 => -1,
        2 => 0,
        3 | 4 => 1,
        _ => 2,
    };

    if recent_accuracy >= 0.9 {
        score -= 1;
    } else if recent_accuracy < 0.5 {
        score += 1;
    }

    if total_reviews < 3 {
        score = score.min(7);
    } else if total_reviews > 20 && recent_accuracy > 0.8 {
        score -= 2;
    }

    clamp_difficulty(score)
}

/// Urgency ranking: overdue days dominate, strong items that are not yet
/// overdue are pushed back.
pub fn review_priority(state: &MemoryState, now: DateTime<Utc>) -> f64 {
    let overdue_days = state.days_overdue(now);
    let mut priority = (overdue_days.floor() * 10.0).max(0.0)
        + state.difficulty_score as f64
        + (state.error_count as f64 * 2.0).min(20.0);

    if state.memory_level.get() >= 5 && overdue_days <= 0.0 {
        priority -= 5.0;
    }
    priority
}

/// Next review estimate at the current level, jittered by up to 10% either
/// way so items added together do not all come due on the same day.
pub fn estimated_next_review_date<R: Rng + ?Sized>(
    state: &MemoryState,
    now: DateTime<Utc>,
    rng: &mut R,
) -> DateTime<Utc> {
    let jitter: f64 = rng.gen_range(-0.1..=0.1);
    let days = interval_days(state.memory_level) as f64 * (1.0 + jitter);
    now + Duration::milliseconds((days * DAY_MS as f64).round() as i64)
}

/// One predicted review in a [`predict_schedule`] simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledReview {
    pub date: DateTime<Utc>,
    /// Level after the review.
    pub memory_level: MemoryLevel,
    /// Days until the review after this one.
    pub interval_days: i64,
}

/// Longest horizon [`predict_schedule`] simulates.
pub const MAX_PREDICTION_DAYS: u32 = 3650;

/// Simulate perfect recall for the next `days` days, capped at
/// [`MAX_PREDICTION_DAYS`].
pub fn predict_schedule(state: &MemoryState, days: u32, now: DateTime<Utc>) -> Vec<ScheduledReview> {
    let days = days.min(MAX_PREDICTION_DAYS);
    let Some(horizon) = now.checked_add_signed(Duration::days(i64::from(days))) else {
        return Vec::new();
    };
    let mut cursor = state.next_review_date.max(now);
    let mut level = state.memory_level;
    let mut streak = state.success_streak;
    let mut schedule = Vec::new();

    while cursor <= horizon {
        level = next_memory_level(level, true, state.error_count, streak);
        streak = streak.saturating_add(1);
        let interval = interval_days(level);
        schedule.push(ScheduledReview {
            date: cursor,
            memory_level: level,
            interval_days: interval,
        });
        match cursor.checked_add_signed(Duration::days(interval)) {
            Some(next) => cursor = next,
            None => break,
        }
    }
    schedule
}

/// Aggregate learning metrics over a set of memory states.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningEfficiency {
    pub total: usize,
    pub average_level: f64,
    pub average_difficulty: f64,
    pub mastered: usize,
    pub due: usize,
}

pub fn learning_efficiency(states: &[MemoryState], now: DateTime<Utc>) -> LearningEfficiency {
    if states.is_empty() {
        return LearningEfficiency::default();
    }

    let total = states.len();
    let level_sum: u32 = states.iter().map(|s| s.memory_level.get() as u32).sum();
    let difficulty_sum: u32 = states.iter().map(|s| s.difficulty_score as u32).sum();

    LearningEfficiency {
        total,
        average_level: round1(level_sum as f64 / total as f64),
        average_difficulty: round1(difficulty_sum as f64 / total as f64),
        mastered: states
            .iter()
            .filter(|s| s.memory_level.get() >= MASTERED_LEVEL)
            .count(),
        due: states.iter().filter(|s| s.is_due(now)).count(),
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SubjectRef;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn state(level: i64, error_count: u32, streak: u32) -> MemoryState {
        let now = Utc::now();
        MemoryState {
            memory_level: MemoryLevel::new(level),
            error_count,
            success_streak: streak,
            ..MemoryState::initial(SubjectRef::ReviewPool("rv".into()), now)
        }
    }

    #[test]
    fn test_interval_plateau() {
        assert_eq!(interval_days(MemoryLevel::new(0)), 1);
        assert_eq!(interval_days(MemoryLevel::new(3)), 7);
        assert_eq!(interval_days(MemoryLevel::new(6)), 30);
        assert_eq!(interval_days(MemoryLevel::new(7)), 30);
    }

    #[test]
    fn test_next_review_date() {
        let now = Utc::now();
        let s = state(2, 0, 0);
        assert_eq!(next_review_date(&s, true, now), now + Duration::days(7));
        assert_eq!(next_review_date(&s, false, now), now + Duration::days(2));

        let s = state(0, 1, 0);
        assert_eq!(next_review_date(&s, false, now), now + Duration::days(1));
    }

    #[test]
    fn test_streak_bonus_dominates() {
        assert_eq!(next_memory_level(MemoryLevel::new(3), true, 0, 4).get(), 5);
        assert_eq!(next_memory_level(MemoryLevel::new(3), true, 0, 2).get(), 4);
        assert_eq!(next_memory_level(MemoryLevel::new(6), true, 0, 9).get(), 7);
        assert_eq!(next_memory_level(MemoryLevel::new(7), true, 0, 9).get(), 7);
    }

    #[test]
    fn test_failure_penalties() {
        // Fifth error drops three levels.
        assert_eq!(next_memory_level(MemoryLevel::new(5), false, 5, 0).get(), 2);
        assert_eq!(next_memory_level(MemoryLevel::new(5), false, 3, 0).get(), 3);
        assert_eq!(next_memory_level(MemoryLevel::new(2), false, 3, 0).get(), 1);
        assert_eq!(next_memory_level(MemoryLevel::new(1), false, 9, 0).get(), 0);
    }

    #[test]
    fn test_difficulty_score_bands() {
        assert_eq!(difficulty_score(0, 0, 10, 0.7), 3);
        assert_eq!(difficulty_score(2, 0, 10, 0.7), 5);
        assert_eq!(difficulty_score(4, 0, 10, 0.7), 6);
        assert_eq!(difficulty_score(8, 0, 10, 0.3), 8);
        // Few reviews cap the score.
        assert_eq!(difficulty_score(8, 0, 1, 0.1), 7);
        // Long, accurate history lowers it.
        assert_eq!(difficulty_score(0, 0, 30, 0.95), 1);
    }

    #[test]
    fn test_review_priority() {
        let now = Utc::now();
        let mut s = state(2, 3, 0);
        s.difficulty_score = 6;
        s.next_review_date = now - Duration::hours(60);
        // floor(2.5) * 10 + 6 + 6
        assert_eq!(review_priority(&s, now), 32.0);

        let mut strong = state(5, 20, 0);
        strong.next_review_date = now + Duration::days(3);
        // 0 + 5 + 20 (capped) - 5
        assert_eq!(review_priority(&strong, now), 20.0);
    }

    #[test]
    fn test_estimated_date_jitter() {
        let now = Utc::now();
        let s = state(4, 0, 0);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let date = estimated_next_review_date(&s, now, &mut rng);
            let days = (date - now).num_milliseconds() as f64 / DAY_MS as f64;
            assert!((13.5 - 1e-6..=16.5 + 1e-6).contains(&days));
        }
    }

    #[test]
    fn test_predict_schedule() {
        let now = Utc::now();
        let mut s = state(0, 1, 0);
        s.next_review_date = now;
        let schedule = predict_schedule(&s, 30, now);

        assert_eq!(schedule[0].date, now);
        assert_eq!(schedule[0].memory_level.get(), 1);
        assert!(schedule.windows(2).all(|w| w[0].date < w[1].date));
        assert!(schedule.iter().all(|r| r.date <= now + Duration::days(30)));
        assert!(predict_schedule(&s, 0, now).len() == 1);
    }

    #[test]
    fn test_predict_schedule_caps_horizon() {
        let now = Utc::now();
        let mut s = state(0, 1, 0);
        s.next_review_date = now;

        let schedule = predict_schedule(&s, u32::MAX, now);
        assert_eq!(schedule, predict_schedule(&s, MAX_PREDICTION_DAYS, now));
        let horizon = now + Duration::days(i64::from(MAX_PREDICTION_DAYS));
        assert!(schedule.iter().all(|r| r.date <= horizon));

        s.next_review_date = DateTime::<Utc>::MAX_UTC;
        assert!(predict_schedule(&s, 30, now).is_empty());
    }

    #[test]
    fn test_learning_efficiency() {
        let now = Utc::now();
        assert_eq!(learning_efficiency(&[], now), LearningEfficiency::default());

        let mut mastered = state(6, 0, 0);
        mastered.difficulty_score = 2;
        mastered.next_review_date = now + Duration::days(10);
        let mut due = state(1, 2, 0);
        due.difficulty_score = 7;
        due.next_review_date = now - Duration::days(1);

        let report = learning_efficiency(&[mastered, due], now);
        assert_eq!(report.total, 2);
        assert_eq!(report.average_level, 3.5);
        assert_eq!(report.average_difficulty, 4.5);
        assert_eq!(report.mastered, 1);
        assert_eq!(report.due, 1);
    }

    #[test]
    fn test_memory_strength() {
        assert_eq!(memory_strength(MemoryLevel::MIN), 0);
        assert_eq!(memory_strength(MemoryLevel::MAX), 100);
    }
}
