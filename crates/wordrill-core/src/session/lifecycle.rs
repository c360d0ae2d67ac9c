//! Review session lifecycle.
//!
//! A session is `Open` while results come in and `Completed` once accuracy
//! and duration are final. Abandoned sessions simply stay open.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::scheduling::{CommitPolicy, PostSessionCommit, commit_policy_for};
use crate::store::{MemoryStateStore, ReviewSessionStore};
use crate::types::{MemoryLevel, MemoryState, ReviewResult, ReviewSession, SessionStatus, SubjectRef};

/// Outcome of [`SessionLifecycle::complete`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedSession {
    pub session: ReviewSession,
    pub updated_states: Vec<MemoryState>,
}

/// Live progress through an open session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewProgress {
    pub total_items: usize,
    pub answered: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub remaining: usize,
    /// Index of the next unanswered item, if any.
    pub current_index: Option<usize>,
    pub accuracy: f64,
    pub percent_complete: f64,
}

/// Level movement of one subject within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelChange {
    pub subject: SubjectRef,
    pub text: String,
    pub before: MemoryLevel,
    pub after: MemoryLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSessionSummary {
    pub session_id: String,
    pub total_items: usize,
    pub correct: usize,
    pub accuracy: f64,
    pub duration_secs: i64,
    pub level_changes: Vec<LevelChange>,
    /// Subjects reviewed for the first time (level 0 before).
    pub new_items: usize,
    /// Subjects whose level went up.
    pub strengthened_items: usize,
}

pub struct SessionLifecycle {
    states: Arc<dyn MemoryStateStore>,
    sessions: Arc<dyn ReviewSessionStore>,
    default_policy: Arc<dyn CommitPolicy>,
}

impl SessionLifecycle {
    pub fn new(states: Arc<dyn MemoryStateStore>, sessions: Arc<dyn ReviewSessionStore>) -> Self {
        Self {
            states,
            sessions,
            default_policy: Arc::new(PostSessionCommit),
        }
    }

    /// Commit rule used when a session names an unknown algorithm.
    pub fn with_default_policy(mut self, policy: Arc<dyn CommitPolicy>) -> Self {
        self.default_policy = policy;
        self
    }

    fn policy_for(&self, session: &ReviewSession) -> Arc<dyn CommitPolicy> {
        match commit_policy_for(&session.settings.algorithm) {
            Ok(policy) => policy,
            Err(_) => {
                warn!(
                    "Unknown algorithm '{}' in session {}, using {}",
                    session.settings.algorithm,
                    session.id,
                    self.default_policy.name()
                );
                self.default_policy.clone()
            }
        }
    }

    /// Apply one result immediately with the session's commit rule.
    ///
    /// Returns `None` when the subject has no memory state.
    pub fn record_result(
        &self,
        session: &ReviewSession,
        result: &mut ReviewResult,
        now: DateTime<Utc>,
    ) -> Result<Option<MemoryState>> {
        if session.is_completed() {
            return Err(Error::validation(format!(
                "review session {} is already completed",
                session.id
            )));
        }
        result.session_id = session.id.clone();

        let Some(state) = self.states.state_for_subject(&result.subject)? else {
            warn!("No memory state for {}, skipping result", result.subject);
            return Ok(None);
        };

        let updated = self.policy_for(session).commit(&state, result.is_correct, now);
        self.states.update_state(&updated)?;
        result.state_before = Some(state);
        result.state_after = Some(updated.clone());
        Ok(Some(updated))
    }

    /// Apply all results and mark the session completed, atomically.
    pub fn complete(
        &self,
        session_id: &str,
        mut results: Vec<ReviewResult>,
        now: DateTime<Utc>,
    ) -> Result<CompletedSession> {
        let mut session = self
            .sessions
            .get_session(session_id)?
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        if session.is_completed() {
            return Err(Error::validation(format!(
                "review session {} is already completed",
                session_id
            )));
        }

        let policy = self.policy_for(&session);
        let mut latest: HashMap<SubjectRef, MemoryState> = HashMap::new();
        let mut order: Vec<SubjectRef> = Vec::new();

        for result in &mut results {
            result.session_id = session.id.clone();

            let current = match latest.get(&result.subject) {
                Some(state) => Some(state.clone()),
                None => self.states.state_for_subject(&result.subject)?,
            };
            let Some(current) = current else {
                warn!("No memory state for {}, skipping result", result.subject);
                continue;
            };

            let updated = policy.commit(&current, result.is_correct, now);
            result.state_before = Some(current);
            result.state_after = Some(updated.clone());

            if !latest.contains_key(&result.subject) {
                order.push(result.subject.clone());
            }
            latest.insert(result.subject.clone(), updated);
        }

        let updated_states: Vec<MemoryState> =
            order.iter().filter_map(|s| latest.remove(s)).collect();

        let correct = results.iter().filter(|r| r.is_correct).count();
        session.accuracy = Some(ratio(correct, results.len()));
        session.completed_at = Some(now);
        session.duration_secs = Some((now - session.started_at).num_seconds().max(0));
        session.status = SessionStatus::Completed;
        session.results = results;

        self.sessions
            .commit_review_session(&session, &updated_states)?;
        info!(
            "Completed review session {}: {}/{} correct",
            session.id,
            correct,
            session.results.len()
        );

        Ok(CompletedSession {
            session,
            updated_states,
        })
    }

    pub fn progress(&self, session: &ReviewSession, results: &[ReviewResult]) -> ReviewProgress {
        let total_items = session.items.len();
        let answered = results.len();
        let correct = results.iter().filter(|r| r.is_correct).count();
        let remaining = total_items.saturating_sub(answered);

        ReviewProgress {
            total_items,
            answered,
            correct,
            incorrect: answered - correct,
            remaining,
            current_index: (remaining > 0).then_some(answered),
            accuracy: ratio(correct, answered),
            percent_complete: ratio(answered.min(total_items), total_items) * 100.0,
        }
    }

    pub fn summary(&self, session: &ReviewSession) -> ReviewSessionSummary {
        let correct = session.results.iter().filter(|r| r.is_correct).count();

        // First and last snapshot per subject.
        let mut spans: HashMap<&SubjectRef, (&MemoryState, &MemoryState, &str)> = HashMap::new();
        let mut order: Vec<&SubjectRef> = Vec::new();
        for result in &session.results {
            let (Some(before), Some(after)) = (&result.state_before, &result.state_after) else {
                continue;
            };
            match spans.get_mut(&result.subject) {
                Some(span) => span.1 = after,
                None => {
                    order.push(&result.subject);
                    spans.insert(&result.subject, (before, after, result.text.as_str()));
                }
            }
        }

        let level_changes: Vec<LevelChange> = order
            .into_iter()
            .filter_map(|subject| {
                spans.get(subject).map(|(before, after, text)| LevelChange {
                    subject: subject.clone(),
                    text: text.to_string(),
                    before: before.memory_level,
                    after: after.memory_level,
                })
            })
            .collect();

        ReviewSessionSummary {
            session_id: session.id.clone(),
            total_items: session.items.len(),
            correct,
            accuracy: session
                .accuracy
                .unwrap_or_else(|| ratio(correct, session.results.len())),
            duration_secs: session.duration_secs.unwrap_or(0),
            new_items: level_changes
                .iter()
                .filter(|c| c.before == MemoryLevel::MIN)
                .count(),
            strengthened_items: level_changes.iter().filter(|c| c.after > c.before).count(),
            level_changes,
        }
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ErrorAnalyzer;
    use crate::db::Database;
    use crate::registry::ReviewVocabularyRegistry;
    use crate::scheduling::StreakAwareCommit;
    use crate::session::SessionBuilder;
    use crate::testing;
    use crate::types::{AudioSource, ReviewSettings};
    use chrono::Duration;

    struct Fixture {
        db: Arc<Database>,
        builder: SessionBuilder,
        lifecycle: SessionLifecycle,
    }

    fn fixture(texts: &[&str], added: DateTime<Utc>) -> Fixture {
        let db = testing::database();
        let registry = ReviewVocabularyRegistry::new(db.clone(), db.clone(), db.clone());
        for word in testing::words(&db, texts) {
            registry
                .register_failure(&testing::result(&word, false), added)
                .unwrap();
        }
        let analyzer = Arc::new(ErrorAnalyzer::new(db.clone(), db.clone(), db.clone()));
        Fixture {
            builder: SessionBuilder::new(db.clone(), db.clone(), db.clone(), analyzer),
            lifecycle: SessionLifecycle::new(db.clone(), db.clone()),
            db,
        }
    }

    fn answers(session: &ReviewSession, correct: &[bool]) -> Vec<ReviewResult> {
        session
            .items
            .iter()
            .zip(correct)
            .map(|(item, is_correct)| {
                ReviewResult::for_item(&session.id, item, *is_correct, AudioSource::Tts, 1200)
            })
            .collect()
    }

    #[test]
    fn test_complete_accuracy_and_states() {
        let now = testing::now();
        let f = fixture(&["a", "b", "c", "d", "e"], now - Duration::days(2));
        let session = f
            .builder
            .generate(&ReviewSettings::default(), now - Duration::minutes(5))
            .unwrap();
        assert_eq!(session.items.len(), 5);

        let results = answers(&session, &[true, true, false, true, false]);
        let done = f.lifecycle.complete(&session.id, results, now).unwrap();

        assert_eq!(done.session.status, SessionStatus::Completed);
        assert_eq!(done.session.accuracy, Some(0.6));
        assert_eq!(done.session.duration_secs, Some(300));
        assert_eq!(done.session.completed_at, Some(now));
        assert_eq!(done.updated_states.len(), 5);

        for result in &done.session.results {
            let after = result.state_after.as_ref().unwrap();
            let stored = f.db.state_for_subject(&result.subject).unwrap().unwrap();
            assert_eq!(&stored, after);
            if result.is_correct {
                assert_eq!(after.memory_level.get(), 1);
                assert_eq!(after.error_count, 0);
            } else {
                assert_eq!(after.memory_level.get(), 0);
                assert_eq!(after.error_count, 2);
            }
        }

        let stored = f.db.get_session(&session.id).unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Completed);
        assert_eq!(stored.results.len(), 5);
    }

    #[test]
    fn test_complete_unknown_and_twice() {
        let now = Utc::now();
        let f = fixture(&["a"], now - Duration::days(2));
        let err = f.lifecycle.complete("missing", Vec::new(), now).unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(_)));

        let session = f.builder.generate(&ReviewSettings::default(), now).unwrap();
        let done = f.lifecycle.complete(&session.id, Vec::new(), now).unwrap();
        assert_eq!(done.session.accuracy, Some(0.0));
        assert!(matches!(
            f.lifecycle.complete(&session.id, Vec::new(), now),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_missing_state_does_not_block_completion() {
        let now = Utc::now();
        let f = fixture(&["a", "b"], now - Duration::days(2));
        let session = f.builder.generate(&ReviewSettings::default(), now).unwrap();

        let mut results = answers(&session, &[true, true]);
        results[1].subject = SubjectRef::ReviewPool("gone".into());
        let done = f.lifecycle.complete(&session.id, results, now).unwrap();

        assert_eq!(done.updated_states.len(), 1);
        assert_eq!(done.session.accuracy, Some(1.0));
        assert!(done.session.results[1].state_after.is_none());
    }

    #[test]
    fn test_repeated_subject_builds_on_previous_answer() {
        let now = Utc::now();
        let f = fixture(&["a"], now - Duration::days(2));
        let session = f.builder.generate(&ReviewSettings::default(), now).unwrap();
        let item = &session.items[0];

        let results = vec![
            ReviewResult::for_item(&session.id, item, true, AudioSource::Tts, 900),
            ReviewResult::for_item(&session.id, item, true, AudioSource::Tts, 800),
        ];
        let done = f.lifecycle.complete(&session.id, results, now).unwrap();
        assert_eq!(done.updated_states.len(), 1);
        assert_eq!(done.updated_states[0].memory_level.get(), 2);

        let summary = f.lifecycle.summary(&done.session);
        assert_eq!(summary.level_changes.len(), 1);
        assert_eq!(summary.level_changes[0].before, MemoryLevel::MIN);
        assert_eq!(summary.level_changes[0].after.get(), 2);
        assert_eq!(summary.new_items, 1);
        assert_eq!(summary.strengthened_items, 1);
    }

    #[test]
    fn test_session_algorithm_selects_policy() {
        let now = Utc::now();
        let f = fixture(&["a"], now - Duration::days(2));
        let subject = f.db.all_states().unwrap()[0].subject.clone();
        let mut state = f.db.state_for_subject(&subject).unwrap().unwrap();
        state.memory_level = MemoryLevel::new(3);
        state.success_streak = 4;
        f.db.update_state(&state).unwrap();

        let settings = ReviewSettings {
            algorithm: "streak_aware".into(),
            ..Default::default()
        };
        let session = f.builder.generate(&settings, now).unwrap();
        let done = f
            .lifecycle
            .complete(&session.id, answers(&session, &[true]), now)
            .unwrap();
        assert_eq!(done.updated_states[0].memory_level.get(), 5);
    }

    #[test]
    fn test_record_result() {
        let now = Utc::now();
        let f = fixture(&["a"], now - Duration::days(2));
        let lifecycle = SessionLifecycle::new(f.db.clone(), f.db.clone())
            .with_default_policy(Arc::new(StreakAwareCommit));
        let session = f.builder.generate(&ReviewSettings::default(), now).unwrap();

        let mut result =
            ReviewResult::for_item("other", &session.items[0], false, AudioSource::Tts, 500);
        let updated = lifecycle
            .record_result(&session, &mut result, now)
            .unwrap()
            .unwrap();
        assert_eq!(updated.error_count, 2);
        assert_eq!(result.state_before.as_ref().unwrap().error_count, 1);
        assert_eq!(result.session_id, session.id);

        result.subject = SubjectRef::Vocabulary("none".into());
        assert!(
            lifecycle
                .record_result(&session, &mut result, now)
                .unwrap()
                .is_none()
        );
    }

    fn streak_session(f: &Fixture, now: DateTime<Utc>) -> ReviewSession {
        let subject = f.db.all_states().unwrap()[0].subject.clone();
        let mut state = f.db.state_for_subject(&subject).unwrap().unwrap();
        state.memory_level = MemoryLevel::new(3);
        state.success_streak = 4;
        f.db.update_state(&state).unwrap();

        let settings = ReviewSettings {
            algorithm: "streak_aware".into(),
            ..Default::default()
        };
        f.builder.generate(&settings, now).unwrap()
    }

    #[test]
    fn test_record_result_and_complete_use_same_rule() {
        let now = Utc::now();
        let recorded = fixture(&["a"], now - Duration::days(2));
        let session = streak_session(&recorded, now);
        let mut result =
            ReviewResult::for_item(&session.id, &session.items[0], true, AudioSource::Tts, 700);
        let single = recorded
            .lifecycle
            .record_result(&session, &mut result, now)
            .unwrap()
            .unwrap();

        let completed = fixture(&["a"], now - Duration::days(2));
        let session = streak_session(&completed, now);
        let done = completed
            .lifecycle
            .complete(&session.id, answers(&session, &[true]), now)
            .unwrap();

        assert_eq!(single.memory_level.get(), 5);
        assert_eq!(single.memory_level, done.updated_states[0].memory_level);
    }

    #[test]
    fn test_record_result_rejects_completed_session() {
        let now = Utc::now();
        let f = fixture(&["a"], now - Duration::days(2));
        let session = f.builder.generate(&ReviewSettings::default(), now).unwrap();
        let done = f.lifecycle.complete(&session.id, Vec::new(), now).unwrap();

        let mut result =
            ReviewResult::for_item(&session.id, &session.items[0], true, AudioSource::Tts, 700);
        assert!(matches!(
            f.lifecycle.record_result(&done.session, &mut result, now),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_progress() {
        let now = Utc::now();
        let f = fixture(&["a", "b", "c", "d"], now - Duration::days(2));
        let session = f.builder.generate(&ReviewSettings::default(), now).unwrap();

        let progress = f.lifecycle.progress(&session, &answers(&session, &[true, false, true]));
        assert_eq!(progress.total_items, 4);
        assert_eq!(progress.answered, 3);
        assert_eq!(progress.incorrect, 1);
        assert_eq!(progress.remaining, 1);
        assert_eq!(progress.current_index, Some(3));
        assert_eq!(progress.percent_complete, 75.0);

        let done = f.lifecycle.progress(&session, &answers(&session, &[true; 4]));
        assert_eq!(done.current_index, None);
        assert_eq!(done.accuracy, 1.0);
    }
}
