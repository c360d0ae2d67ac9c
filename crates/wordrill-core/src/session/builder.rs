//! Review session assembly.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::analysis::ErrorAnalyzer;
use crate::error::{Error, Result};
use crate::scheduling::{DueDateScoring, PriorityPolicy};
use crate::stats::ReviewStatistics;
use crate::store::{MemoryStateStore, ReviewPoolStore, ReviewSessionStore};
use crate::types::{
    DifficultyFilter, ReviewItem, ReviewSession, ReviewSettings, ReviewSubject, SubjectKind,
};

/// Builds ranked review sessions from the pool or from dictation errors.
pub struct SessionBuilder {
    states: Arc<dyn MemoryStateStore>,
    pool: Arc<dyn ReviewPoolStore>,
    sessions: Arc<dyn ReviewSessionStore>,
    analyzer: Arc<ErrorAnalyzer>,
    scoring: Arc<dyn PriorityPolicy>,
}

impl SessionBuilder {
    pub fn new(
        states: Arc<dyn MemoryStateStore>,
        pool: Arc<dyn ReviewPoolStore>,
        sessions: Arc<dyn ReviewSessionStore>,
        analyzer: Arc<ErrorAnalyzer>,
    ) -> Self {
        Self {
            states,
            pool,
            sessions,
            analyzer,
            scoring: Arc::new(DueDateScoring),
        }
    }

    /// Replace the ranking used by [`generate`](Self::generate).
    pub fn with_scoring(mut self, scoring: Arc<dyn PriorityPolicy>) -> Self {
        self.scoring = scoring;
        self
    }

    /// Build and persist a session from due pool entries.
    ///
    /// Earliest-due entries are taken first. When nothing is due the newest
    /// pool entries are used instead.
    pub fn generate(&self, settings: &ReviewSettings, now: DateTime<Utc>) -> Result<ReviewSession> {
        settings.validate()?;
        let limit = settings.word_count;

        let mut candidates = self.states.due_states(SubjectKind::ReviewPool, now, limit)?;
        if candidates.is_empty() {
            debug!("Nothing due, falling back to newest pool entries");
            candidates = self.states.newest_states(SubjectKind::ReviewPool, limit)?;
        }
        if candidates.is_empty() {
            return Err(Error::NoReviewableVocabulary);
        }

        let total = candidates.len();
        let mut items = Vec::with_capacity(total);
        for state in candidates {
            match self.pool.get_review_vocabulary(state.subject.id()) {
                Ok(Some(vocabulary)) => items.push(ReviewItem {
                    priority: self.scoring.priority(&state, now),
                    subject: ReviewSubject::Pool(vocabulary),
                    memory_state: Some(state),
                }),
                Ok(None) => warn!(
                    "Memory state {} points at missing pool entry {}",
                    state.id,
                    state.subject.id()
                ),
                Err(e) => warn!("Failed to resolve pool entry {}: {}", state.subject.id(), e),
            }
        }

        if items.is_empty() {
            return Err(Error::NoValidReviewItems { candidates: total });
        }

        sort_by_priority(&mut items);
        items.truncate(limit);
        self.persist(items, settings, now)
    }

    /// Build and persist a session from words with recent dictation errors,
    /// honoring the difficulty filter.
    pub fn generate_from_errors(
        &self,
        settings: &ReviewSettings,
        now: DateTime<Utc>,
    ) -> Result<ReviewSession> {
        settings.validate()?;

        let candidates =
            self.analyzer
                .candidates(settings.word_count, settings.difficulty_filter, now)?;
        if candidates.is_empty() {
            return Err(Error::NoReviewableVocabulary);
        }

        let items = candidates
            .into_iter()
            .map(|word| ReviewItem {
                subject: ReviewSubject::Vocabulary(word.vocabulary),
                memory_state: word.memory_state,
                priority: word.priority,
            })
            .collect();
        self.persist(items, settings, now)
    }

    fn persist(
        &self,
        items: Vec<ReviewItem>,
        settings: &ReviewSettings,
        now: DateTime<Utc>,
    ) -> Result<ReviewSession> {
        let session = ReviewSession::open(items, settings.clone(), now);
        self.sessions.insert_session(&session)?;
        info!(
            "Started review session {} with {} items",
            session.id,
            session.items.len()
        );
        Ok(session)
    }
}

fn sort_by_priority(items: &mut [ReviewItem]) {
    items.sort_by(|a, b| b.priority.total_cmp(&a.priority));
}

/// Settings tuned to the pool size, the overdue backlog and past accuracy.
pub fn recommended_settings(
    base: &ReviewSettings,
    pool_size: usize,
    stats: &ReviewStatistics,
) -> ReviewSettings {
    let mut settings = base.clone();

    if pool_size < 10 {
        settings.word_count = pool_size.max(3);
    } else if pool_size > 50 {
        settings.word_count = 20;
    }

    let overdue = stats.overdue_count;
    if overdue > 0 && overdue < settings.word_count {
        settings.word_count = overdue;
    } else if overdue > settings.word_count {
        settings.word_count = overdue.min(30);
    }

    // Accuracy says nothing until a session has been completed.
    if stats.completed_sessions > 0 {
        if stats.average_accuracy >= 0.8 {
            settings.difficulty_filter = DifficultyFilter::Hard;
        } else if stats.average_accuracy < 0.5 {
            settings.difficulty_filter = DifficultyFilter::Easy;
        }
    }
    settings
}
