//! Dictation error analysis.
//!
//! Builds a per-word performance table from the raw attempt log and ranks
//! words with demonstrated weaknesses for error-driven review.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::store::{AttemptHistory, MemoryStateStore, VocabularySource};
use crate::types::{
    DAY_MS, DictationAttempt, DifficultyFilter, LanguageKind, MemoryState, SubjectRef,
    VocabularyItem,
};

/// Words shown in the most-problematic list.
pub const MOST_PROBLEMATIC_LIMIT: usize = 20;
/// Words shown in the recently-wrong list.
pub const RECENTLY_WRONG_LIMIT: usize = 15;
/// Dictation sessions in the accuracy trend.
pub const ACCURACY_TREND_LIMIT: usize = 10;

/// Error-rate histogram labels, lowest first.
pub const ERROR_RATE_BUCKETS: [&str; 6] = ["0%", "1-25%", "26-50%", "51-75%", "76-99%", "100%"];

// ─────────────────────────────────────────────────────────────────────────────
// Performance Table
// ─────────────────────────────────────────────────────────────────────────────

/// Dictation performance of one word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceEntry {
    pub subject_id: String,
    pub text: String,
    pub kind: LanguageKind,
    pub error_count: u32,
    pub total_attempts: u32,
    pub error_rate: f64,
    /// Incorrect answers since the last correct one.
    pub consecutive_errors: u32,
    pub last_error_at: Option<DateTime<Utc>>,
    pub last_correct_at: Option<DateTime<Utc>>,
}

impl PerformanceEntry {
    fn new(attempt: &DictationAttempt) -> Self {
        Self {
            subject_id: attempt.subject_id.clone(),
            text: attempt.text.clone(),
            kind: attempt.kind,
            error_count: 0,
            total_attempts: 0,
            error_rate: 0.0,
            consecutive_errors: 0,
            last_error_at: None,
            last_correct_at: None,
        }
    }

    fn record(&mut self, attempt: &DictationAttempt) {
        self.total_attempts += 1;
        if attempt.is_correct {
            self.consecutive_errors = 0;
            self.last_correct_at = Some(attempt.attempted_at);
        } else {
            self.error_count += 1;
            self.consecutive_errors += 1;
            self.last_error_at = Some(attempt.attempted_at);
        }
        self.error_rate = self.error_count as f64 / self.total_attempts as f64;
    }

    /// Fractional days since the last error, if there ever was one.
    pub fn days_since_last_error(&self, now: DateTime<Utc>) -> Option<f64> {
        self.last_error_at
            .map(|at| (now - at).num_milliseconds() as f64 / DAY_MS as f64)
    }
}

/// Group attempts by word, replaying each word's history in time order.
///
/// Entries come out in order of each word's first attempt.
pub fn performance_table(attempts: &[DictationAttempt]) -> Vec<PerformanceEntry> {
    let mut ordered: Vec<&DictationAttempt> = attempts.iter().collect();
    ordered.sort_by_key(|a| a.attempted_at);

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut table: Vec<PerformanceEntry> = Vec::new();

    for attempt in ordered {
        let slot = *index.entry(attempt.subject_id.as_str()).or_insert_with(|| {
            table.push(PerformanceEntry::new(attempt));
            table.len() - 1
        });
        table[slot].record(attempt);
    }
    table
}

/// Whether a word has a weakness worth reviewing. Words that were never
/// wrong never qualify.
pub fn needs_review(entry: &PerformanceEntry, now: DateTime<Utc>) -> bool {
    if entry.error_count == 0 {
        return false;
    }
    let recent_error = entry
        .last_error_at
        .is_some_and(|at| at > now - Duration::days(30));

    recent_error || entry.consecutive_errors > 0 || entry.error_rate > 0.1 || entry.error_count > 2
}

/// Heuristic difficulty in `[1, 10]`, nudged by an already linked memory state.
pub fn difficulty_score(entry: &PerformanceEntry, linked: Option<&MemoryState>) -> f64 {
    let mut score = 5.0;

    if entry.error_rate > 0.5 {
        score += 2.0;
    } else if entry.error_rate > 0.3 {
        score += 1.0;
    } else if entry.error_rate < 0.1 {
        score -= 2.0;
    }

    if entry.consecutive_errors > 3 {
        score += 2.0;
    } else if entry.consecutive_errors > 1 {
        score += 1.0;
    }

    if entry.error_count > 5 {
        score += 1.0;
    }

    if let Some(state) = linked {
        score += (state.difficulty_score as f64 - 5.0) * 0.5;
    }

    f64::clamp(score, 1.0, 10.0)
}

/// Error-driven ranking: repeated and recent mistakes first.
///
/// `errors * 10 + rate * 20 + consecutive * 15 + max(0, (7 - days_since_error) * 5) + difficulty`
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorDrivenScoring;

impl ErrorDrivenScoring {
    pub fn name(&self) -> &'static str {
        "error_driven"
    }

    pub fn priority(
        &self,
        entry: &PerformanceEntry,
        linked: Option<&MemoryState>,
        now: DateTime<Utc>,
    ) -> f64 {
        let recency = entry
            .days_since_last_error(now)
            .map(|days| ((7.0 - days) * 5.0).max(0.0))
            .unwrap_or(0.0);

        entry.error_count as f64 * 10.0
            + entry.error_rate * 20.0
            + entry.consecutive_errors as f64 * 15.0
            + recency
            + difficulty_score(entry, linked)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Analysis Reports
// ─────────────────────────────────────────────────────────────────────────────

/// A word from the performance table joined with its vocabulary item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordAnalysis {
    pub vocabulary: VocabularyItem,
    pub performance: PerformanceEntry,
    pub memory_state: Option<MemoryState>,
    pub difficulty: f64,
    pub priority: f64,
    pub needs_review: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRateBucket {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorAnalysis {
    pub total_words: usize,
    pub words_with_errors: usize,
    pub total_errors: u32,
    /// Correct attempts over all attempts.
    pub average_accuracy: f64,
    pub error_distribution: Vec<ErrorRateBucket>,
    /// Most errors first.
    pub most_problematic: Vec<WordAnalysis>,
    /// Wrong within the last 7 days, most recent first.
    pub recently_wrong: Vec<WordAnalysis>,
    /// Highest error-driven priority first.
    pub needs_review: Vec<WordAnalysis>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorSummary {
    pub total_dictations: usize,
    pub total_errors: u32,
    pub problematic_words: usize,
    /// Accuracy of the latest dictation sessions, oldest first.
    pub accuracy_trend: Vec<f64>,
    pub recommended_review_count: usize,
}

fn bucket_index(error_rate: f64) -> usize {
    if error_rate <= 0.0 {
        0
    } else if error_rate <= 0.25 {
        1
    } else if error_rate <= 0.5 {
        2
    } else if error_rate <= 0.75 {
        3
    } else if error_rate < 1.0 {
        4
    } else {
        5
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Analyzer
// ─────────────────────────────────────────────────────────────────────────────

pub struct ErrorAnalyzer {
    history: Arc<dyn AttemptHistory>,
    source: Arc<dyn VocabularySource>,
    states: Arc<dyn MemoryStateStore>,
    scoring: ErrorDrivenScoring,
}

impl ErrorAnalyzer {
    pub fn new(
        history: Arc<dyn AttemptHistory>,
        source: Arc<dyn VocabularySource>,
        states: Arc<dyn MemoryStateStore>,
    ) -> Self {
        Self {
            history,
            source,
            states,
            scoring: ErrorDrivenScoring,
        }
    }

    /// Score every word that still exists in its unit.
    pub fn words(&self, now: DateTime<Utc>) -> Result<Vec<WordAnalysis>> {
        let attempts = self.history.dictation_attempts()?;
        let mut words = Vec::new();

        for performance in performance_table(&attempts) {
            let Some(vocabulary) = self.source.vocabulary_item(&performance.subject_id)? else {
                debug!(
                    "Skipping attempts for deleted vocabulary {}",
                    performance.subject_id
                );
                continue;
            };
            let memory_state = self
                .states
                .state_for_subject(&SubjectRef::Vocabulary(vocabulary.id.clone()))?;

            let difficulty = difficulty_score(&performance, memory_state.as_ref());
            let priority = self
                .scoring
                .priority(&performance, memory_state.as_ref(), now);
            let needs_review = needs_review(&performance, now);

            words.push(WordAnalysis {
                vocabulary,
                performance,
                memory_state,
                difficulty,
                priority,
                needs_review,
            });
        }
        Ok(words)
    }

    pub fn analyze(&self, now: DateTime<Utc>) -> Result<ErrorAnalysis> {
        let attempts = self.history.dictation_attempts()?;
        let words = self.words(now)?;

        let correct = attempts.iter().filter(|a| a.is_correct).count();
        let average_accuracy = if attempts.is_empty() {
            0.0
        } else {
            correct as f64 / attempts.len() as f64
        };

        let mut counts = [0usize; 6];
        for word in &words {
            counts[bucket_index(word.performance.error_rate)] += 1;
        }
        let error_distribution = ERROR_RATE_BUCKETS
            .iter()
            .zip(counts)
            .map(|(label, count)| ErrorRateBucket {
                label: label.to_string(),
                count,
            })
            .collect();

        let mut most_problematic: Vec<WordAnalysis> = words
            .iter()
            .filter(|w| w.performance.error_count > 0)
            .cloned()
            .collect();
        most_problematic.sort_by(|a, b| b.performance.error_count.cmp(&a.performance.error_count));
        most_problematic.truncate(MOST_PROBLEMATIC_LIMIT);

        let week_ago = now - Duration::days(7);
        let mut recently_wrong: Vec<WordAnalysis> = words
            .iter()
            .filter(|w| w.performance.last_error_at.is_some_and(|at| at > week_ago))
            .cloned()
            .collect();
        recently_wrong.sort_by(|a, b| b.performance.last_error_at.cmp(&a.performance.last_error_at));
        recently_wrong.truncate(RECENTLY_WRONG_LIMIT);

        let mut review: Vec<WordAnalysis> =
            words.iter().filter(|w| w.needs_review).cloned().collect();
        sort_by_priority(&mut review);

        Ok(ErrorAnalysis {
            total_words: words.len(),
            words_with_errors: words
                .iter()
                .filter(|w| w.performance.error_count > 0)
                .count(),
            total_errors: words.iter().map(|w| w.performance.error_count).sum(),
            average_accuracy,
            error_distribution,
            most_problematic,
            recently_wrong,
            needs_review: review,
        })
    }

    /// Words for an error-driven session, highest priority first.
    pub fn candidates(
        &self,
        word_count: usize,
        filter: DifficultyFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<WordAnalysis>> {
        let mut candidates: Vec<WordAnalysis> = self
            .words(now)?
            .into_iter()
            .filter(|w| w.needs_review && filter.accepts(w.difficulty))
            .collect();
        sort_by_priority(&mut candidates);
        candidates.truncate(word_count);
        Ok(candidates)
    }

    pub fn error_summary(&self, now: DateTime<Utc>) -> Result<ErrorSummary> {
        let analysis = self.analyze(now)?;
        let attempts = self.history.dictation_attempts()?;

        // (latest attempt, correct, total) per dictation session
        let mut sessions: HashMap<&str, (DateTime<Utc>, usize, usize)> = HashMap::new();
        for attempt in &attempts {
            let Some(session_id) = attempt.session_id.as_deref() else {
                continue;
            };
            let entry = sessions
                .entry(session_id)
                .or_insert((attempt.attempted_at, 0, 0));
            entry.0 = entry.0.max(attempt.attempted_at);
            entry.2 += 1;
            if attempt.is_correct {
                entry.1 += 1;
            }
        }

        let mut ordered: Vec<(DateTime<Utc>, f64)> = sessions
            .values()
            .map(|(at, correct, total)| (*at, *correct as f64 / *total as f64))
            .collect();
        ordered.sort_by_key(|(at, _)| *at);
        let skip = ordered.len().saturating_sub(ACCURACY_TREND_LIMIT);

        Ok(ErrorSummary {
            total_dictations: sessions.len(),
            total_errors: analysis.total_errors,
            problematic_words: analysis.words_with_errors,
            accuracy_trend: ordered.into_iter().skip(skip).map(|(_, a)| a).collect(),
            recommended_review_count: analysis.needs_review.len(),
        })
    }
}

fn sort_by_priority(words: &mut [WordAnalysis]) {
    words.sort_by(|a, b| b.priority.total_cmp(&a.priority));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::testing;
    use crate::types::AudioSource;

    fn attempt(subject: &str, is_correct: bool, at: DateTime<Utc>) -> DictationAttempt {
        DictationAttempt {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: None,
            subject_id: subject.to_string(),
            text: subject.to_string(),
            kind: LanguageKind::English,
            is_correct,
            attempted_at: at,
        }
    }

    fn analyzer(db: &Arc<Database>) -> ErrorAnalyzer {
        ErrorAnalyzer::new(db.clone(), db.clone(), db.clone())
    }

    #[test]
    fn test_performance_table_replays_in_order() {
        let now = Utc::now();
        // Deliberately out of order.
        let attempts = vec![
            attempt("a", false, now - Duration::hours(1)),
            attempt("a", true, now - Duration::hours(3)),
            attempt("b", true, now - Duration::hours(2)),
            attempt("a", false, now),
        ];
        let table = performance_table(&attempts);

        assert_eq!(table.len(), 2);
        let a = &table[0];
        assert_eq!(a.subject_id, "a");
        assert_eq!(a.total_attempts, 3);
        assert_eq!(a.error_count, 2);
        assert_eq!(a.consecutive_errors, 2);
        assert!((a.error_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(a.last_error_at, Some(now));
        assert_eq!(a.last_correct_at, Some(now - Duration::hours(3)));

        assert_eq!(table[1].error_count, 0);
        assert_eq!(table[1].last_error_at, None);
    }

    #[test]
    fn test_needs_review() {
        let now = Utc::now();
        let never_wrong = performance_table(&[attempt("a", true, now)]).remove(0);
        assert!(!needs_review(&never_wrong, now));

        // One old error, then many correct answers.
        let mut attempts = vec![attempt("b", false, now - Duration::days(90))];
        for i in 0..20 {
            attempts.push(attempt("b", true, now - Duration::days(80 - i)));
        }
        let recovered = performance_table(&attempts).remove(0);
        assert!(!needs_review(&recovered, now));

        let recent = performance_table(&[attempt("c", false, now - Duration::days(2))]).remove(0);
        assert!(needs_review(&recent, now));
    }

    #[test]
    fn test_difficulty_score() {
        let now = Utc::now();
        let attempts: Vec<_> = (0..6).map(|i| attempt("a", false, now - Duration::hours(i))).collect();
        let struggling = performance_table(&attempts).remove(0);
        // 5 + 2 (rate) + 2 (consecutive) + 1 (errors)
        assert_eq!(difficulty_score(&struggling, None), 10.0);

        let easy = performance_table(&[attempt("b", true, now)]).remove(0);
        assert_eq!(difficulty_score(&easy, None), 3.0);

        let mut state = MemoryState::initial(SubjectRef::Vocabulary("b".into()), now);
        state.difficulty_score = 9;
        assert_eq!(difficulty_score(&easy, Some(&state)), 5.0);
    }

    #[test]
    fn test_error_driven_priority() {
        let now = Utc::now();
        let entry = performance_table(&[
            attempt("a", true, now - Duration::days(4)),
            attempt("a", false, now - Duration::days(2)),
        ])
        .remove(0);
        // 10 + 0.5 * 20 + 15 + (7 - 2) * 5 + difficulty (5 + 1 for rate > 0.3)
        let priority = ErrorDrivenScoring.priority(&entry, None, now);
        assert!((priority - 66.0).abs() < 1e-6);

        let clean = performance_table(&[attempt("b", true, now)]).remove(0);
        assert_eq!(ErrorDrivenScoring.priority(&clean, None, now), 3.0);
    }

    #[test]
    fn test_analyze_and_candidates() {
        let db = testing::database();
        let words = testing::words(&db, &["apple", "pear", "plum"]);
        let now = Utc::now();

        for (word, outcomes) in [
            (&words[0], vec![false, false, false]),
            (&words[1], vec![true, true, true, false]),
            (&words[2], vec![true, true]),
        ] {
            for (i, is_correct) in outcomes.into_iter().enumerate() {
                db.record_dictation_attempt(
                    Some("d-1"),
                    &testing::result(word, is_correct),
                    now - Duration::minutes(10 - i as i64),
                )
                .unwrap();
            }
        }
        // Attempts for a word that has since been deleted.
        db.record_dictation_attempt(
            None,
            &crate::types::DictationResult {
                subject_id: "deleted".into(),
                text: "ghost".into(),
                kind: LanguageKind::English,
                is_correct: false,
                audio_source: AudioSource::Tts,
            },
            now,
        )
        .unwrap();

        let analyzer = analyzer(&db);
        let analysis = analyzer.analyze(now).unwrap();
        assert_eq!(analysis.total_words, 3);
        assert_eq!(analysis.words_with_errors, 2);
        assert_eq!(analysis.total_errors, 4);
        assert!((analysis.average_accuracy - 0.5).abs() < 1e-9);
        assert_eq!(analysis.most_problematic[0].vocabulary.text, "apple");
        assert_eq!(analysis.recently_wrong.len(), 2);
        assert_eq!(analysis.needs_review.len(), 2);

        let counts: Vec<_> = analysis.error_distribution.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 1, 0, 0, 0, 1]);

        let hard = analyzer.candidates(10, DifficultyFilter::Hard, now).unwrap();
        assert_eq!(hard.len(), 1);
        assert_eq!(hard[0].vocabulary.text, "apple");

        let easy = analyzer.candidates(10, DifficultyFilter::Easy, now).unwrap();
        assert_eq!(easy.len(), 1);
        assert_eq!(easy[0].vocabulary.text, "pear");

        let all = analyzer.candidates(1, DifficultyFilter::All, now).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].vocabulary.text, "apple");
    }

    #[test]
    fn test_error_summary_trend() {
        let db = testing::database();
        let words = testing::words(&db, &["apple", "pear"]);
        let now = Utc::now();

        for session in 0..12i64 {
            let at = now - Duration::days(12 - session);
            let session_id = format!("d-{}", session);
            db.record_dictation_attempt(Some(&session_id), &testing::result(&words[0], true), at)
                .unwrap();
            db.record_dictation_attempt(
                Some(&session_id),
                &testing::result(&words[1], session % 2 == 0),
                at,
            )
            .unwrap();
        }

        let summary = analyzer(&db).error_summary(now).unwrap();
        assert_eq!(summary.total_dictations, 12);
        assert_eq!(summary.total_errors, 6);
        assert_eq!(summary.problematic_words, 1);
        assert_eq!(summary.accuracy_trend.len(), 10);
        // Session 2 is the oldest kept and was fully correct.
        assert_eq!(summary.accuracy_trend[0], 1.0);
        assert_eq!(summary.accuracy_trend[9], 0.5);
        assert_eq!(summary.recommended_review_count, 1);
    }

    #[test]
    fn test_empty_history() {
        let db = testing::database();
        let analyzer = analyzer(&db);
        let analysis = analyzer.analyze(Utc::now()).unwrap();
        assert_eq!(analysis.total_words, 0);
        assert_eq!(analysis.average_accuracy, 0.0);
        assert!(analyzer.error_summary(Utc::now()).unwrap().accuracy_trend.is_empty());
    }
}
