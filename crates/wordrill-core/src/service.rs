//! Review service facade.
//!
//! Wires the registry, analyzer, session builder, lifecycle and statistics
//! onto one [`Database`] and exposes the operations the CLI needs.

use std::sync::Arc;

use chrono::Utc;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use crate::analysis::ErrorAnalyzer;
use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::registry::ReviewVocabularyRegistry;
use crate::scheduling::commit_policy_for;
use crate::session::{CompletedSession, SessionBuilder, SessionLifecycle, recommended_settings};
use crate::stats::{AutoRefresh, ReviewStatistics, StatisticsAggregator};
use crate::store::{ReviewPoolStore, ReviewSessionStore, SettingsStore};
use crate::types::{DictationResult, ReviewResult, ReviewSession, ReviewSettings, ReviewVocabulary};

/// Settings key holding the saved review settings.
pub const REVIEW_SETTINGS_KEY: &str = "review_settings";

pub struct ReviewService {
    db: Arc<Database>,
    config: Config,
    registry: ReviewVocabularyRegistry,
    analyzer: Arc<ErrorAnalyzer>,
    builder: SessionBuilder,
    lifecycle: SessionLifecycle,
    statistics: Arc<StatisticsAggregator>,
}

impl ReviewService {
    /// Build the service on an open database.
    pub fn new(db: Arc<Database>, config: Config) -> Result<Self> {
        config.validate()?;
        let default_policy = commit_policy_for(&config.scheduling.commit_rule)?;

        let analyzer = Arc::new(ErrorAnalyzer::new(db.clone(), db.clone(), db.clone()));
        let registry = ReviewVocabularyRegistry::new(db.clone(), db.clone(), db.clone());
        let builder = SessionBuilder::new(db.clone(), db.clone(), db.clone(), analyzer.clone());
        let lifecycle =
            SessionLifecycle::new(db.clone(), db.clone()).with_default_policy(default_policy);
        let statistics = Arc::new(StatisticsAggregator::new(db.clone(), db.clone()));

        debug!(
            commit_rule = %config.scheduling.commit_rule,
            "Review service initialized"
        );

        Ok(Self {
            db,
            config,
            registry,
            analyzer,
            builder,
            lifecycle,
            statistics,
        })
    }

    /// Open the database named by `config` and build the service on it.
    pub fn open(config: Config) -> Result<Self> {
        let db = Arc::new(Database::open_path(&config.database_path)?);
        Self::new(db, config)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Review Sessions
    // ─────────────────────────────────────────────────────────────────────────

    /// Start a session from the review pool. `None` uses the saved settings.
    pub fn generate_review_session(
        &self,
        settings: Option<&ReviewSettings>,
    ) -> Result<ReviewSession> {
        let settings = self.resolve_settings(settings)?;
        self.builder.generate(&settings, Utc::now())
    }

    /// Start a session from words with recent dictation errors.
    pub fn generate_error_review_session(
        &self,
        settings: Option<&ReviewSettings>,
    ) -> Result<ReviewSession> {
        let settings = self.resolve_settings(settings)?;
        self.builder.generate_from_errors(&settings, Utc::now())
    }

    pub fn complete_review_session(
        &self,
        session_id: &str,
        results: Vec<ReviewResult>,
    ) -> Result<CompletedSession> {
        self.lifecycle.complete(session_id, results, Utc::now())
    }

    pub fn review_session(&self, session_id: &str) -> Result<Option<ReviewSession>> {
        self.db.get_session(session_id)
    }

    /// All sessions, newest first.
    pub fn review_sessions(&self) -> Result<Vec<ReviewSession>> {
        self.db.list_sessions()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Dictation
    // ─────────────────────────────────────────────────────────────────────────

    pub fn register_dictation_failures(&self, results: &[DictationResult]) -> Vec<ReviewVocabulary> {
        self.registry.register_failures(results, Utc::now())
    }

    /// Log every result to the attempt history, then pool the failures.
    pub fn record_dictation(
        &self,
        session_id: Option<&str>,
        results: &[DictationResult],
    ) -> Result<Vec<ReviewVocabulary>> {
        let now = Utc::now();
        for result in results {
            self.db.record_dictation_attempt(session_id, result, now)?;
        }
        let registered = self.registry.register_failures(results, now);
        info!(
            attempts = results.len(),
            registered = registered.len(),
            "Recorded dictation"
        );
        Ok(registered)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statistics
    // ─────────────────────────────────────────────────────────────────────────

    pub fn get_statistics(&self) -> Result<ReviewStatistics> {
        self.statistics.snapshot(Utc::now())
    }

    /// Start the dashboard refresh task when enabled in the config.
    ///
    /// Must be called inside a tokio runtime.
    pub fn auto_refresh(&self) -> Option<AutoRefresh> {
        if !self.config.dashboard.auto_refresh {
            return None;
        }
        Some(AutoRefresh::spawn(
            self.statistics.clone(),
            Duration::from_secs(self.config.dashboard.refresh_interval_secs),
        ))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Settings
    // ─────────────────────────────────────────────────────────────────────────

    /// Saved review settings merged over the configured defaults.
    pub fn review_settings(&self) -> Result<ReviewSettings> {
        let defaults = self.config.review.clone();
        let Some(stored) = self.db.load_setting(REVIEW_SETTINGS_KEY)? else {
            return Ok(defaults);
        };

        let mut merged = serde_json::to_value(&defaults)?;
        match (merged.as_object_mut(), stored.as_object()) {
            (Some(base), Some(overrides)) => {
                for (key, value) in overrides {
                    base.insert(key.clone(), value.clone());
                }
            }
            _ => {
                warn!("Saved review settings are not an object, using defaults");
                return Ok(defaults);
            }
        }

        match serde_json::from_value(merged) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                warn!(error = %e, "Saved review settings are invalid, using defaults");
                Ok(defaults)
            }
        }
    }

    pub fn save_review_settings(&self, settings: &ReviewSettings) -> Result<()> {
        settings.validate()?;
        self.db
            .save_setting(REVIEW_SETTINGS_KEY, &serde_json::to_value(settings)?)?;
        info!(word_count = settings.word_count, "Saved review settings");
        Ok(())
    }

    /// Saved settings adjusted to the current pool and past accuracy.
    pub fn recommended_settings(&self) -> Result<ReviewSettings> {
        let base = self.review_settings()?;
        let pool_size = self.db.list_review_vocabulary()?.len();
        let stats = self.get_statistics()?;
        Ok(recommended_settings(&base, pool_size, &stats))
    }

    fn resolve_settings(&self, settings: Option<&ReviewSettings>) -> Result<ReviewSettings> {
        match settings {
            Some(settings) => Ok(settings.clone()),
            None => self.review_settings(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &ReviewVocabularyRegistry {
        &self.registry
    }

    pub fn analyzer(&self) -> &ErrorAnalyzer {
        &self.analyzer
    }

    pub fn builder(&self) -> &SessionBuilder {
        &self.builder
    }

    pub fn lifecycle(&self) -> &SessionLifecycle {
        &self.lifecycle
    }

    pub fn statistics(&self) -> &Arc<StatisticsAggregator> {
        &self.statistics
    }
}
