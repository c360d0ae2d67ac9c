//! Storage traits consumed by the scheduling services.
//!
//! Every method returns `Result` so an empty answer and a failed lookup stay
//! distinct. `db::Database` implements all of them on SQLite.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{
    AudioSource, DictationAttempt, MemoryState, ReviewSession, ReviewVocabulary, SubjectKind,
    SubjectRef, VocabularyItem,
};

/// Memory state persistence.
pub trait MemoryStateStore: Send + Sync {
    /// Get a memory state by ID.
    fn get_state(&self, id: &str) -> Result<Option<MemoryState>>;

    /// Get the state tracking `subject`.
    fn state_for_subject(&self, subject: &SubjectRef) -> Result<Option<MemoryState>>;

    /// States of `kind` due at `now`, earliest due first.
    fn due_states(
        &self,
        kind: SubjectKind,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<MemoryState>>;

    /// States of `kind`, newest created first.
    fn newest_states(&self, kind: SubjectKind, limit: usize) -> Result<Vec<MemoryState>>;

    /// Every stored state.
    fn all_states(&self) -> Result<Vec<MemoryState>>;

    fn insert_state(&self, state: &MemoryState) -> Result<()>;

    /// Overwrite an existing state. Fails with `NotFound` when absent.
    fn update_state(&self, state: &MemoryState) -> Result<()>;
}

/// Review pool persistence.
pub trait ReviewPoolStore: Send + Sync {
    fn get_review_vocabulary(&self, id: &str) -> Result<Option<ReviewVocabulary>>;

    /// Pool entry copied from `source_item_id`, if any.
    fn review_vocabulary_by_source(&self, source_item_id: &str)
    -> Result<Option<ReviewVocabulary>>;

    /// All pool entries, newest added first.
    fn list_review_vocabulary(&self) -> Result<Vec<ReviewVocabulary>>;

    /// Audio bytes stored on the pool entry itself.
    fn review_audio(&self, id: &str) -> Result<Option<Vec<u8>>>;

    /// Insert a pool entry and its memory state in one transaction.
    fn insert_review_vocabulary(
        &self,
        vocabulary: &ReviewVocabulary,
        audio: Option<&[u8]>,
        state: &MemoryState,
    ) -> Result<()>;

    /// Replace the audio of a pool entry. Returns false when the entry is absent.
    fn set_review_audio(&self, id: &str, audio: &[u8], source: AudioSource) -> Result<bool>;

    /// Delete a pool entry and its memory state in one transaction.
    fn delete_review_vocabulary(&self, id: &str) -> Result<bool>;

    /// Delete every pool entry and pool state. Returns the entry count.
    fn clear_review_pool(&self) -> Result<usize>;
}

/// Review session persistence.
pub trait ReviewSessionStore: Send + Sync {
    fn insert_session(&self, session: &ReviewSession) -> Result<()>;

    fn get_session(&self, id: &str) -> Result<Option<ReviewSession>>;

    /// All sessions, most recently started first.
    fn list_sessions(&self) -> Result<Vec<ReviewSession>>;

    /// Write updated states and the finished session row in one transaction.
    fn commit_review_session(&self, session: &ReviewSession, states: &[MemoryState]) -> Result<()>;
}

/// Lookup of the original unit-scoped vocabulary.
pub trait VocabularySource: Send + Sync {
    fn vocabulary_item(&self, id: &str) -> Result<Option<VocabularyItem>>;

    fn vocabulary_audio(&self, id: &str) -> Result<Option<Vec<u8>>>;
}

/// Append-only dictation history.
pub trait AttemptHistory: Send + Sync {
    /// Every attempt, oldest first.
    fn dictation_attempts(&self) -> Result<Vec<DictationAttempt>>;
}

/// Key/value settings persistence.
pub trait SettingsStore: Send + Sync {
    fn load_setting(&self, key: &str) -> Result<Option<serde_json::Value>>;

    fn save_setting(&self, key: &str, value: &serde_json::Value) -> Result<()>;
}
