//! Review pool registration.
//!
//! Words that fail a dictation are copied out of their unit into the review
//! pool together with a fresh memory state. Registration is idempotent per
//! source item.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::store::{MemoryStateStore, ReviewPoolStore, VocabularySource};
use crate::types::{AudioSource, DictationResult, LanguageKind, MemoryState, ReviewVocabulary};

/// Review pool summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPoolStats {
    pub total: usize,
    pub chinese: usize,
    pub english: usize,
    pub with_audio: usize,
    pub without_audio: usize,
    /// Entries added in the last 7 days.
    pub recently_added: usize,
}

pub struct ReviewVocabularyRegistry {
    pool: Arc<dyn ReviewPoolStore>,
    states: Arc<dyn MemoryStateStore>,
    source: Arc<dyn VocabularySource>,
}

impl ReviewVocabularyRegistry {
    pub fn new(
        pool: Arc<dyn ReviewPoolStore>,
        states: Arc<dyn MemoryStateStore>,
        source: Arc<dyn VocabularySource>,
    ) -> Self {
        Self {
            pool,
            states,
            source,
        }
    }

    /// Add the word behind a failed dictation to the review pool.
    ///
    /// Returns the existing entry when the word is already pooled and `None`
    /// when the source item no longer exists.
    pub fn register_failure(
        &self,
        result: &DictationResult,
        now: DateTime<Utc>,
    ) -> Result<Option<ReviewVocabulary>> {
        if let Some(existing) = self.pool.review_vocabulary_by_source(&result.subject_id)? {
            debug!("'{}' already in review pool", existing.text);
            return Ok(Some(existing));
        }

        let Some(item) = self.source.vocabulary_item(&result.subject_id)? else {
            warn!(
                "Source vocabulary {} not found, skipping review registration",
                result.subject_id
            );
            return Ok(None);
        };

        let audio = if item.has_audio {
            self.source.vocabulary_audio(&item.id)?
        } else {
            None
        };

        let vocabulary = ReviewVocabulary {
            id: uuid::Uuid::new_v4().to_string(),
            source_unit_id: item.unit_id.clone(),
            source_item_id: item.id.clone(),
            text: item.text.clone(),
            kind: item.kind,
            has_audio: audio.is_some(),
            audio_source: if audio.is_some() {
                AudioSource::Recorded
            } else {
                AudioSource::Tts
            },
            audio_size: audio.as_ref().map(|a| a.len() as u64).unwrap_or(0),
            added_at: now,
            added_from: result.clone(),
            created_at: now,
            updated_at: now,
        };
        let state = MemoryState::initial(vocabulary.subject_ref(), now);

        self.pool
            .insert_review_vocabulary(&vocabulary, audio.as_deref(), &state)?;
        info!("Added '{}' to review pool", vocabulary.text);
        Ok(Some(vocabulary))
    }

    /// Register every incorrect result. A failure on one word is logged and
    /// does not stop the rest.
    pub fn register_failures(
        &self,
        results: &[DictationResult],
        now: DateTime<Utc>,
    ) -> Vec<ReviewVocabulary> {
        let mut seen = HashSet::new();
        let mut registered = Vec::new();

        for result in results.iter().filter(|r| !r.is_correct) {
            match self.register_failure(result, now) {
                Ok(Some(vocabulary)) => {
                    if seen.insert(vocabulary.id.clone()) {
                        registered.push(vocabulary);
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Failed to register '{}' for review: {}", result.text, e),
            }
        }

        debug!(
            "Registered {} of {} results for review",
            registered.len(),
            results.len()
        );
        registered
    }

    pub fn exists(&self, source_item_id: &str) -> Result<bool> {
        Ok(self.pool.review_vocabulary_by_source(source_item_id)?.is_some())
    }

    pub fn get(&self, id: &str) -> Result<Option<ReviewVocabulary>> {
        self.pool.get_review_vocabulary(id)
    }

    /// All pool entries, newest first.
    pub fn list(&self) -> Result<Vec<ReviewVocabulary>> {
        self.pool.list_review_vocabulary()
    }

    /// Remove a pool entry together with its memory state.
    pub fn remove(&self, id: &str) -> Result<bool> {
        let removed = self.pool.delete_review_vocabulary(id)?;
        if removed {
            info!("Removed {} from review pool", id);
        }
        Ok(removed)
    }

    pub fn clear(&self) -> Result<usize> {
        let removed = self.pool.clear_review_pool()?;
        info!("Cleared {} entries from review pool", removed);
        Ok(removed)
    }

    /// Playable audio for a pool entry, falling back to the source item.
    pub fn audio_payload(&self, id: &str) -> Result<Option<Vec<u8>>> {
        let vocabulary = self
            .pool
            .get_review_vocabulary(id)?
            .ok_or_else(|| Error::not_found("ReviewVocabulary", id))?;

        if let Some(audio) = self.pool.review_audio(id)? {
            return Ok(Some(audio));
        }
        self.source.vocabulary_audio(&vocabulary.source_item_id)
    }

    /// Store recorded audio on a pool entry.
    pub fn set_audio(&self, id: &str, audio: &[u8]) -> Result<bool> {
        self.pool.set_review_audio(id, audio, AudioSource::Recorded)
    }

    /// Memory state of a pool entry.
    pub fn memory_state(&self, id: &str) -> Result<Option<MemoryState>> {
        let vocabulary = self
            .pool
            .get_review_vocabulary(id)?
            .ok_or_else(|| Error::not_found("ReviewVocabulary", id))?;
        self.states.state_for_subject(&vocabulary.subject_ref())
    }

    pub fn stats(&self, now: DateTime<Utc>) -> Result<ReviewPoolStats> {
        let entries = self.pool.list_review_vocabulary()?;
        let week_ago = now - Duration::days(7);

        let with_audio = entries.iter().filter(|v| v.has_audio).count();
        Ok(ReviewPoolStats {
            total: entries.len(),
            chinese: entries
                .iter()
                .filter(|v| v.kind == LanguageKind::Chinese)
                .count(),
            english: entries
                .iter()
                .filter(|v| v.kind == LanguageKind::English)
                .count(),
            with_audio,
            without_audio: entries.len() - with_audio,
            recently_added: entries.iter().filter(|v| v.added_at >= week_ago).count(),
        })
    }
}
