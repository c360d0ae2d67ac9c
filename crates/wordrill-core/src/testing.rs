//! Fixtures shared by unit tests.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::db::Database;
use crate::types::{AudioSource, DictationResult, LanguageKind, VocabularyItem};

/// Current time at the millisecond precision the database stores.
pub fn now() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(Utc::now().timestamp_millis()).unwrap()
}

pub fn database() -> Arc<Database> {
    Arc::new(Database::open_in_memory().unwrap())
}

/// Create a unit holding one word per text.
pub fn words(db: &Database, texts: &[&str]) -> Vec<VocabularyItem> {
    let unit = db.create_unit("Unit 1").unwrap();
    texts
        .iter()
        .map(|text| {
            db.create_vocabulary_item(&unit.id, LanguageKind::English, text, None)
                .unwrap()
        })
        .collect()
}

pub fn result(item: &VocabularyItem, is_correct: bool) -> DictationResult {
    DictationResult {
        subject_id: item.id.clone(),
        text: item.text.clone(),
        kind: item.kind,
        is_correct,
        audio_source: AudioSource::Tts,
    }
}
