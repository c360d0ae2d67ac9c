//! SQLite database access for wordrill.
//!
//! The schema lives in `migrations/` and is applied every time a database is
//! opened. Location is resolved by [`crate::config::Config`]:
//! 1. WORDRILL_DATABASE_PATH env var
//! 2. `database_path` in the config file
//! 3. ~/.wordrill/wordrill.db

mod migrations;
mod stores;

use crate::error::{Error, Result};
use crate::types::{
    DictationAttempt, DictationResult, LanguageKind, MemoryLevel, MemoryState, ReviewSession,
    ReviewVocabulary, SubjectRef, Unit, VocabularyItem, clamp_difficulty,
};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Database connection wrapper.
///
/// Thread-safe via internal Mutex. All database operations acquire the lock.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database at `path`, creating parent directories.
    pub fn open_path(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        tracing::debug!("Opened database at {}", path.display());
        Self::init(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::LockPoisoned)
    }

    /// Check database connectivity
    pub fn ping(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch("SELECT 1").map_err(Error::Database)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Unit & Vocabulary Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a unit
    pub fn create_unit(&self, name: &str) -> Result<Unit> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("unit name must not be empty"));
        }

        let conn = self.lock()?;
        let now = Utc::now();
        let unit = Unit {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };

        conn.execute(
            "INSERT INTO units (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![unit.id, unit.name, to_millis(now), to_millis(now)],
        )?;
        Ok(unit)
    }

    /// List all units, oldest first
    pub fn list_units(&self) -> Result<Vec<Unit>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT id, name, created_at, updated_at FROM units ORDER BY created_at")?;
        let units = stmt
            .query_map([], |row| {
                Ok(Unit {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: timestamp(row, 2)?,
                    updated_at: timestamp(row, 3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(units)
    }

    /// Delete a unit and its vocabulary items.
    ///
    /// Review pool entries copied from those items are kept.
    pub fn delete_unit(&self, unit_id: &str) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let items = tx.execute(
            "DELETE FROM vocabulary_items WHERE unit_id = ?1",
            params![unit_id],
        )?;
        let deleted = tx.execute("DELETE FROM units WHERE id = ?1", params![unit_id])? > 0;
        tx.commit()?;
        if deleted {
            tracing::info!("Deleted unit {} with {} items", unit_id, items);
        }
        Ok(deleted)
    }

    /// Add a vocabulary item to a unit
    pub fn create_vocabulary_item(
        &self,
        unit_id: &str,
        kind: LanguageKind,
        text: &str,
        audio: Option<&[u8]>,
    ) -> Result<VocabularyItem> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::validation("vocabulary text must not be empty"));
        }

        let conn = self.lock()?;
        let unit_exists = conn
            .query_row("SELECT 1 FROM units WHERE id = ?1", params![unit_id], |_| {
                Ok(())
            })
            .optional()?
            .is_some();
        if !unit_exists {
            return Err(Error::not_found("Unit", unit_id));
        }

        let now = Utc::now();
        let item = VocabularyItem {
            id: uuid::Uuid::new_v4().to_string(),
            unit_id: unit_id.to_string(),
            kind,
            text: text.to_string(),
            has_audio: audio.is_some(),
            audio_size: audio.map(|a| a.len() as u64).unwrap_or(0),
            created_at: now,
            updated_at: now,
        };

        conn.execute(
            "INSERT INTO vocabulary_items (id, unit_id, kind, text, audio, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                item.id,
                item.unit_id,
                item.kind.as_str(),
                item.text,
                audio,
                to_millis(now),
                to_millis(now),
            ],
        )?;
        Ok(item)
    }

    /// List vocabulary items of a unit
    pub fn list_vocabulary_items(&self, unit_id: &str) -> Result<Vec<VocabularyItem>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {VOCABULARY_COLUMNS} FROM vocabulary_items WHERE unit_id = ?1 ORDER BY created_at"
        );
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params![unit_id], Self::map_vocabulary_item)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Dictation History
    // ─────────────────────────────────────────────────────────────────────────

    /// Append a dictation attempt to the history log
    pub fn record_dictation_attempt(
        &self,
        session_id: Option<&str>,
        result: &DictationResult,
        attempted_at: DateTime<Utc>,
    ) -> Result<DictationAttempt> {
        let conn = self.lock()?;
        let attempt = DictationAttempt {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.map(str::to_string),
            subject_id: result.subject_id.clone(),
            text: result.text.clone(),
            kind: result.kind,
            is_correct: result.is_correct,
            attempted_at,
        };

        conn.execute(
            "INSERT INTO dictation_attempts
             (id, session_id, subject_id, text, kind, is_correct, attempted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                attempt.id,
                attempt.session_id,
                attempt.subject_id,
                attempt.text,
                attempt.kind.as_str(),
                attempt.is_correct,
                to_millis(attempted_at),
            ],
        )?;
        Ok(attempt)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Row Mapping
    // ─────────────────────────────────────────────────────────────────────────

    fn map_vocabulary_item(row: &rusqlite::Row) -> rusqlite::Result<VocabularyItem> {
        Ok(VocabularyItem {
            id: row.get(0)?,
            unit_id: row.get(1)?,
            kind: parse_text(row, 2)?,
            text: row.get(3)?,
            has_audio: row.get(4)?,
            audio_size: row.get::<_, i64>(5)?.max(0) as u64,
            created_at: timestamp(row, 6)?,
            updated_at: timestamp(row, 7)?,
        })
    }

    fn map_memory_state(row: &rusqlite::Row) -> rusqlite::Result<MemoryState> {
        let kind = parse_text(row, 1)?;
        let subject_id: String = row.get(2)?;
        Ok(MemoryState {
            id: row.get(0)?,
            subject: SubjectRef::new(kind, subject_id),
            memory_level: MemoryLevel::new(row.get(3)?),
            last_review_date: timestamp(row, 4)?,
            next_review_date: timestamp(row, 5)?,
            error_count: row.get::<_, i64>(6)?.clamp(0, u32::MAX as i64) as u32,
            success_streak: row.get::<_, i64>(7)?.clamp(0, u32::MAX as i64) as u32,
            difficulty_score: clamp_difficulty(row.get(8)?),
            created_at: timestamp(row, 9)?,
            updated_at: timestamp(row, 10)?,
        })
    }

    fn map_review_vocabulary(row: &rusqlite::Row) -> rusqlite::Result<ReviewVocabulary> {
        Ok(ReviewVocabulary {
            id: row.get(0)?,
            source_unit_id: row.get(1)?,
            source_item_id: row.get(2)?,
            text: row.get(3)?,
            kind: parse_text(row, 4)?,
            has_audio: row.get(5)?,
            audio_source: parse_text(row, 6)?,
            audio_size: row.get::<_, i64>(7)?.max(0) as u64,
            added_at: timestamp(row, 8)?,
            added_from: parse_json(row, 9)?,
            created_at: timestamp(row, 10)?,
            updated_at: timestamp(row, 11)?,
        })
    }

    fn map_review_session(row: &rusqlite::Row) -> rusqlite::Result<ReviewSession> {
        Ok(ReviewSession {
            id: row.get(0)?,
            items: parse_json(row, 1)?,
            settings: parse_json(row, 2)?,
            status: parse_text(row, 3)?,
            started_at: timestamp(row, 4)?,
            completed_at: optional_timestamp(row, 5)?,
            accuracy: row.get(6)?,
            duration_secs: row.get(7)?,
            results: parse_json(row, 8)?,
        })
    }

    fn map_dictation_attempt(row: &rusqlite::Row) -> rusqlite::Result<DictationAttempt> {
        Ok(DictationAttempt {
            id: row.get(0)?,
            session_id: row.get(1)?,
            subject_id: row.get(2)?,
            text: row.get(3)?,
            kind: parse_text(row, 4)?,
            is_correct: row.get(5)?,
            attempted_at: timestamp(row, 6)?,
        })
    }
}

const VOCABULARY_COLUMNS: &str = "id, unit_id, kind, text, audio IS NOT NULL, \
     COALESCE(LENGTH(audio), 0), created_at, updated_at";

const STATE_COLUMNS: &str = "id, subject_kind, subject_id, memory_level, last_review_date, \
     next_review_date, error_count, success_streak, difficulty_score, created_at, updated_at";

const REVIEW_VOCABULARY_COLUMNS: &str = "id, source_unit_id, source_item_id, text, kind, \
     audio IS NOT NULL, audio_source, COALESCE(LENGTH(audio), 0), added_at, added_from, \
     created_at, updated_at";

const SESSION_COLUMNS: &str =
    "id, items, settings, status, started_at, completed_at, accuracy, duration_secs, results";

const ATTEMPT_COLUMNS: &str = "id, session_id, subject_id, text, kind, is_correct, attempted_at";

fn to_millis(dt: DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

fn from_millis(idx: usize, ms: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            format!("timestamp out of range: {ms}").into(),
        )
    })
}

fn timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    from_millis(idx, row.get(idx)?)
}

fn optional_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    row.get::<_, Option<i64>>(idx)?
        .map(|ms| from_millis(idx, ms))
        .transpose()
}

fn parse_text<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

fn parse_json<T: DeserializeOwned>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
