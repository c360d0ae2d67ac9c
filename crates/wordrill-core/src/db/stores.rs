//! Store trait implementations for [`Database`].

use super::{
    ATTEMPT_COLUMNS, Database, REVIEW_VOCABULARY_COLUMNS, SESSION_COLUMNS, STATE_COLUMNS,
    VOCABULARY_COLUMNS, to_millis,
};
use crate::error::{Error, Result};
use crate::store::{
    AttemptHistory, MemoryStateStore, ReviewPoolStore, ReviewSessionStore, SettingsStore,
    VocabularySource,
};
use crate::types::{
    AudioSource, DictationAttempt, MemoryState, ReviewSession, ReviewVocabulary, SubjectKind,
    SubjectRef, VocabularyItem,
};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

fn insert_state_row(conn: &Connection, state: &MemoryState) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO memory_states ({STATE_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        ),
        params![
            state.id,
            state.subject.kind().as_str(),
            state.subject.id(),
            state.memory_level.get(),
            to_millis(state.last_review_date),
            to_millis(state.next_review_date),
            state.error_count,
            state.success_streak,
            state.difficulty_score,
            to_millis(state.created_at),
            to_millis(state.updated_at),
        ],
    )?;
    Ok(())
}

fn update_state_row(conn: &Connection, state: &MemoryState) -> Result<()> {
    let rows = conn.execute(
        "UPDATE memory_states
         SET memory_level = ?2, last_review_date = ?3, next_review_date = ?4,
             error_count = ?5, success_streak = ?6, difficulty_score = ?7, updated_at = ?8
         WHERE id = ?1",
        params![
            state.id,
            state.memory_level.get(),
            to_millis(state.last_review_date),
            to_millis(state.next_review_date),
            state.error_count,
            state.success_streak,
            state.difficulty_score,
            to_millis(state.updated_at),
        ],
    )?;
    if rows == 0 {
        return Err(Error::not_found("MemoryState", &state.id));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory States
// ─────────────────────────────────────────────────────────────────────────────

impl MemoryStateStore for Database {
    fn get_state(&self, id: &str) -> Result<Option<MemoryState>> {
        let conn = self.lock()?;
        let state = conn
            .query_row(
                &format!("SELECT {STATE_COLUMNS} FROM memory_states WHERE id = ?1"),
                params![id],
                Self::map_memory_state,
            )
            .optional()?;
        Ok(state)
    }

    fn state_for_subject(&self, subject: &SubjectRef) -> Result<Option<MemoryState>> {
        let conn = self.lock()?;
        let state = conn
            .query_row(
                &format!(
                    "SELECT {STATE_COLUMNS} FROM memory_states
                     WHERE subject_kind = ?1 AND subject_id = ?2"
                ),
                params![subject.kind().as_str(), subject.id()],
                Self::map_memory_state,
            )
            .optional()?;
        Ok(state)
    }

    fn due_states(
        &self,
        kind: SubjectKind,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<MemoryState>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {STATE_COLUMNS} FROM memory_states
             WHERE subject_kind = ?1 AND next_review_date <= ?2
             ORDER BY next_review_date ASC
             LIMIT ?3"
        ))?;
        let states = stmt
            .query_map(
                params![kind.as_str(), to_millis(now), limit as i64],
                Self::map_memory_state,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(states)
    }

    fn newest_states(&self, kind: SubjectKind, limit: usize) -> Result<Vec<MemoryState>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {STATE_COLUMNS} FROM memory_states
             WHERE subject_kind = ?1
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?2"
        ))?;
        let states = stmt
            .query_map(params![kind.as_str(), limit as i64], Self::map_memory_state)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(states)
    }

    fn all_states(&self) -> Result<Vec<MemoryState>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {STATE_COLUMNS} FROM memory_states ORDER BY created_at"
        ))?;
        let states = stmt
            .query_map([], Self::map_memory_state)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(states)
    }

    fn insert_state(&self, state: &MemoryState) -> Result<()> {
        let conn = self.lock()?;
        insert_state_row(&conn, state)
    }

    fn update_state(&self, state: &MemoryState) -> Result<()> {
        let conn = self.lock()?;
        update_state_row(&conn, state)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Review Pool
// ─────────────────────────────────────────────────────────────────────────────

impl ReviewPoolStore for Database {
    fn get_review_vocabulary(&self, id: &str) -> Result<Option<ReviewVocabulary>> {
        let conn = self.lock()?;
        let vocabulary = conn
            .query_row(
                &format!("SELECT {REVIEW_VOCABULARY_COLUMNS} FROM review_vocabulary WHERE id = ?1"),
                params![id],
                Self::map_review_vocabulary,
            )
            .optional()?;
        Ok(vocabulary)
    }

    fn review_vocabulary_by_source(
        &self,
        source_item_id: &str,
    ) -> Result<Option<ReviewVocabulary>> {
        let conn = self.lock()?;
        let vocabulary = conn
            .query_row(
                &format!(
                    "SELECT {REVIEW_VOCABULARY_COLUMNS} FROM review_vocabulary
                     WHERE source_item_id = ?1"
                ),
                params![source_item_id],
                Self::map_review_vocabulary,
            )
            .optional()?;
        Ok(vocabulary)
    }

    fn list_review_vocabulary(&self) -> Result<Vec<ReviewVocabulary>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {REVIEW_VOCABULARY_COLUMNS} FROM review_vocabulary
             ORDER BY added_at DESC, rowid DESC"
        ))?;
        let entries = stmt
            .query_map([], Self::map_review_vocabulary)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn review_audio(&self, id: &str) -> Result<Option<Vec<u8>>> {
        let conn = self.lock()?;
        let audio: Option<Option<Vec<u8>>> = conn
            .query_row(
                "SELECT audio FROM review_vocabulary WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(audio.flatten())
    }

    fn insert_review_vocabulary(
        &self,
        vocabulary: &ReviewVocabulary,
        audio: Option<&[u8]>,
        state: &MemoryState,
    ) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let added_from = serde_json::to_string(&vocabulary.added_from)?;

        tx.execute(
            "INSERT INTO review_vocabulary
             (id, source_unit_id, source_item_id, text, kind, audio, audio_source,
              added_at, added_from, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                vocabulary.id,
                vocabulary.source_unit_id,
                vocabulary.source_item_id,
                vocabulary.text,
                vocabulary.kind.as_str(),
                audio,
                vocabulary.audio_source.as_str(),
                to_millis(vocabulary.added_at),
                added_from,
                to_millis(vocabulary.created_at),
                to_millis(vocabulary.updated_at),
            ],
        )?;
        insert_state_row(&tx, state)?;

        tx.commit()?;
        Ok(())
    }

    fn set_review_audio(&self, id: &str, audio: &[u8], source: AudioSource) -> Result<bool> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "UPDATE review_vocabulary SET audio = ?2, audio_source = ?3, updated_at = ?4
             WHERE id = ?1",
            params![id, audio, source.as_str(), Utc::now().timestamp_millis()],
        )?;
        Ok(rows > 0)
    }

    fn delete_review_vocabulary(&self, id: &str) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM memory_states WHERE subject_kind = ?1 AND subject_id = ?2",
            params![SubjectKind::ReviewPool.as_str(), id],
        )?;
        let rows = tx.execute("DELETE FROM review_vocabulary WHERE id = ?1", params![id])?;

        tx.commit()?;
        Ok(rows > 0)
    }

    fn clear_review_pool(&self) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM memory_states WHERE subject_kind = ?1",
            params![SubjectKind::ReviewPool.as_str()],
        )?;
        let rows = tx.execute("DELETE FROM review_vocabulary", [])?;

        tx.commit()?;
        Ok(rows)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Review Sessions
// ─────────────────────────────────────────────────────────────────────────────

impl ReviewSessionStore for Database {
    fn insert_session(&self, session: &ReviewSession) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            &format!(
                "INSERT INTO review_sessions ({SESSION_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ),
            params![
                session.id,
                serde_json::to_string(&session.items)?,
                serde_json::to_string(&session.settings)?,
                session.status.as_str(),
                to_millis(session.started_at),
                session.completed_at.map(to_millis),
                session.accuracy,
                session.duration_secs,
                serde_json::to_string(&session.results)?,
            ],
        )?;
        Ok(())
    }

    fn get_session(&self, id: &str) -> Result<Option<ReviewSession>> {
        let conn = self.lock()?;
        let session = conn
            .query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM review_sessions WHERE id = ?1"),
                params![id],
                Self::map_review_session,
            )
            .optional()?;
        Ok(session)
    }

    fn list_sessions(&self) -> Result<Vec<ReviewSession>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM review_sessions ORDER BY started_at DESC"
        ))?;
        let sessions = stmt
            .query_map([], Self::map_review_session)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    fn commit_review_session(&self, session: &ReviewSession, states: &[MemoryState]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        for state in states {
            update_state_row(&tx, state)?;
        }

        let rows = tx.execute(
            "UPDATE review_sessions
             SET status = ?2, completed_at = ?3, accuracy = ?4, duration_secs = ?5, results = ?6
             WHERE id = ?1",
            params![
                session.id,
                session.status.as_str(),
                session.completed_at.map(to_millis),
                session.accuracy,
                session.duration_secs,
                serde_json::to_string(&session.results)?,
            ],
        )?;
        if rows == 0 {
            return Err(Error::SessionNotFound(session.id.clone()));
        }

        tx.commit()?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Vocabulary, History & Settings
// ─────────────────────────────────────────────────────────────────────────────

impl VocabularySource for Database {
    fn vocabulary_item(&self, id: &str) -> Result<Option<VocabularyItem>> {
        let conn = self.lock()?;
        let item = conn
            .query_row(
                &format!("SELECT {VOCABULARY_COLUMNS} FROM vocabulary_items WHERE id = ?1"),
                params![id],
                Self::map_vocabulary_item,
            )
            .optional()?;
        Ok(item)
    }

    fn vocabulary_audio(&self, id: &str) -> Result<Option<Vec<u8>>> {
        let conn = self.lock()?;
        let audio: Option<Option<Vec<u8>>> = conn
            .query_row(
                "SELECT audio FROM vocabulary_items WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(audio.flatten())
    }
}

impl AttemptHistory for Database {
    fn dictation_attempts(&self) -> Result<Vec<DictationAttempt>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM dictation_attempts ORDER BY attempted_at ASC, rowid ASC"
        ))?;
        let attempts = stmt
            .query_map([], Self::map_dictation_attempt)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(attempts)
    }
}

impl SettingsStore for Database {
    fn load_setting(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|value| serde_json::from_str(&value).map_err(Error::from))
            .transpose()
    }

    fn save_setting(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, serde_json::to_string(value)?, Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }
}
