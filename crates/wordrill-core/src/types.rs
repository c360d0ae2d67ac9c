//! Shared types for wordrill-core.
//!
//! These types are used by the scheduling services and the database layer.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Milliseconds in one day.
pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

// ─────────────────────────────────────────────────────────────────────────────
// Subjects
// ─────────────────────────────────────────────────────────────────────────────

/// Which collection a subject id points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    /// Unit-scoped vocabulary item.
    Vocabulary,
    /// Review-pool copy of a failed item.
    ReviewPool,
}

impl SubjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectKind::Vocabulary => "vocabulary",
            SubjectKind::ReviewPool => "review_pool",
        }
    }
}

impl std::fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SubjectKind {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "vocabulary" => Ok(SubjectKind::Vocabulary),
            "review_pool" => Ok(SubjectKind::ReviewPool),
            _ => Err(format!("Invalid subject kind: {}", s)),
        }
    }
}

/// Weak reference to the item a memory state tracks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SubjectRef {
    Vocabulary(String),
    ReviewPool(String),
}

impl SubjectRef {
    pub fn new(kind: SubjectKind, id: impl Into<String>) -> Self {
        match kind {
            SubjectKind::Vocabulary => SubjectRef::Vocabulary(id.into()),
            SubjectKind::ReviewPool => SubjectRef::ReviewPool(id.into()),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            SubjectRef::Vocabulary(id) | SubjectRef::ReviewPool(id) => id,
        }
    }

    pub fn kind(&self) -> SubjectKind {
        match self {
            SubjectRef::Vocabulary(_) => SubjectKind::Vocabulary,
            SubjectRef::ReviewPool(_) => SubjectKind::ReviewPool,
        }
    }
}

impl std::fmt::Display for SubjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

/// Language of a vocabulary item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageKind {
    Chinese,
    English,
}

impl LanguageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageKind::Chinese => "chinese",
            LanguageKind::English => "english",
        }
    }
}

impl std::fmt::Display for LanguageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LanguageKind {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "chinese" => Ok(LanguageKind::Chinese),
            "english" => Ok(LanguageKind::English),
            _ => Err(format!("Invalid language kind: {}", s)),
        }
    }
}

/// Where the audio played for an item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioSource {
    Recorded,
    Tts,
}

impl AudioSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioSource::Recorded => "recorded",
            AudioSource::Tts => "tts",
        }
    }
}

impl std::str::FromStr for AudioSource {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "recorded" => Ok(AudioSource::Recorded),
            "tts" => Ok(AudioSource::Tts),
            _ => Err(format!("Invalid audio source: {}", s)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory State
// ─────────────────────────────────────────────────────────────────────────────

/// Mastery depth in `0..=7`. Every constructor clamps.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(from = "u8", into = "u8")]
pub struct MemoryLevel(u8);

impl MemoryLevel {
    pub const MIN: MemoryLevel = MemoryLevel(0);
    pub const MAX: MemoryLevel = MemoryLevel(7);

    /// Build a level from any integer, clamping into range.
    pub fn new(level: i64) -> Self {
        MemoryLevel(level.clamp(0, Self::MAX.0 as i64) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Move up by `steps`, saturating at 7.
    pub fn raise(self, steps: u8) -> Self {
        Self::new(self.0 as i64 + steps as i64)
    }

    /// Move down by `steps`, saturating at 0.
    pub fn lower(self, steps: u8) -> Self {
        Self::new(self.0 as i64 - steps as i64)
    }

    pub fn all() -> impl Iterator<Item = MemoryLevel> {
        (0..=Self::MAX.0).map(MemoryLevel)
    }

    pub fn label(self) -> &'static str {
        match self.0 {
            0 => "New",
            1 => "First review",
            2 => "Learning",
            3 => "Basic",
            4 => "Familiar",
            5 => "Good",
            6 => "Mastered",
            _ => "Maintained",
        }
    }
}

impl From<u8> for MemoryLevel {
    fn from(level: u8) -> Self {
        Self::new(level as i64)
    }
}

impl From<MemoryLevel> for u8 {
    fn from(level: MemoryLevel) -> Self {
        level.0
    }
}

impl std::fmt::Display for MemoryLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lowest and highest difficulty score.
pub const MIN_DIFFICULTY: u8 = 1;
pub const MAX_DIFFICULTY: u8 = 10;
/// Difficulty assigned to newly tracked items.
pub const DEFAULT_DIFFICULTY: u8 = 5;

/// Clamp an arbitrary score into the difficulty range.
pub fn clamp_difficulty(score: i64) -> u8 {
    score.clamp(MIN_DIFFICULTY as i64, MAX_DIFFICULTY as i64) as u8
}

/// Per-subject mastery record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryState {
    pub id: String,
    pub subject: SubjectRef,
    pub memory_level: MemoryLevel,
    pub last_review_date: DateTime<Utc>,
    pub next_review_date: DateTime<Utc>,
    pub error_count: u32,
    pub success_streak: u32,
    pub difficulty_score: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MemoryState {
    /// Seed state for an item that just failed a dictation.
    pub fn initial(subject: SubjectRef, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            subject,
            memory_level: MemoryLevel::MIN,
            last_review_date: now,
            next_review_date: now + Duration::days(1),
            error_count: 1,
            success_streak: 0,
            difficulty_score: DEFAULT_DIFFICULTY,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the state is due at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_date <= now
    }

    /// Fractional days past the due date; negative when not yet due.
    pub fn days_overdue(&self, now: DateTime<Utc>) -> f64 {
        (now - self.next_review_date).num_milliseconds() as f64 / DAY_MS as f64
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Vocabulary
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Unit-scoped vocabulary item. Audio bytes are fetched separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyItem {
    pub id: String,
    pub unit_id: String,
    pub kind: LanguageKind,
    pub text: String,
    pub has_audio: bool,
    pub audio_size: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Review-pool entry copied out of a unit when a dictation fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewVocabulary {
    pub id: String,
    pub source_unit_id: String,
    pub source_item_id: String,
    pub text: String,
    pub kind: LanguageKind,
    pub has_audio: bool,
    pub audio_source: AudioSource,
    pub audio_size: u64,
    pub added_at: DateTime<Utc>,
    /// The failed result that put this entry in the pool.
    pub added_from: DictationResult,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReviewVocabulary {
    pub fn subject_ref(&self) -> SubjectRef {
        SubjectRef::ReviewPool(self.id.clone())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dictation
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of one dictation answer, as reported by the dictation feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictationResult {
    /// Id of the unit-scoped vocabulary item.
    pub subject_id: String,
    pub text: String,
    pub kind: LanguageKind,
    pub is_correct: bool,
    pub audio_source: AudioSource,
}

/// Row of the append-only dictation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictationAttempt {
    pub id: String,
    pub session_id: Option<String>,
    pub subject_id: String,
    pub text: String,
    pub kind: LanguageKind,
    pub is_correct: bool,
    pub attempted_at: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Review Sessions
// ─────────────────────────────────────────────────────────────────────────────

/// Which items a session keeps, split at the difficulty midpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyFilter {
    #[default]
    All,
    /// Difficulty up to 5.
    Easy,
    /// Difficulty above 5.
    Hard,
}

impl DifficultyFilter {
    pub const MIDPOINT: f64 = 5.0;

    pub fn accepts(&self, difficulty: f64) -> bool {
        match self {
            DifficultyFilter::All => true,
            DifficultyFilter::Easy => difficulty <= Self::MIDPOINT,
            DifficultyFilter::Hard => difficulty > Self::MIDPOINT,
        }
    }
}

impl std::str::FromStr for DifficultyFilter {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "all" => Ok(DifficultyFilter::All),
            "easy" => Ok(DifficultyFilter::Easy),
            "hard" => Ok(DifficultyFilter::Hard),
            _ => Err(format!("Invalid difficulty filter: {}", s)),
        }
    }
}

/// Review session settings. Missing fields take their defaults when loaded.
///
/// Serialized camelCase; snake_case keys are accepted as well so the
/// `[review]` table of config.toml reads like the rest of the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReviewSettings {
    #[serde(alias = "word_count")]
    pub word_count: usize,
    #[serde(alias = "difficulty_filter")]
    pub difficulty_filter: DifficultyFilter,
    #[serde(alias = "max_daily_reviews")]
    pub max_daily_reviews: usize,
    /// Plays per word.
    #[serde(alias = "play_count")]
    pub play_count: u32,
    /// Seconds between different words.
    #[serde(alias = "interval_secs")]
    pub interval_secs: f64,
    /// Seconds between repeated plays of the same word.
    #[serde(alias = "intra_word_interval_secs")]
    pub intra_word_interval_secs: f64,
    #[serde(alias = "auto_play_audio")]
    pub auto_play_audio: bool,
    #[serde(alias = "show_memory_level")]
    pub show_memory_level: bool,
    #[serde(alias = "show_progress")]
    pub show_progress: bool,
    #[serde(alias = "adaptive_difficulty")]
    pub adaptive_difficulty: bool,
    /// Commit rule name, see `scheduling::commit_policy_for`.
    pub algorithm: String,
    #[serde(alias = "interval_multiplier")]
    pub interval_multiplier: f64,
    #[serde(alias = "forgetting_factor")]
    pub forgetting_factor: f64,
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self {
            word_count: 15,
            difficulty_filter: DifficultyFilter::All,
            max_daily_reviews: 30,
            play_count: 2,
            interval_secs: 3.0,
            intra_word_interval_secs: 1.0,
            auto_play_audio: true,
            show_memory_level: true,
            show_progress: true,
            adaptive_difficulty: true,
            algorithm: "ebbinghaus".to_string(),
            interval_multiplier: 1.0,
            forgetting_factor: 0.5,
        }
    }
}

impl ReviewSettings {
    pub fn validate(&self) -> Result<()> {
        if self.word_count == 0 {
            return Err(Error::validation("word_count must be greater than 0"));
        }
        if self.play_count == 0 {
            return Err(Error::validation("play_count must be greater than 0"));
        }
        let non_negative = |secs: f64| secs.is_finite() && secs >= 0.0;
        if !non_negative(self.interval_secs) || !non_negative(self.intra_word_interval_secs) {
            return Err(Error::validation("audio intervals must be finite and not negative"));
        }
        if !(self.interval_multiplier.is_finite() && self.interval_multiplier > 0.0) {
            return Err(Error::validation("interval_multiplier must be finite and positive"));
        }
        Ok(())
    }
}

/// The thing being reviewed, tagged by where it lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ReviewSubject {
    Pool(ReviewVocabulary),
    Vocabulary(VocabularyItem),
}

impl ReviewSubject {
    pub fn subject_ref(&self) -> SubjectRef {
        match self {
            ReviewSubject::Pool(v) => SubjectRef::ReviewPool(v.id.clone()),
            ReviewSubject::Vocabulary(v) => SubjectRef::Vocabulary(v.id.clone()),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            ReviewSubject::Pool(v) => &v.text,
            ReviewSubject::Vocabulary(v) => &v.text,
        }
    }

    pub fn kind(&self) -> LanguageKind {
        match self {
            ReviewSubject::Pool(v) => v.kind,
            ReviewSubject::Vocabulary(v) => v.kind,
        }
    }

    pub fn has_audio(&self) -> bool {
        match self {
            ReviewSubject::Pool(v) => v.has_audio,
            ReviewSubject::Vocabulary(v) => v.has_audio,
        }
    }
}

/// One ranked entry of a review session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItem {
    pub subject: ReviewSubject,
    /// Snapshot taken when the session was built.
    pub memory_state: Option<MemoryState>,
    pub priority: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Accepting results.
    Open,
    /// Accuracy and duration are final.
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Open => "open",
            SessionStatus::Completed => "completed",
        }
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "open" => Ok(SessionStatus::Open),
            "completed" => Ok(SessionStatus::Completed),
            _ => Err(format!("Invalid session status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSession {
    pub id: String,
    pub items: Vec<ReviewItem>,
    pub settings: ReviewSettings,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub accuracy: Option<f64>,
    pub duration_secs: Option<i64>,
    pub results: Vec<ReviewResult>,
}

impl ReviewSession {
    /// New open session over `items`.
    pub fn open(items: Vec<ReviewItem>, settings: ReviewSettings, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            items,
            settings,
            status: SessionStatus::Open,
            started_at: now,
            completed_at: None,
            accuracy: None,
            duration_secs: None,
            results: Vec::new(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }
}

/// Answer to one item within a review session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResult {
    pub id: String,
    pub session_id: String,
    pub subject: SubjectRef,
    pub text: String,
    pub kind: LanguageKind,
    pub is_correct: bool,
    pub audio_source: AudioSource,
    pub response_time_ms: u64,
    pub state_before: Option<MemoryState>,
    pub state_after: Option<MemoryState>,
}

impl ReviewResult {
    /// Result for `item`; state snapshots are filled in on commit.
    pub fn for_item(
        session_id: &str,
        item: &ReviewItem,
        is_correct: bool,
        audio_source: AudioSource,
        response_time_ms: u64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            subject: item.subject.subject_ref(),
            text: item.subject.text().to_string(),
            kind: item.subject.kind(),
            is_correct,
            audio_source,
            response_time_ms,
            state_before: None,
            state_after: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_level_clamps() {
        assert_eq!(MemoryLevel::new(-3), MemoryLevel::MIN);
        assert_eq!(MemoryLevel::new(42), MemoryLevel::MAX);
        assert_eq!(MemoryLevel::from(9u8).get(), 7);
        assert_eq!(MemoryLevel::new(6).raise(5), MemoryLevel::MAX);
        assert_eq!(MemoryLevel::new(1).lower(3), MemoryLevel::MIN);
        assert_eq!(MemoryLevel::all().count(), 8);
    }

    #[test]
    fn test_memory_level_deserialize_clamps() {
        let level: MemoryLevel = serde_json::from_str("12").unwrap();
        assert_eq!(level, MemoryLevel::MAX);
        assert_eq!(serde_json::to_string(&MemoryLevel::new(3)).unwrap(), "3");
    }

    #[test]
    fn test_initial_state() {
        let now = Utc::now();
        let state = MemoryState::initial(SubjectRef::ReviewPool("rv-1".into()), now);
        assert_eq!(state.memory_level, MemoryLevel::MIN);
        assert_eq!(state.error_count, 1);
        assert_eq!(state.success_streak, 0);
        assert_eq!(state.difficulty_score, 5);
        assert_eq!(state.next_review_date - state.last_review_date, Duration::days(1));
        assert!(!state.is_due(now));
        assert!(state.is_due(now + Duration::days(1)));
    }

    #[test]
    fn test_subject_ref_roundtrip() {
        let subject = SubjectRef::new(SubjectKind::Vocabulary, "v-1");
        assert_eq!(subject.kind(), SubjectKind::Vocabulary);
        assert_eq!(subject.id(), "v-1");
        let json = serde_json::to_string(&subject).unwrap();
        assert_eq!(json, r#"{"kind":"vocabulary","id":"v-1"}"#);
        assert_eq!(serde_json::from_str::<SubjectRef>(&json).unwrap(), subject);
        assert_eq!("review_pool".parse::<SubjectKind>(), Ok(SubjectKind::ReviewPool));
    }

    #[test]
    fn test_difficulty_filter() {
        assert!(DifficultyFilter::All.accepts(9.0));
        assert!(DifficultyFilter::Easy.accepts(5.0));
        assert!(!DifficultyFilter::Easy.accepts(5.5));
        assert!(DifficultyFilter::Hard.accepts(6.0));
        assert!(!DifficultyFilter::Hard.accepts(5.0));
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = ReviewSettings::default();
        assert!(settings.validate().is_ok());

        settings.word_count = 0;
        assert!(matches!(settings.validate(), Err(Error::Validation(_))));

        let settings = ReviewSettings {
            interval_multiplier: 0.0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_settings_reject_nan_and_infinite() {
        let nan_interval = ReviewSettings {
            interval_secs: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(nan_interval.validate(), Err(Error::Validation(_))));

        let nan_gap = ReviewSettings {
            intra_word_interval_secs: f64::NAN,
            ..Default::default()
        };
        assert!(nan_gap.validate().is_err());

        let nan_multiplier = ReviewSettings {
            interval_multiplier: f64::NAN,
            ..Default::default()
        };
        assert!(nan_multiplier.validate().is_err());

        let infinite = ReviewSettings {
            interval_multiplier: f64::INFINITY,
            ..Default::default()
        };
        assert!(infinite.validate().is_err());
    }

    #[test]
    fn test_settings_partial_json_uses_defaults() {
        let settings: ReviewSettings = serde_json::from_str(r#"{"wordCount": 5}"#).unwrap();
        assert_eq!(settings.word_count, 5);
        assert_eq!(settings.play_count, 2);
        assert_eq!(settings.algorithm, "ebbinghaus");
    }

    #[test]
    fn test_clamp_difficulty() {
        assert_eq!(clamp_difficulty(-4), 1);
        assert_eq!(clamp_difficulty(7), 7);
        assert_eq!(clamp_difficulty(15), 10);
    }
}
