//! Error types for wordrill-core.

use thiserror::Error;

/// Result type alias using wordrill-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for review scheduling operations
#[derive(Error, Debug)]
pub enum Error {
    // Persistence errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Lookup errors
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Review session not found: {0}")]
    SessionNotFound(String),

    // Session assembly errors
    #[error(
        "No vocabulary to review. Words that fail a dictation are added to the review pool automatically."
    )]
    NoReviewableVocabulary,

    #[error("No valid review items: none of the {candidates} candidates resolved to vocabulary")]
    NoValidReviewItems { candidates: usize },

    // Input errors
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a not found error
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Check if this error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::SessionNotFound(_))
    }

    /// Check if the underlying store failed
    pub fn is_persistence_failure(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::LockPoisoned | Self::Serialization(_) | Self::Io(_)
        )
    }
}
