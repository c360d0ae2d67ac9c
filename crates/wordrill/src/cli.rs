//! CLI argument definitions using clap derive macros.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Dictation review with spaced repetition
///
/// Words you get wrong in a dictation enter a review pool and come back on
/// an Ebbinghaus schedule until they stick.
#[derive(Parser, Debug)]
#[command(name = "wordrill")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Database file (overrides config and WORDRILL_DATABASE_PATH)
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Units, words and the review pool
    Pool(PoolCommand),

    /// Record dictation results
    Dictation(DictationCommand),

    /// Review sessions (start, complete, recommend)
    Review(ReviewCommand),

    /// Error analysis over the dictation history
    Analyze {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Predict the review schedule of a memory state
    Schedule {
        /// Memory state ID
        state_id: String,

        /// Days to simulate
        #[arg(short, long, default_value = "90")]
        days: u32,
    },

    /// Show review statistics
    Stats {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,

        /// Keep refreshing until interrupted
        #[arg(short, long)]
        watch: bool,
    },

    /// Show version
    Version,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum KindArg {
    English,
    Chinese,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterArg {
    All,
    Easy,
    Hard,
}

// ─────────────────────────────────────────────────────────────────────────────
// Pool Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct PoolCommand {
    #[command(subcommand)]
    pub action: PoolAction,
}

#[derive(Subcommand, Debug)]
pub enum PoolAction {
    /// Create a unit
    AddUnit {
        /// Unit name
        name: String,
    },

    /// Add a word to a unit
    AddWord {
        /// Unit ID
        #[arg(short, long)]
        unit: String,

        /// Word text
        text: String,

        /// Language of the word
        #[arg(short, long, value_enum, default_value = "english")]
        kind: KindArg,

        /// Recorded pronunciation to attach
        #[arg(short, long)]
        audio: Option<PathBuf>,
    },

    /// List units and their words
    Units,

    /// Delete a unit and its words. Review pool entries are kept.
    RemoveUnit {
        /// Unit ID
        id: String,
    },

    /// List the review pool
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Remove a review pool entry
    Remove {
        /// Review vocabulary ID
        id: Option<String>,

        /// Remove every entry
        #[arg(long, conflicts_with = "id")]
        all: bool,
    },

    /// Attach recorded audio to a review pool entry
    Audio {
        /// Review vocabulary ID
        id: String,

        /// Audio file
        file: PathBuf,
    },

    /// Review pool summary
    Stats {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Dictation Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct DictationCommand {
    #[command(subcommand)]
    pub action: DictationAction,
}

#[derive(Subcommand, Debug)]
pub enum DictationAction {
    /// Log a dictation and add the missed words to the review pool
    Record {
        /// Dictation session ID (generated when omitted)
        #[arg(short, long)]
        session: Option<String>,

        /// Vocabulary IDs spelled correctly
        #[arg(short, long, value_delimiter = ',')]
        correct: Vec<String>,

        /// Vocabulary IDs spelled incorrectly
        #[arg(short, long, value_delimiter = ',')]
        incorrect: Vec<String>,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Review Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct ReviewCommand {
    #[command(subcommand)]
    pub action: ReviewAction,
}

#[derive(Subcommand, Debug)]
pub enum ReviewAction {
    /// Start a review session
    Start {
        /// Build from recent dictation errors instead of the review pool
        #[arg(long)]
        from_errors: bool,

        /// Number of words (defaults to saved settings)
        #[arg(short, long)]
        words: Option<usize>,

        /// Difficulty filter for error-driven sessions
        #[arg(short, long, value_enum)]
        filter: Option<FilterArg>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Submit answers and complete a session
    Complete {
        /// Review session ID
        session_id: String,

        /// Subject IDs answered correctly
        #[arg(short, long, value_delimiter = ',')]
        correct: Vec<String>,

        /// Subject IDs answered incorrectly
        #[arg(short, long, value_delimiter = ',')]
        incorrect: Vec<String>,
    },

    /// Show recommended settings for the next session
    Recommend {
        /// Save the recommendation as the new settings
        #[arg(long)]
        save: bool,
    },

    /// List review sessions
    List {
        /// Maximum sessions to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_review_complete() {
        let cli = Cli::try_parse_from([
            "wordrill",
            "review",
            "complete",
            "s1",
            "--correct",
            "a,b",
            "--incorrect",
            "c",
        ])
        .unwrap();

        let Commands::Review(ReviewCommand {
            action:
                ReviewAction::Complete {
                    session_id,
                    correct,
                    incorrect,
                },
        }) = cli.command
        else {
            panic!("expected review complete");
        };
        assert_eq!(session_id, "s1");
        assert_eq!(correct, vec!["a", "b"]);
        assert_eq!(incorrect, vec!["c"]);
    }

    #[test]
    fn test_parse_remove_unit() {
        let cli = Cli::try_parse_from(["wordrill", "pool", "remove-unit", "u1"]).unwrap();
        let Commands::Pool(PoolCommand {
            action: PoolAction::RemoveUnit { id },
        }) = cli.command
        else {
            panic!("expected pool remove-unit");
        };
        assert_eq!(id, "u1");
    }

    #[test]
    fn test_remove_requires_single_target() {
        assert!(Cli::try_parse_from(["wordrill", "pool", "remove", "v1", "--all"]).is_err());
    }
}
