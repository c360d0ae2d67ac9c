//! Dictation commands.
//!
//! Results are logged to the attempt history that drives error analysis;
//! every missed word is added to the review pool.

use anyhow::{Result, bail};
use colored::Colorize;
use wordrill_core::ReviewService;
use wordrill_core::store::VocabularySource;
use wordrill_core::types::{AudioSource, DictationResult};

use crate::cli::{DictationAction, DictationCommand};

/// Execute dictation command.
pub fn execute(cmd: DictationCommand, service: &ReviewService) -> Result<()> {
    match cmd.action {
        DictationAction::Record {
            session,
            correct,
            incorrect,
        } => record(session, &correct, &incorrect, service),
    }
}

fn record(
    session: Option<String>,
    correct: &[String],
    incorrect: &[String],
    service: &ReviewService,
) -> Result<()> {
    if correct.is_empty() && incorrect.is_empty() {
        bail!("Nothing to record. Pass --correct and/or --incorrect vocabulary IDs.");
    }

    let mut results = Vec::with_capacity(correct.len() + incorrect.len());
    for (ids, is_correct) in [(correct, true), (incorrect, false)] {
        for id in ids {
            results.push(dictation_result(id, is_correct, service)?);
        }
    }

    let session_id =
        session.unwrap_or_else(|| format!("dictation-{}", chrono::Utc::now().timestamp()));
    let registered = service.record_dictation(Some(&session_id), &results)?;

    println!(
        "{} Recorded {} answers ({} correct) in {}",
        "✓".green(),
        results.len(),
        correct.len(),
        session_id.cyan()
    );
    for vocabulary in &registered {
        println!("  {} {} in review pool", "+".yellow(), vocabulary.text.bold());
    }
    Ok(())
}

fn dictation_result(id: &str, is_correct: bool, service: &ReviewService) -> Result<DictationResult> {
    let Some(item) = service.database().vocabulary_item(id)? else {
        bail!("Vocabulary item not found: {}", id);
    };
    Ok(DictationResult {
        subject_id: item.id,
        text: item.text,
        kind: item.kind,
        is_correct,
        audio_source: if item.has_audio {
            AudioSource::Recorded
        } else {
            AudioSource::Tts
        },
    })
}
