//! Review session commands.

use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use colored::Colorize;
use wordrill_core::ReviewService;
use wordrill_core::types::{
    AudioSource, DifficultyFilter, ReviewItem, ReviewResult, ReviewSession, ReviewSettings,
};

use super::{kind_display, level_display, percent};
use crate::cli::{FilterArg, ReviewAction, ReviewCommand};

/// Execute review command.
pub fn execute(cmd: ReviewCommand, service: &ReviewService) -> Result<()> {
    match cmd.action {
        ReviewAction::Start {
            from_errors,
            words,
            filter,
            json,
        } => start(from_errors, words, filter, json, service),
        ReviewAction::Complete {
            session_id,
            correct,
            incorrect,
        } => complete(&session_id, &correct, &incorrect, service),
        ReviewAction::Recommend { save } => recommend(save, service),
        ReviewAction::List { limit } => list(limit, service),
    }
}

fn start(
    from_errors: bool,
    words: Option<usize>,
    filter: Option<FilterArg>,
    json: bool,
    service: &ReviewService,
) -> Result<()> {
    let mut settings = service.review_settings()?;
    if let Some(words) = words {
        settings.word_count = words;
    }
    if let Some(filter) = filter {
        settings.difficulty_filter = match filter {
            FilterArg::All => DifficultyFilter::All,
            FilterArg::Easy => DifficultyFilter::Easy,
            FilterArg::Hard => DifficultyFilter::Hard,
        };
    }

    let session = if from_errors {
        service.generate_error_review_session(Some(&settings))
    } else {
        service.generate_review_session(Some(&settings))
    }
    .context("Failed to start review session")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&session)?);
        return Ok(());
    }

    println!(
        "{} Review session {} with {} words",
        "✓".green(),
        session.id.cyan(),
        session.items.len()
    );
    print_items(&session.items, &settings);
    println!();
    println!(
        "Submit with: wordrill review complete {} --correct <ids> --incorrect <ids>",
        session.id
    );
    Ok(())
}

fn print_items(items: &[ReviewItem], settings: &ReviewSettings) {
    for (i, item) in items.iter().enumerate() {
        let subject = item.subject.subject_ref();
        let level = match (&item.memory_state, settings.show_memory_level) {
            (Some(state), true) => level_display(state.memory_level).to_string(),
            _ => String::new(),
        };
        println!(
            "  {:>2}. {:<20} [{}] {:<16} {}",
            i + 1,
            item.subject.text().bold(),
            kind_display(item.subject.kind()),
            level,
            subject.id().dimmed()
        );
    }
}

fn complete(
    session_id: &str,
    correct: &[String],
    incorrect: &[String],
    service: &ReviewService,
) -> Result<()> {
    let Some(session) = service.review_session(session_id)? else {
        bail!("Review session not found: {}", session_id);
    };
    let results = answers(&session, correct, incorrect)?;

    let completed = service.complete_review_session(session_id, results)?;
    let summary = service.lifecycle().summary(&completed.session);

    println!(
        "{} Completed {}: {}/{} correct ({})",
        "✓".green(),
        session_id.cyan(),
        summary.correct,
        completed.session.results.len(),
        percent(summary.accuracy)
    );
    println!(
        "  New: {}  Strengthened: {}  Duration: {}s",
        summary.new_items, summary.strengthened_items, summary.duration_secs
    );
    for change in &summary.level_changes {
        let arrow = if change.after > change.before {
            "↑".green()
        } else if change.after < change.before {
            "↓".red()
        } else {
            "=".normal()
        };
        println!(
            "  {} {:<20} {} → {}",
            arrow,
            change.text,
            level_display(change.before),
            level_display(change.after)
        );
    }
    Ok(())
}

/// Results for the answered items, in session order.
fn answers(
    session: &ReviewSession,
    correct: &[String],
    incorrect: &[String],
) -> Result<Vec<ReviewResult>> {
    let mut outcome: HashMap<&str, bool> = HashMap::new();
    for id in correct {
        outcome.insert(id.as_str(), true);
    }
    for id in incorrect {
        if outcome.insert(id.as_str(), false).is_some() {
            bail!("{} is listed as both correct and incorrect", id);
        }
    }

    let mut results = Vec::with_capacity(outcome.len());
    for item in &session.items {
        let subject = item.subject.subject_ref();
        if let Some(is_correct) = outcome.remove(subject.id()) {
            let audio_source = if item.subject.has_audio() {
                AudioSource::Recorded
            } else {
                AudioSource::Tts
            };
            results.push(ReviewResult::for_item(
                &session.id,
                item,
                is_correct,
                audio_source,
                0,
            ));
        }
    }

    if let Some(unknown) = outcome.keys().next() {
        bail!("{} is not part of session {}", unknown, session.id);
    }
    Ok(results)
}

fn recommend(save: bool, service: &ReviewService) -> Result<()> {
    let current = service.review_settings()?;
    let recommended = service.recommended_settings()?;

    println!(
        "  Words per session: {} → {}",
        current.word_count,
        recommended.word_count.to_string().bold()
    );
    println!(
        "  Difficulty filter: {:?} → {}",
        current.difficulty_filter,
        format!("{:?}", recommended.difficulty_filter).bold()
    );

    if save {
        service.save_review_settings(&recommended)?;
        println!("{} Saved recommended settings", "✓".green());
    }
    Ok(())
}

fn list(limit: usize, service: &ReviewService) -> Result<()> {
    let sessions = service.review_sessions()?;
    if sessions.is_empty() {
        println!("No review sessions yet.");
        return Ok(());
    }

    for session in sessions.into_iter().take(limit) {
        let status = if session.is_completed() {
            format!("completed {}", percent(session.accuracy.unwrap_or(0.0))).green()
        } else {
            "open".yellow()
        };
        println!(
            "  {}  {}  {:>2} words  {}",
            session.started_at.format("%Y-%m-%d %H:%M"),
            session.id.cyan(),
            session.items.len(),
            status
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wordrill_core::types::{LanguageKind, ReviewSubject, VocabularyItem};

    fn session(ids: &[&str]) -> ReviewSession {
        let now = Utc::now();
        let items = ids
            .iter()
            .map(|id| ReviewItem {
                subject: ReviewSubject::Vocabulary(VocabularyItem {
                    id: id.to_string(),
                    unit_id: "u1".into(),
                    kind: LanguageKind::English,
                    text: format!("word-{}", id),
                    has_audio: false,
                    audio_size: 0,
                    created_at: now,
                    updated_at: now,
                }),
                memory_state: None,
                priority: 0.0,
            })
            .collect();
        ReviewSession::open(items, ReviewSettings::default(), now)
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_answers_follow_session_order() {
        let session = session(&["a", "b", "c"]);
        let results = answers(&session, &ids(&["c", "a"]), &ids(&["b"])).unwrap();

        let outcome: Vec<_> = results
            .iter()
            .map(|r| (r.subject.id().to_string(), r.is_correct))
            .collect();
        assert_eq!(
            outcome,
            vec![
                ("a".to_string(), true),
                ("b".to_string(), false),
                ("c".to_string(), true)
            ]
        );
        assert!(results.iter().all(|r| r.session_id == session.id));
    }

    #[test]
    fn test_answers_reject_unknown_and_conflicting_ids() {
        let session = session(&["a"]);
        assert!(answers(&session, &ids(&["z"]), &[]).is_err());
        assert!(answers(&session, &ids(&["a"]), &ids(&["a"])).is_err());
    }

    #[test]
    fn test_unanswered_items_are_left_out() {
        let session = session(&["a", "b"]);
        let results = answers(&session, &ids(&["b"]), &[]).unwrap();
        assert_eq!(results.len(), 1);
    }
}
