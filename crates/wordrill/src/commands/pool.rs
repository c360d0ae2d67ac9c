//! Unit, word and review pool commands.

use anyhow::{Context, Result, bail};
use chrono::Utc;
use colored::Colorize;
use wordrill_core::ReviewService;
use wordrill_core::types::LanguageKind;

use super::{kind_display, level_display};
use crate::cli::{KindArg, PoolAction, PoolCommand};

/// Execute pool command.
pub fn execute(cmd: PoolCommand, service: &ReviewService) -> Result<()> {
    match cmd.action {
        PoolAction::AddUnit { name } => add_unit(&name, service),
        PoolAction::AddWord {
            unit,
            text,
            kind,
            audio,
        } => add_word(&unit, &text, kind, audio.as_deref(), service),
        PoolAction::Units => units(service),
        PoolAction::RemoveUnit { id } => remove_unit(&id, service),
        PoolAction::List { json } => list(json, service),
        PoolAction::Remove { id, all } => remove(id.as_deref(), all, service),
        PoolAction::Audio { id, file } => set_audio(&id, &file, service),
        PoolAction::Stats { json } => stats(json, service),
    }
}

fn add_unit(name: &str, service: &ReviewService) -> Result<()> {
    let unit = service.database().create_unit(name)?;
    println!("{} Created unit {} ({})", "✓".green(), unit.name.bold(), unit.id);
    Ok(())
}

fn add_word(
    unit_id: &str,
    text: &str,
    kind: KindArg,
    audio: Option<&std::path::Path>,
    service: &ReviewService,
) -> Result<()> {
    let kind = match kind {
        KindArg::English => LanguageKind::English,
        KindArg::Chinese => LanguageKind::Chinese,
    };
    let bytes = match audio {
        Some(path) => Some(
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?,
        ),
        None => None,
    };

    let item = service
        .database()
        .create_vocabulary_item(unit_id, kind, text, bytes.as_deref())?;
    println!(
        "{} Added {} [{}] {}",
        "✓".green(),
        item.text.bold(),
        kind_display(item.kind),
        item.id.dimmed()
    );
    Ok(())
}

fn units(service: &ReviewService) -> Result<()> {
    let db = service.database();
    let units = db.list_units()?;
    if units.is_empty() {
        println!("No units yet. Create one with `wordrill pool add-unit <name>`.");
        return Ok(());
    }

    for unit in units {
        let items = db.list_vocabulary_items(&unit.id)?;
        println!("{} {} ({} words)", unit.name.bold(), unit.id.dimmed(), items.len());
        for item in items {
            let audio = if item.has_audio { " ♪" } else { "" };
            println!(
                "  {} [{}]{} {}",
                item.text,
                kind_display(item.kind),
                audio,
                item.id.dimmed()
            );
        }
    }
    Ok(())
}

fn remove_unit(id: &str, service: &ReviewService) -> Result<()> {
    if !service.database().delete_unit(id)? {
        bail!("Unit not found: {}", id);
    }
    println!("{} Deleted unit {}", "✓".green(), id);
    Ok(())
}

fn list(json: bool, service: &ReviewService) -> Result<()> {
    let registry = service.registry();
    let entries = registry.list()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("Review pool is empty.");
        return Ok(());
    }

    println!("{} {} words in review pool:", "✓".green(), entries.len());
    let now = Utc::now();
    for entry in entries {
        let state = registry.memory_state(&entry.id)?;
        let level = state
            .as_ref()
            .map(|s| level_display(s.memory_level).to_string())
            .unwrap_or_else(|| "-".to_string());
        let due = match &state {
            Some(s) if s.is_due(now) => "due".red().to_string(),
            Some(s) => s.next_review_date.format("%Y-%m-%d").to_string(),
            None => String::new(),
        };
        println!(
            "  {:<20} [{}] {:<16} {}  {}",
            entry.text,
            kind_display(entry.kind),
            level,
            due,
            entry.id.dimmed()
        );
    }
    Ok(())
}

fn remove(id: Option<&str>, all: bool, service: &ReviewService) -> Result<()> {
    let registry = service.registry();
    if all {
        let count = registry.clear()?;
        println!("{} Cleared {} entries from review pool", "✓".green(), count);
        return Ok(());
    }

    let Some(id) = id else {
        bail!("Specify an entry ID or --all");
    };
    if registry.remove(id)? {
        println!("{} Removed {}", "✓".green(), id);
    } else {
        bail!("Review pool entry not found: {}", id);
    }
    Ok(())
}

fn set_audio(id: &str, file: &std::path::Path, service: &ReviewService) -> Result<()> {
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    if !service.registry().set_audio(id, &bytes)? {
        bail!("Review pool entry not found: {}", id);
    }
    println!("{} Attached {} bytes of audio to {}", "✓".green(), bytes.len(), id);
    Ok(())
}

fn stats(json: bool, service: &ReviewService) -> Result<()> {
    let stats = service.registry().stats(Utc::now())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("  Total entries:  {}", stats.total.to_string().bold());
    println!("    English:      {}", stats.english);
    println!("    Chinese:      {}", stats.chinese);
    println!("    With audio:   {}", stats.with_audio);
    println!("    TTS only:     {}", stats.without_audio);
    println!("  Added (7 days): {}", stats.recently_added.to_string().cyan());
    Ok(())
}
