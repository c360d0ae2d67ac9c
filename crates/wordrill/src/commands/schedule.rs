//! Schedule prediction command.

use anyhow::{Result, bail};
use chrono::Utc;
use colored::Colorize;
use wordrill_core::ReviewService;
use wordrill_core::scheduling::{
    estimated_next_review_date, memory_strength, predict_schedule, review_priority,
};
use wordrill_core::store::MemoryStateStore;

use super::level_display;

pub fn execute(state_id: &str, days: u32, service: &ReviewService) -> Result<()> {
    let Some(state) = service.database().get_state(state_id)? else {
        bail!("Memory state not found: {}", state_id);
    };
    let now = Utc::now();

    println!("{} {}", "Memory state".bold(), state.id.dimmed());
    println!("  Subject:     {}", state.subject);
    println!("  Level:       {}", level_display(state.memory_level));
    println!("  Strength:    {}%", memory_strength(state.memory_level));
    println!("  Difficulty:  {}/10", state.difficulty_score);
    println!(
        "  Errors:      {}  Streak: {}",
        state.error_count, state.success_streak
    );
    println!("  Priority:    {:.1}", review_priority(&state, now));

    let due = if state.is_due(now) {
        "now".red().to_string()
    } else {
        state.next_review_date.format("%Y-%m-%d %H:%M").to_string()
    };
    println!("  Next review: {}", due);
    let estimate = estimated_next_review_date(&state, now, &mut rand::thread_rng());
    println!("  Estimated:   {}", estimate.format("%Y-%m-%d"));

    let schedule = predict_schedule(&state, days, now);
    if schedule.is_empty() {
        println!("\nNo reviews in the next {} days.", days);
        return Ok(());
    }

    println!("\n{} (perfect recall, {} days)", "Predicted reviews".bold(), days);
    for review in schedule {
        println!(
            "  {}  {:<16}  then {} days",
            review.date.format("%Y-%m-%d"),
            level_display(review.memory_level).to_string(),
            review.interval_days
        );
    }
    Ok(())
}
