//! Review statistics dashboard.
//!
//! With `--watch` the dashboard redraws on every auto-refresh snapshot until
//! interrupted.

use anyhow::Result;
use colored::Colorize;
use std::time::Duration;
use wordrill_core::ReviewService;
use wordrill_core::stats::{AutoRefresh, ReviewStatistics};
use wordrill_core::types::MemoryLevel;

use super::percent;

pub async fn execute(json: bool, watch: bool, service: &ReviewService) -> Result<()> {
    if !watch {
        return render(&service.get_statistics()?, json, false);
    }

    let refresh = service.auto_refresh().unwrap_or_else(|| {
        AutoRefresh::spawn(
            service.statistics().clone(),
            Duration::from_secs(service.config().dashboard.refresh_interval_secs),
        )
    });
    let mut receiver = refresh.subscribe();
    render(&refresh.latest(), json, true)?;

    loop {
        tokio::select! {
            changed = receiver.changed() => {
                if changed.is_err() {
                    break;
                }
                let stats = receiver.borrow_and_update().clone();
                render(&stats, json, true)?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("Interrupted, stopping dashboard");
                break;
            }
        }
    }

    refresh.stop();
    Ok(())
}

fn render(stats: &ReviewStatistics, json: bool, redraw: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(stats)?);
        return Ok(());
    }
    if redraw {
        // Clear screen and move home.
        print!("\x1B[2J\x1B[H");
    }
    print_dashboard(stats);
    Ok(())
}

fn print_dashboard(stats: &ReviewStatistics) {
    println!("{}", "Review statistics".bold());
    println!(
        "  Sessions:     {} ({} completed, {} today)",
        stats.total_sessions.to_string().bold(),
        stats.completed_sessions,
        stats.today_sessions
    );
    println!("  Reviews:      {}", stats.total_reviews);
    println!("  Accuracy:     {}", percent(stats.average_accuracy));
    println!("  Streak:       {} days", stats.streak_days.to_string().cyan());
    println!(
        "  Overdue:      {}",
        if stats.overdue_count > 0 {
            stats.overdue_count.to_string().red()
        } else {
            "0".green()
        }
    );
    println!("  Mastered:     {}", stats.mastered_count.to_string().green());
    println!("  Progress:     {:.1}%", stats.learning_progress);
    println!(
        "  Average:      level {:.1}, difficulty {:.1}",
        stats.efficiency.average_level, stats.efficiency.average_difficulty
    );

    println!("\n{}", "Memory levels".bold());
    let widest = stats.level_distribution.iter().copied().max().unwrap_or(0).max(1);
    for level in MemoryLevel::all() {
        let count = stats.level_distribution[level.index()];
        let bar = "█".repeat((count as usize * 30).div_ceil(widest as usize));
        println!("  {} {:<11} {:>4} {}", level.get(), level.label(), count, bar);
    }
}
