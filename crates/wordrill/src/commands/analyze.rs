//! Error analysis command.

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use wordrill_core::ReviewService;
use wordrill_core::analysis::WordAnalysis;

use super::{kind_display, percent};

pub fn execute(json: bool, service: &ReviewService) -> Result<()> {
    let now = Utc::now();
    let analysis = service.analyzer().analyze(now)?;
    let summary = service.analyzer().error_summary(now)?;

    if json {
        let output = serde_json::json!({
            "analysis": analysis,
            "summary": summary,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", "Dictation errors".bold());
    println!("  Words practiced:   {}", analysis.total_words);
    println!("  Words with errors: {}", analysis.words_with_errors);
    println!("  Total errors:      {}", analysis.total_errors);
    println!("  Accuracy:          {}", percent(analysis.average_accuracy));
    println!("  Dictations:        {}", summary.total_dictations);
    if !summary.accuracy_trend.is_empty() {
        let trend: Vec<String> = summary.accuracy_trend.iter().map(|a| percent(*a)).collect();
        println!("  Trend:             {}", trend.join(" → "));
    }

    println!("\n{}", "Error rate distribution".bold());
    for bucket in &analysis.error_distribution {
        println!("  {:>7}  {}", bucket.label, "█".repeat(bucket.count));
    }

    print_words("Most problematic", &analysis.most_problematic);
    print_words("Wrong in the last 7 days", &analysis.recently_wrong);

    println!(
        "\n{} words recommended for review. Start with: wordrill review start --from-errors",
        summary.recommended_review_count.to_string().cyan()
    );
    Ok(())
}

fn print_words(title: &str, words: &[WordAnalysis]) {
    if words.is_empty() {
        return;
    }
    println!("\n{}", title.bold());
    for word in words.iter().take(10) {
        println!(
            "  {:<20} [{}] {} errors / {} attempts  difficulty {:.1}",
            word.vocabulary.text,
            kind_display(word.vocabulary.kind),
            word.performance.error_count.to_string().red(),
            word.performance.total_attempts,
            word.difficulty
        );
    }
}
