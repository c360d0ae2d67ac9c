//! Command implementations for the wordrill CLI.
//!
//! Each submodule implements the logic for a command group.

pub mod analyze;
pub mod dictation;
pub mod pool;
pub mod review;
pub mod schedule;
pub mod stats;

use colored::{ColoredString, Colorize};
use wordrill_core::types::{LanguageKind, MemoryLevel};

/// Colored level label, e.g. `3 Basic`.
pub(crate) fn level_display(level: MemoryLevel) -> ColoredString {
    let text = format!("{} {}", level.get(), level.label());
    match level.get() {
        0..=1 => text.red(),
        2..=4 => text.yellow(),
        _ => text.green(),
    }
}

pub(crate) fn kind_display(kind: LanguageKind) -> &'static str {
    match kind {
        LanguageKind::Chinese => "zh",
        LanguageKind::English => "en",
    }
}

pub(crate) fn percent(ratio: f64) -> String {
    format!("{:.0}%", ratio * 100.0)
}
