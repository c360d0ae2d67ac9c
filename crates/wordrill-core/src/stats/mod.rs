//! Review statistics for dashboards.
//!
//! [`StatisticsAggregator`] computes a read-only snapshot on demand;
//! [`AutoRefresh`] republishes it periodically on a watch channel.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::{Duration, interval};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::scheduling::{LearningEfficiency, learning_efficiency};
use crate::store::{MemoryStateStore, ReviewSessionStore};
use crate::types::MemoryLevel;

/// Level from which an item counts toward `mastered_count`.
pub const MASTERED_LEVEL: u8 = 5;
/// Longest streak reported, in days.
pub const MAX_STREAK_DAYS: u32 = 30;

/// Aggregate snapshot over every session and memory state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStatistics {
    pub total_sessions: usize,
    pub completed_sessions: usize,
    /// Items across all sessions.
    pub total_reviews: usize,
    /// Mean accuracy of completed sessions, two decimals.
    pub average_accuracy: f64,
    /// Memory states per level, index 0 to 7.
    pub level_distribution: [u32; 8],
    pub overdue_count: usize,
    /// Sessions started on the current UTC day.
    pub today_sessions: usize,
    /// Consecutive UTC days with a session, counting back from today.
    pub streak_days: u32,
    pub mastered_count: usize,
    /// Sum of levels over the maximum reachable, in percent.
    pub learning_progress: f64,
    pub efficiency: LearningEfficiency,
}

pub struct StatisticsAggregator {
    states: Arc<dyn MemoryStateStore>,
    sessions: Arc<dyn ReviewSessionStore>,
}

impl StatisticsAggregator {
    pub fn new(states: Arc<dyn MemoryStateStore>, sessions: Arc<dyn ReviewSessionStore>) -> Self {
        Self { states, sessions }
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> Result<ReviewStatistics> {
        let sessions = self.sessions.list_sessions()?;
        let states = self.states.all_states()?;

        let accuracies: Vec<f64> = sessions
            .iter()
            .filter(|s| s.is_completed())
            .map(|s| s.accuracy.unwrap_or(0.0))
            .collect();
        let average_accuracy = if accuracies.is_empty() {
            0.0
        } else {
            round_to(accuracies.iter().sum::<f64>() / accuracies.len() as f64, 100.0)
        };

        let mut level_distribution = [0u32; 8];
        for state in &states {
            level_distribution[state.memory_level.index()] += 1;
        }

        let level_sum: u32 = states.iter().map(|s| s.memory_level.get() as u32).sum();
        let learning_progress = if states.is_empty() {
            0.0
        } else {
            let max = (states.len() * MemoryLevel::MAX.get() as usize) as f64;
            round_to(level_sum as f64 / max * 100.0, 10.0)
        };

        let today = now.date_naive();
        let active_days: HashSet<NaiveDate> =
            sessions.iter().map(|s| s.started_at.date_naive()).collect();

        Ok(ReviewStatistics {
            total_sessions: sessions.len(),
            completed_sessions: accuracies.len(),
            total_reviews: sessions.iter().map(|s| s.items.len()).sum(),
            average_accuracy,
            level_distribution,
            overdue_count: states.iter().filter(|s| s.is_due(now)).count(),
            today_sessions: sessions
                .iter()
                .filter(|s| s.started_at.date_naive() == today)
                .count(),
            streak_days: streak_days(&active_days, today),
            mastered_count: states
                .iter()
                .filter(|s| s.memory_level.get() >= MASTERED_LEVEL)
                .count(),
            learning_progress,
            efficiency: learning_efficiency(&states, now),
        })
    }
}

fn streak_days(active_days: &HashSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut streak = 0;
    let mut day = today;
    while streak < MAX_STREAK_DAYS && active_days.contains(&day) {
        streak += 1;
        let Some(previous) = day.pred_opt() else {
            break;
        };
        day = previous;
    }
    streak
}

fn round_to(value: f64, scale: f64) -> f64 {
    (value * scale).round() / scale
}

// ─────────────────────────────────────────────────────────────────────────────
// Auto Refresh
// ─────────────────────────────────────────────────────────────────────────────

/// Background task that republishes statistics every `period`.
///
/// Must be spawned inside a tokio runtime. The task stops on [`stop`](Self::stop)
/// or when the handle is dropped.
pub struct AutoRefresh {
    receiver: watch::Receiver<ReviewStatistics>,
    abort_handle: tokio::task::AbortHandle,
}

impl AutoRefresh {
    pub fn spawn(aggregator: Arc<StatisticsAggregator>, period: Duration) -> Self {
        let initial = aggregator.snapshot(Utc::now()).unwrap_or_else(|e| {
            warn!(error = %e, "Initial statistics snapshot failed");
            ReviewStatistics::default()
        });
        let (sender, receiver) = watch::channel(initial);

        info!(interval_ms = period.as_millis() as u64, "Starting statistics auto-refresh");

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period.max(Duration::from_millis(1)));
            // The first tick completes immediately and the initial snapshot is already published.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match aggregator.snapshot(Utc::now()) {
                    Ok(stats) => {
                        if sender.send(stats).is_err() {
                            debug!("Statistics receivers dropped, stopping auto-refresh");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Statistics refresh failed, keeping previous snapshot");
                    }
                }
            }
        });

        Self {
            receiver,
            abort_handle: handle.abort_handle(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ReviewStatistics> {
        self.receiver.clone()
    }

    /// Most recently published snapshot.
    pub fn latest(&self) -> ReviewStatistics {
        self.receiver.borrow().clone()
    }

    pub fn stop(&self) {
        self.abort_handle.abort();
    }

    pub fn is_stopped(&self) -> bool {
        self.abort_handle.is_finished()
    }
}

impl Drop for AutoRefresh {
    fn drop(&mut self) {
        self.abort_handle.abort();
    }
}
