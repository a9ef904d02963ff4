use crate::models::CompletionRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    pub sessions_count: u32,
    pub total_seconds: u64,
    pub total_steps: u64,
}

/// Aggregates completion records loaded from the history store.
pub fn calculate_history_stats(records: &[CompletionRecord]) -> HistoryStats {
    let sessions_count = records.len().try_into().unwrap_or(u32::MAX);
    let mut stats = HistoryStats {
        sessions_count,
        ..HistoryStats::default()
    };

    for record in records {
        stats.total_seconds = stats.total_seconds.saturating_add(record.duration_seconds);
        stats.total_steps = stats
            .total_steps
            .saturating_add(record.step_count.try_into().unwrap_or(u64::MAX));
    }

    stats
}
