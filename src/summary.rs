//! Sequence summaries

use serde::{Deserialize, Serialize};

use crate::stats::mean;
use crate::types::SyntheticKeyEvent;

/// Aggregate view of a synthesized sequence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SequenceSummary {
    pub events: usize,
    /// Release time of the last key, ms
    pub total_ms: f64,
    pub mean_delay_ms: f64,
    pub mean_duration_ms: f64,
    /// Keys per minute over the span from the first to the last key press.
    /// Zero for sequences shorter than two keys.
    pub chars_per_minute: f64,
}

impl SequenceSummary {
    /// Summarize a sequence, `None` if it is empty
    pub fn from_events(events: &[SyntheticKeyEvent]) -> Option<Self> {
        let first = events.first()?;
        let last = events.last()?;

        let delays: Vec<f64> = events.iter().map(|e| e.delay).collect();
        let durations: Vec<f64> = events.iter().map(|e| e.duration).collect();

        let span_ms = last.press_time - first.press_time;
        let chars_per_minute = if events.len() > 1 && span_ms > 0.0 {
            (events.len() - 1) as f64 / (span_ms / 60_000.0)
        } else {
            0.0
        };

        Some(Self {
            events: events.len(),
            total_ms: last.release_time,
            mean_delay_ms: mean(&delays)?,
            mean_duration_ms: mean(&durations)?,
            chars_per_minute,
        })
    }
}
