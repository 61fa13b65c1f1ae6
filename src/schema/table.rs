//! Canonical keystroke table parsing and validation
//!
//! The table arrives as a JSON array or as NDJSON, one observation per line.
//! The aggregator trusts the ingestion pipeline's invariants; validation here
//! is a boundary tool for checking an export before aggregating it.

use std::collections::HashMap;

use crate::error::SimError;
use crate::types::KeystrokeObservation;

/// Parser and validator for the canonical keystroke table
pub struct ObservationTable;

impl ObservationTable {
    /// Parse a JSON string containing an array of observations
    pub fn parse_array(json: &str) -> Result<Vec<KeystrokeObservation>, SimError> {
        let rows: Vec<KeystrokeObservation> = serde_json::from_str(json)?;
        Ok(rows)
    }

    /// Parse NDJSON (newline-delimited JSON) containing observations
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<KeystrokeObservation>, SimError> {
        let mut rows = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<KeystrokeObservation>(trimmed) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    return Err(SimError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(rows)
    }

    /// Report every row that breaks an ingestion-side invariant
    pub fn validate_rows(rows: &[KeystrokeObservation]) -> Vec<RowIssue> {
        let mut issues = Vec::new();
        let mut speeds: HashMap<&str, f64> = HashMap::new();

        for (index, row) in rows.iter().enumerate() {
            let mut report = |issue: ObservationIssue| {
                issues.push(RowIssue {
                    index,
                    subject_id: row.subject_id.clone(),
                    issue,
                })
            };

            if row.key.trim().is_empty() {
                report(ObservationIssue::EmptyKey);
            }
            if !row.delay.is_finite() || row.delay <= 0.0 {
                report(ObservationIssue::NonPositiveDelay(row.delay));
            }
            if !row.duration.is_finite() || row.duration <= 0.0 {
                report(ObservationIssue::NonPositiveDuration(row.duration));
            }
            if !row.typing_speed.is_finite() {
                report(ObservationIssue::InvalidTypingSpeed(row.typing_speed));
                continue;
            }

            let first = *speeds
                .entry(row.subject_id.as_str())
                .or_insert(row.typing_speed);
            if first != row.typing_speed {
                report(ObservationIssue::InconsistentTypingSpeed {
                    first,
                    found: row.typing_speed,
                });
            }
        }

        issues
    }
}

/// A single invariant violation in the keystroke table
#[derive(Debug, Clone, PartialEq)]
pub struct RowIssue {
    /// Zero-based row index
    pub index: usize,
    pub subject_id: String,
    pub issue: ObservationIssue,
}

/// Ingestion-side invariants a row can break
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ObservationIssue {
    #[error("Key label is empty")]
    EmptyKey,

    #[error("Delay must be positive, got {0}")]
    NonPositiveDelay(f64),

    #[error("Duration must be positive, got {0}")]
    NonPositiveDuration(f64),

    #[error("Typing speed must be finite, got {0}")]
    InvalidTypingSpeed(f64),

    #[error("Typing speed differs within subject: first {first}, found {found}")]
    InconsistentTypingSpeed { first: f64, found: f64 },
}
