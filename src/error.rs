//! Error types for Keystroke Flux

use thiserror::Error;

use crate::types::{Cohort, Metric};

/// Errors that can occur during aggregation, model loading or synthesis
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Failed to parse keystroke table: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Model document violates schema: {0}")]
    SchemaViolation(String),

    #[error("No data for cohort: {0}")]
    NoCohortData(Cohort),

    #[error("No statistics available for key '{key}' ({metric})")]
    NoStatistics { key: String, metric: Metric },

    #[error("Invalid sampling distribution: {0}")]
    InvalidDistribution(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
