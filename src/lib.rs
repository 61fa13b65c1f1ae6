//! Keystroke Flux - cohort keystroke timing models and synthetic typing
//!
//! Flux turns a canonical table of recorded keystrokes from Parkinson's-disease
//! and control subjects into a layered timing model per cohort, then uses that
//! model to synthesize plausible keystroke timelines for arbitrary text:
//! keystroke table → aggregation → model document → synthesis → key events.
//!
//! ## Modules
//!
//! - **Aggregation**: overall, category and per-key statistics per cohort
//! - **Synthesis**: tier fallback resolution and clamped normal sampling

pub mod aggregator;
pub mod categories;
pub mod compare;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod resolver;
pub mod schema;
pub mod stats;
pub mod summary;
pub mod synthesizer;
pub mod types;

pub use aggregator::Aggregator;
pub use config::{CohortParams, SynthesisConfig};
pub use error::SimError;
pub use pipeline::{aggregate_to_json, TableFormat, TypingSimulator, DEFAULT_PROMPTS};
pub use synthesizer::{synthesize, tokenize, Synthesizer};
pub use types::{
    Cohort, CohortModels, KeystrokeObservation, StatisticalModel, SyntheticKeyEvent,
};

/// Flux version
pub const FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "keystroke-flux";
