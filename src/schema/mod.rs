//! Exchange formats
//!
//! This module defines the two documents crossing the crate boundary: the
//! canonical keystroke table coming from the ingestion pipeline and the
//! persisted cohort model document read back by the synthesizer.

mod model;
mod table;

pub use model::*;
pub use table::*;
