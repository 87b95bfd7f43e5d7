//! # nb-report
//!
//! Aggregation over a completed (or partial) run log.
//!
//! Everything here is derived: summaries are recomputed from the log on
//! demand and never edited by hand. A notation with no trials for a task is
//! reported as `no data`, which is distinct from a score of zero.

pub mod sizes;
pub mod summary;

pub use sizes::{SizeComparison, SizeRow};
pub use summary::{
    summarize, write_summary, Cell, NotationSummary, ReportError, RunSummary, ScoreMatrix,
};

/// Rendering for values that have no samples.
pub const NO_DATA: &str = "no data";
