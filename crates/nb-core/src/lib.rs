//! # nb-core
//!
//! Core types for comparing program notations.
//!
//! A notation is one candidate syntax for the same program semantics. This
//! crate owns everything that can be computed without a generative model:
//!
//! | Module | Role |
//! |--------|------|
//! | [`notation`] | Static notation catalog (extensions, comment prefix) |
//! | [`normalize`] | Comment and blank line stripping |
//! | [`measure`] | Token and character counts behind a [`Tokenizer`] seam |
//! | [`corpus`] | Example and spec loading from a notation directory |
//! | [`trial`] | Trial results and the append-only run log |
//!
//! Normalized text is what gets measured and what gets shown to the model,
//! so both sides of the comparison see exactly the same bytes.

pub mod corpus;
pub mod measure;
pub mod normalize;
pub mod notation;
pub mod trial;

pub use corpus::{CorpusError, CorpusLoader, Example, ExampleMode, NormalizedExample};
pub use measure::{Cl100kTokenizer, ConfigError, Measurement, SizeMeter, Tokenizer};
pub use normalize::normalize;
pub use notation::{Notation, BASELINE_NOTATION};
pub use trial::{
    PredicateOutcome, PromptMode, RunLog, RunLogError, RunLogWriter, SkippedTrial, TrialResult,
};
