//! # nb-harness
//!
//! Runs notation benchmark trials against a text generation service.
//!
//! # Usage
//!
//! ```bash
//! # Corpus size comparison (no API key needed)
//! cargo run -p nb-harness --bin notation-bench -- sizes --corpus examples
//!
//! # Full evaluation
//! ANTHROPIC_API_KEY=sk-... cargo run -p nb-harness --bin notation-bench -- run --corpus examples
//!
//! # Re-score a saved log after editing checkers
//! cargo run -p nb-harness --bin notation-bench -- rescore results/run.jsonl
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Corpus    │ ──> │   Prompt    │ ──> │  Resilient  │
//! │   Loader    │     │  Assembler  │     │   Caller    │
//! └─────────────┘     └─────────────┘     └──────┬──────┘
//!                                                │ (retry with backoff)
//!                                                ▼
//!                                         ┌─────────────┐
//!                                         │   Claude    │
//!                                         │     API     │
//!                                         └──────┬──────┘
//!                                                │
//!                     ┌──────────────────────────┘
//!                     ▼
//!              ┌─────────────┐     ┌─────────────┐
//!              │   Feature   │ ──> │   Run Log   │ ──> nb-report
//!              │   Checker   │     │   (JSONL)   │
//!              └─────────────┘     └─────────────┘
//! ```
//!
//! Calls are strictly sequential. Exhausting retries on any call aborts the
//! run; everything scored up to that point is still returned in the log.

pub mod caller;
pub mod client;
pub mod config;
pub mod orchestrator;
pub mod prompt;
pub mod telemetry;

pub use caller::{
    classify, CallError, FailureClass, Generation, ResilientCaller, RetryPolicy, TextGenerator,
};
pub use client::{ClaudeClient, ClaudeConfig, ClientError, Message, Role};
pub use config::HarnessConfig;
pub use orchestrator::{HarnessError, PreparedPrompt, TrialOrchestrator, TrialState};
pub use prompt::{assemble, TemplateKind};
pub use telemetry::init_tracing;
