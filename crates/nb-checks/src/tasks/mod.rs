//! Built-in benchmark tasks, one module per task.
//!
//! Predicates are plain substring tests over lowercased text, so `err` also
//! matches `error` and `stderr`.

pub mod data_transform;
pub mod decision_logic;
pub mod explain_workflow;
pub mod tool_interaction;
pub mod workflow;
