//! Task registry.

use crate::checker::Checker;
use crate::tasks;

/// What the model is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Write a new program in the notation.
    Generation,
    /// Explain an existing corpus program. `subject_index` is the sequence
    /// prefix of the example to explain (e.g. `"05"`).
    Comprehension { subject_index: &'static str },
}

/// A benchmark task with exactly one checker.
#[derive(Debug, Clone, Copy)]
pub struct Task {
    /// Stable identifier
    pub id: &'static str,
    /// Generation or comprehension
    pub kind: TaskKind,
    /// Instructions handed to the model
    pub description: &'static str,
    /// Predicates the output is scored against
    pub checker: Checker,
}

impl Task {
    /// Predicate count for this task.
    pub fn total(&self) -> usize {
        self.checker.total()
    }
}

static REGISTRY: &[Task] = &[
    tasks::decision_logic::TASK,
    tasks::data_transform::TASK,
    tasks::tool_interaction::TASK,
    tasks::workflow::TASK,
    tasks::explain_workflow::TASK,
];

/// All built-in tasks in run order.
pub fn registry() -> &'static [Task] {
    REGISTRY
}

/// Look up a task by id.
pub fn find_task(id: &str) -> Option<&'static Task> {
    REGISTRY.iter().find(|t| t.id == id)
}
