//! # nb-checks
//!
//! Feature checkers for generated program text.
//!
//! Generated programs are never parsed or executed. Each task instead owns a
//! fixed list of named boolean predicates over the lowercased output, and a
//! trial's score is the number of predicates it satisfies.
//!
//! ## Invariants
//!
//! - A task's predicate list is static, so `total` is the same for every
//!   notation and every trial of that task.
//! - Predicates are total functions over text. Empty output just fails the
//!   predicates that need content; it is not special-cased.
//! - Predicates are independent; evaluation order cannot change a result.
//!
//! ## Built-in tasks
//!
//! | Task | Kind | Predicates |
//! |------|------|------------|
//! | `decision_logic` | generation | 10 |
//! | `data_transform` | generation | 7 |
//! | `tool_interaction` | generation | 8 |
//! | `workflow` | generation | 8 |
//! | `explain_workflow` | comprehension | 6 |

pub mod checker;
pub mod rescore;
pub mod task;
pub mod tasks;

pub use checker::{CheckResult, Checker, Predicate};
pub use rescore::{count_changed, rescore};
pub use task::{find_task, registry, Task, TaskKind};
