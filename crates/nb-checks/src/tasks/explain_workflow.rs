//! Explain the corpus's workflow example.

use crate::checker::{contains_any, Checker, Predicate};
use crate::task::{Task, TaskKind};

const DESCRIPTION: &str = "\
Explain step by step what the program above does. Describe each external call it makes, the order of the calls, and what happens when a step fails.";

fn mentions_inventory(text: &str) -> bool {
    text.contains("inventory")
}

fn mentions_payment(text: &str) -> bool {
    contains_any(text, &["payment", "charge"])
}

fn mentions_compensation(text: &str) -> bool {
    contains_any(text, &["release", "rollback", "roll back", "undo", "compensat"])
}

fn mentions_order_id(text: &str) -> bool {
    text.contains("order")
}

fn mentions_failure(text: &str) -> bool {
    contains_any(text, &["fail", "error", "err"])
}

fn describes_sequence(text: &str) -> bool {
    contains_any(text, &["first", "then", "next", "finally"])
}

const PREDICATES: &[Predicate] = &[
    Predicate::new("mentions_inventory", mentions_inventory),
    Predicate::new("mentions_payment", mentions_payment),
    Predicate::new("mentions_compensation", mentions_compensation),
    Predicate::new("mentions_order_id", mentions_order_id),
    Predicate::new("mentions_failure", mentions_failure),
    Predicate::new("describes_sequence", describes_sequence),
];

pub const TASK: Task = Task {
    id: "explain_workflow",
    kind: TaskKind::Comprehension { subject_index: "05" },
    description: DESCRIPTION,
    checker: Checker::new(PREDICATES),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_good_explanation() {
        let output = "First it reserves inventory. Then it charges the payment; \
                      if that fails the reservation is released. Finally it returns the order id.";
        assert_eq!(TASK.checker.check(output).format_score(), "6/6");
    }

    #[test]
    fn test_vague_explanation() {
        let output = "It processes a purchase.";
        assert_eq!(TASK.checker.check(output).score(), 0);
    }
}
