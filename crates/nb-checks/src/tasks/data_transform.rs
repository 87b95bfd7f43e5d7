//! Filter and aggregate a collection.

use crate::checker::{contains_any, Checker, Predicate};
use crate::task::{Task, TaskKind};

const DESCRIPTION: &str = "\
Write a function `summarize_orders` that takes a list of orders, each with an id, a status and an amount.
Keep only the orders whose status is \"paid\", and return the number of paid orders together with the sum of their amounts.";

fn names_function(text: &str) -> bool {
    text.contains("summarize")
}

fn mentions_orders(text: &str) -> bool {
    text.contains("order")
}

fn checks_status(text: &str) -> bool {
    text.contains("status")
}

fn filters_paid(text: &str) -> bool {
    text.contains("paid")
}

fn iterates(text: &str) -> bool {
    contains_any(text, &["for ", "map", "filter", "each", "fold", "@"])
}

fn sums_amounts(text: &str) -> bool {
    text.contains("amount") && contains_any(text, &["sum", "total", "+"])
}

fn counts(text: &str) -> bool {
    contains_any(text, &["count", "len"])
}

const PREDICATES: &[Predicate] = &[
    Predicate::new("names_function", names_function),
    Predicate::new("mentions_orders", mentions_orders),
    Predicate::new("checks_status", checks_status),
    Predicate::new("filters_paid", filters_paid),
    Predicate::new("iterates", iterates),
    Predicate::new("sums_amounts", sums_amounts),
    Predicate::new("counts", counts),
];

pub const TASK: Task = Task {
    id: "data_transform",
    kind: TaskKind::Generation,
    description: DESCRIPTION,
    checker: Checker::new(PREDICATES),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_answer() {
        let output = r#"
def summarize_orders(orders):
    paid = [o for o in orders if o.status == "paid"]
    return len(paid), sum(o.amount for o in paid)
"#;
        assert_eq!(TASK.checker.check(output).format_score(), "7/7");
    }

    #[test]
    fn test_amount_without_aggregation() {
        assert!(!sums_amounts("amount"));
        assert!(sums_amounts("t=+t o.amount"));
    }
}
