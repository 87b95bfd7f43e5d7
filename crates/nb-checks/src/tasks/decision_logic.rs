//! Loan decision with guard clauses and rate tiers.

use crate::checker::{contains_all, contains_any, count_occurrences, occurs_after, Checker, Predicate};
use crate::task::{Task, TaskKind};

const DESCRIPTION: &str = "\
Write a function `approve_loan` that takes a credit score, an annual income and a total debt, and decides a loan application:
- reject when the credit score is below 500
- reject when the income is below 20000
- compute the debt ratio as debt divided by income, and reject when it is above 0.4
- otherwise approve with an interest rate: 3.5 when the score is at least 750, 5.0 when it is at least 650, and 7.5 otherwise
Return either the rejection reason or the approved rate.";

fn names_function(text: &str) -> bool {
    text.contains("approve")
}

fn uses_inputs(text: &str) -> bool {
    contains_all(text, &["score", "income", "debt"])
}

fn score_threshold(text: &str) -> bool {
    text.contains("500")
}

fn income_threshold(text: &str) -> bool {
    contains_any(text, &["20000", "20_000", "20,000"])
}

fn debt_ratio(text: &str) -> bool {
    text.contains("0.4")
}

fn three_rejections(text: &str) -> bool {
    count_occurrences(text, "reject") >= 3
}

fn rate_values(text: &str) -> bool {
    contains_all(text, &["3.5", "5.0", "7.5"])
}

fn rate_tiers(text: &str) -> bool {
    contains_all(text, &["750", "650"])
}

// Highest tier has to be tested first.
fn tier_order(text: &str) -> bool {
    occurs_after(text, "650", "750")
}

fn returns_rate(text: &str) -> bool {
    text.contains("rate")
}

const PREDICATES: &[Predicate] = &[
    Predicate::new("names_function", names_function),
    Predicate::new("uses_inputs", uses_inputs),
    Predicate::new("score_threshold", score_threshold),
    Predicate::new("income_threshold", income_threshold),
    Predicate::new("debt_ratio", debt_ratio),
    Predicate::new("three_rejections", three_rejections),
    Predicate::new("rate_values", rate_values),
    Predicate::new("rate_tiers", rate_tiers),
    Predicate::new("tier_order", tier_order),
    Predicate::new("returns_rate", returns_rate),
];

pub const TASK: Task = Task {
    id: "decision_logic",
    kind: TaskKind::Generation,
    description: DESCRIPTION,
    checker: Checker::new(PREDICATES),
};
