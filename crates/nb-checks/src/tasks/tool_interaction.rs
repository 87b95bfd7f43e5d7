//! Sequential tool calls with error propagation.

use crate::checker::{contains_any, count_occurrences, occurs_after, Checker, Predicate};
use crate::task::{Task, TaskKind};

const DESCRIPTION: &str = "\
Write a function `notify_user` that takes a user id and a message.
1. Fetch the user record with GET /users/{id}; if the fetch fails, return an error.
2. If the user's email is not verified, return the error \"email not verified\".
3. Otherwise send the message to the user's email address with POST /email/send, returning an error if sending fails.
4. Return success.";

fn names_function(text: &str) -> bool {
    text.contains("notify")
}

fn fetches_user(text: &str) -> bool {
    text.contains("/users")
}

fn checks_verified(text: &str) -> bool {
    text.contains("verified")
}

fn sends_email(text: &str) -> bool {
    text.contains("/email/send")
}

fn verify_before_send(text: &str) -> bool {
    occurs_after(text, "/email/send", "verified")
}

fn error_handling(text: &str) -> bool {
    contains_any(text, &["err", "fail", "error"])
}

fn multiple_error_paths(text: &str) -> bool {
    count_occurrences(text, "err") >= 2
}

fn uses_message(text: &str) -> bool {
    contains_any(text, &["message", "msg", "body"])
}

const PREDICATES: &[Predicate] = &[
    Predicate::new("names_function", names_function),
    Predicate::new("fetches_user", fetches_user),
    Predicate::new("checks_verified", checks_verified),
    Predicate::new("sends_email", sends_email),
    Predicate::new("verify_before_send", verify_before_send),
    Predicate::new("error_handling", error_handling),
    Predicate::new("multiple_error_paths", multiple_error_paths),
    Predicate::new("uses_message", uses_message),
];

pub const TASK: Task = Task {
    id: "tool_interaction",
    kind: TaskKind::Generation,
    description: DESCRIPTION,
    checker: Checker::new(PREDICATES),
};
