//! Multi-step workflow with a compensating action.

use crate::checker::{contains_any, occurs_after, Checker, Predicate};
use crate::task::{Task, TaskKind};

const DESCRIPTION: &str = "\
Write a function `checkout` that takes a payment id, an amount and a list of item lines.
1. Reserve inventory for the items; if the reservation fails, return an error.
2. Charge the payment; if the charge fails, release the reserved inventory and then return an error.
3. Generate an order id and return the order id, the charge id and the reservation id.";

fn names_function(text: &str) -> bool {
    text.contains("checkout")
}

fn reserves(text: &str) -> bool {
    text.contains("reserve")
}

fn charges(text: &str) -> bool {
    text.contains("charge")
}

fn releases(text: &str) -> bool {
    text.contains("release")
}

fn reserve_before_charge(text: &str) -> bool {
    occurs_after(text, "charge", "reserve")
}

// Compensation only makes sense once the charge has been attempted.
fn release_after_charge(text: &str) -> bool {
    occurs_after(text, "release", "charge")
}

fn returns_order_id(text: &str) -> bool {
    contains_any(text, &["order_id", "orderid", "order-id", "order id"])
}

fn error_handling(text: &str) -> bool {
    contains_any(text, &["err", "fail", "error"])
}

const PREDICATES: &[Predicate] = &[
    Predicate::new("names_function", names_function),
    Predicate::new("reserves", reserves),
    Predicate::new("charges", charges),
    Predicate::new("releases", releases),
    Predicate::new("reserve_before_charge", reserve_before_charge),
    Predicate::new("release_after_charge", release_after_charge),
    Predicate::new("returns_order_id", returns_order_id),
    Predicate::new("error_handling", error_handling),
];

pub const TASK: Task = Task {
    id: "workflow",
    kind: TaskKind::Generation,
    description: DESCRIPTION,
    checker: Checker::new(PREDICATES),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_workflow() {
        let output = r#"checkout pid:t amt:n items:L line>R result t
  rid=reserve items;?rid{^e:^+"Inventory unavailable: "e}
  cid=charge pid amt;?cid{^e:release rid;^+"Payment failed: "e}
  oid=uuid()
  result order_id:oid charge_id:cid reservation_id:rid"#;
        assert_eq!(TASK.checker.check(output).format_score(), "8/8");
    }

    #[test]
    fn test_release_before_charge() {
        let output = "checkout: reserve, release on error, then charge; order_id";
        let result = TASK.checker.check(output);
        assert_eq!(result.passed("release_after_charge"), Some(false));
        assert_eq!(result.unmet(), vec!["release_after_charge"]);
    }
}
