//! Predicate checker framework.

use nb_core::PredicateOutcome;

/// A named boolean test over lowercased text.
#[derive(Clone, Copy)]
pub struct Predicate {
    /// Stable name, reported in unmet lists and persisted logs
    pub name: &'static str,
    /// The test. Receives text that is already lowercased.
    pub test: fn(&str) -> bool,
}

impl Predicate {
    /// Declare a predicate.
    pub const fn new(name: &'static str, test: fn(&str) -> bool) -> Self {
        Self { name, test }
    }
}

impl std::fmt::Debug for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Predicate").field(&self.name).finish()
    }
}

/// A fixed, statically declared set of predicates.
#[derive(Debug, Clone, Copy)]
pub struct Checker {
    predicates: &'static [Predicate],
}

impl Checker {
    /// Build a checker over a static predicate list.
    pub const fn new(predicates: &'static [Predicate]) -> Self {
        Self { predicates }
    }

    /// The registered predicates in order.
    pub fn predicates(&self) -> &'static [Predicate] {
        self.predicates
    }

    /// Registered predicate names in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.predicates.iter().map(|p| p.name).collect()
    }

    /// Number of predicates, the denominator of every score.
    pub fn total(&self) -> usize {
        self.predicates.len()
    }

    /// Evaluate every predicate against `output`.
    pub fn check(&self, output: &str) -> CheckResult {
        let lowered = output.to_lowercase();
        let outcomes = self
            .predicates
            .iter()
            .map(|p| (p.name, (p.test)(&lowered)))
            .collect();
        CheckResult { outcomes }
    }
}

/// Outcome of running a checker once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    outcomes: Vec<(&'static str, bool)>,
}

impl CheckResult {
    /// `(name, passed)` pairs in registration order.
    pub fn outcomes(&self) -> &[(&'static str, bool)] {
        &self.outcomes
    }

    /// Whether the named predicate passed. `None` for unknown names.
    pub fn passed(&self, name: &str) -> Option<bool> {
        self.outcomes.iter().find(|(n, _)| *n == name).map(|(_, ok)| *ok)
    }

    /// Number of satisfied predicates.
    pub fn score(&self) -> usize {
        self.outcomes.iter().filter(|(_, ok)| *ok).count()
    }

    /// Number of evaluated predicates.
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Names of unsatisfied predicates.
    pub fn unmet(&self) -> Vec<&'static str> {
        self.outcomes
            .iter()
            .filter(|(_, ok)| !*ok)
            .map(|(name, _)| *name)
            .collect()
    }

    /// Score as `"k/n"`.
    pub fn format_score(&self) -> String {
        format!("{}/{}", self.score(), self.total())
    }

    /// Owned outcomes for persistence.
    pub fn to_outcomes(&self) -> Vec<PredicateOutcome> {
        self.outcomes
            .iter()
            .map(|(name, passed)| PredicateOutcome {
                name: (*name).to_string(),
                passed: *passed,
            })
            .collect()
    }

    /// Format as a multi-line report.
    pub fn format_report(&self) -> String {
        let mut report = String::new();
        for (name, ok) in &self.outcomes {
            let status = if *ok { "PASS" } else { "FAIL" };
            report.push_str(&format!("[{}] {}\n", status, name));
        }
        report.push_str(&format!("Score: {}\n", self.format_score()));
        report
    }
}

/// Whether any needle occurs in `text`.
pub fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

/// Whether every needle occurs in `text`.
pub fn contains_all(text: &str, needles: &[&str]) -> bool {
    needles.iter().all(|n| text.contains(n))
}

/// Non-overlapping occurrences of `needle` in `text`.
pub fn count_occurrences(text: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    text.matches(needle).count()
}

/// Whether the first `later` occurs strictly after the first `earlier`.
///
/// False when either is absent.
pub fn occurs_after(text: &str, later: &str, earlier: &str) -> bool {
    match (text.find(later), text.find(earlier)) {
        (Some(l), Some(e)) => l > e,
        _ => false,
    }
}
