//! Re-scoring persisted outputs against the current predicates.
//!
//! Stored outputs are scored again without calling the generation service.
//! This lets predicate revisions apply to historical runs.

use nb_core::{RunLog, SkippedTrial, TrialResult};

use crate::task::find_task;

/// Score every stored output again with the registered checkers.
///
/// Order is preserved. Results whose task is no longer registered move to
/// the skipped list. Earlier skipped entries are carried over unchanged.
pub fn rescore(log: &RunLog) -> RunLog {
    let mut rescored = RunLog::new();

    for result in log.results() {
        match find_task(&result.task) {
            Some(task) => {
                let check = task.checker.check(&result.output);
                rescored.push(TrialResult {
                    checks: check.to_outcomes(),
                    score: check.score() as u32,
                    total: check.total() as u32,
                    unmet: check.unmet().into_iter().map(String::from).collect(),
                    ..result.clone()
                });
            }
            None => rescored.push_skipped(SkippedTrial {
                notation: result.notation.clone(),
                task: result.task.clone(),
                reason: format!("task {} is not registered", result.task),
            }),
        }
    }

    for skipped in log.skipped() {
        rescored.push_skipped(skipped.clone());
    }

    rescored
}

/// Number of results whose score or total differs after [`rescore`].
///
/// `rescore` drops results for unregistered tasks and keeps the rest in
/// order, so the original is filtered the same way before pairing. Pairs
/// must also agree on (notation, task, trial).
pub fn count_changed(original: &RunLog, rescored: &RunLog) -> usize {
    original
        .results()
        .iter()
        .filter(|r| find_task(&r.task).is_some())
        .zip(rescored.results())
        .filter(|(before, after)| {
            let same_trial = before.notation == after.notation
                && before.task == after.task
                && before.trial == after.trial;
            !same_trial || before.score != after.score || before.total != after.total
        })
        .count()
}
