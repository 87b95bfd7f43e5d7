//! Per-notation and per-task score aggregation.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use nb_core::{Notation, RunLog, SkippedTrial, TrialResult};
use serde::Serialize;

use crate::sizes::{format_ratio, SizeComparison};
use crate::NO_DATA;

/// Reporting errors.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Task {task} reported total {found}, expected {expected}")]
    InconsistentTotal {
        task: String,
        expected: u32,
        found: u32,
    },

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize summary: {0}")]
    Json(#[from] serde_json::Error),
}

/// Aggregates for one notation across all of its trials.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotationSummary {
    pub notation: String,
    /// Scored trials
    pub trials: usize,
    /// Mean of per-trial `score / total`
    pub mean_score_ratio: Option<f64>,
    /// Mean generated tokens per trial
    pub mean_output_tokens: Option<f64>,
    /// Mean call latency in seconds
    pub mean_latency_secs: Option<f64>,
}

/// One notation × task cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Cell {
    /// No trial was recorded for this pair
    NoData,
    /// Mean predicate count over `trials` trials, out of `total`
    Scored {
        mean_score: f64,
        total: u32,
        trials: usize,
    },
}

impl Cell {
    /// `"mean/total"` or `no data`.
    pub fn format(&self) -> String {
        match self {
            Cell::NoData => NO_DATA.to_string(),
            Cell::Scored { mean_score, total, .. } => format!("{:.1}/{}", mean_score, total),
        }
    }
}

/// Mean scores by notation and task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreMatrix {
    pub notations: Vec<String>,
    pub tasks: Vec<String>,
    /// Row-major: `cells[notation][task]`
    pub cells: Vec<Vec<Cell>>,
}

impl ScoreMatrix {
    /// Cell for a pair; `None` when either id is unknown.
    pub fn get(&self, notation: &str, task: &str) -> Option<&Cell> {
        let row = self.notations.iter().position(|n| n == notation)?;
        let col = self.tasks.iter().position(|t| t == task)?;
        Some(&self.cells[row][col])
    }

    /// Fixed-width table, one row per notation.
    pub fn format_table(&self) -> String {
        let name_width = column_width(self.notations.iter().map(String::as_str), "notation");
        let widths: Vec<usize> = self
            .tasks
            .iter()
            .map(|t| t.len().max(NO_DATA.len()))
            .collect();

        let mut table = format!("{:<name_width$}", "notation");
        for (task, width) in self.tasks.iter().zip(&widths) {
            table.push_str(&format!("  {:>width$}", task, width = *width));
        }
        table.push('\n');
        table.push_str(&"-".repeat(name_width + widths.iter().map(|w| w + 2).sum::<usize>()));
        table.push('\n');

        for (notation, row) in self.notations.iter().zip(&self.cells) {
            table.push_str(&format!("{:<name_width$}", notation));
            for (cell, width) in row.iter().zip(&widths) {
                table.push_str(&format!("  {:>width$}", cell.format(), width = *width));
            }
            table.push('\n');
        }
        table
    }
}

/// Everything derived from a run log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// One entry per notation: catalog order, then unknown ids as first seen
    pub notations: Vec<NotationSummary>,
    /// Score matrix over the same notations and every task seen
    pub matrix: ScoreMatrix,
    /// Predicate count per task, constant across the run
    pub task_totals: BTreeMap<String, u32>,
    /// Pairs without corpus data
    pub skipped: Vec<SkippedTrial>,
    /// Corpus sizes, when measured alongside the run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sizes: Option<SizeComparison>,
}

impl RunSummary {
    /// Attach a size comparison; adds a size ratio column to the table.
    #[must_use]
    pub fn with_sizes(mut self, sizes: SizeComparison) -> Self {
        self.sizes = Some(sizes);
        self
    }

    /// Fixed-width per-notation table.
    pub fn format_table(&self) -> String {
        let name_width = column_width(self.notations.iter().map(|n| n.notation.as_str()), "notation");
        let mut table = format!(
            "{:<name_width$}  {:>9}  {:>7}  {:>8}  {:>8}  {:>8}\n",
            "notation", "size", "trials", "score", "out tok", "latency"
        );
        table.push_str(&"-".repeat(name_width + 52));
        table.push('\n');

        for n in &self.notations {
            let size_ratio = self
                .sizes
                .as_ref()
                .and_then(|s| s.row(&n.notation))
                .and_then(|r| r.token_ratio);
            table.push_str(&format!(
                "{:<name_width$}  {:>9}  {:>7}  {:>8}  {:>8}  {:>8}\n",
                n.notation,
                format_ratio(size_ratio),
                n.trials,
                format_optional(n.mean_score_ratio, |r| format!("{:.1}%", r * 100.0)),
                format_optional(n.mean_output_tokens, |t| format!("{:.1}", t)),
                format_optional(n.mean_latency_secs, |s| format!("{:.2}s", s)),
            ));
        }
        table
    }

    /// Full text report: notation table, score matrix, totals and skips.
    pub fn format_report(&self) -> String {
        let mut report = String::new();

        report.push_str("Notation Summary\n");
        report.push_str("================\n\n");
        report.push_str(&self.format_table());

        report.push_str("\nScores by Task (mean predicates satisfied / total)\n");
        report.push_str("==================================================\n\n");
        report.push_str(&self.matrix.format_table());

        if !self.task_totals.is_empty() {
            report.push_str("\nPredicates per task: ");
            let totals: Vec<String> = self
                .task_totals
                .iter()
                .map(|(task, total)| format!("{}={}", task, total))
                .collect();
            report.push_str(&totals.join(", "));
            report.push('\n');
        }

        if let Some(sizes) = &self.sizes {
            report.push_str(&format!("\nCorpus Size ({})\n", sizes.encoding));
            report.push_str("==========================\n\n");
            report.push_str(&sizes.format_table());
        }

        if !self.skipped.is_empty() {
            report.push_str("\nSkipped (no corpus data):\n");
            for skip in &self.skipped {
                report.push_str(&format!("  {} / {}: {}\n", skip.notation, skip.task, skip.reason));
            }
        }

        report
    }
}

/// Aggregate a run log.
///
/// Fails if a task reports different totals in different trials; mixing
/// denominators would make the ratios meaningless.
pub fn summarize(log: &RunLog) -> Result<RunSummary, ReportError> {
    let task_totals = task_totals(log.results())?;

    let mut notations: Vec<String> = Vec::new();
    let mut tasks: Vec<String> = Vec::new();
    let pairs = log
        .results()
        .iter()
        .map(|r| (&r.notation, &r.task))
        .chain(log.skipped().iter().map(|s| (&s.notation, &s.task)));
    for (notation, task) in pairs {
        if !notations.contains(notation) {
            notations.push(notation.clone());
        }
        if !tasks.contains(task) {
            tasks.push(task.clone());
        }
    }
    notations.sort_by_key(|id| catalog_position(id));

    let summaries = notations
        .iter()
        .map(|notation| {
            let trials: Vec<&TrialResult> =
                log.results().iter().filter(|r| &r.notation == notation).collect();
            NotationSummary {
                notation: notation.clone(),
                trials: trials.len(),
                mean_score_ratio: mean(trials.iter().map(|r| r.ratio())),
                mean_output_tokens: mean(trials.iter().map(|r| r.output_tokens as f64)),
                mean_latency_secs: mean(trials.iter().map(|r| r.elapsed_secs)),
            }
        })
        .collect();

    let cells = notations
        .iter()
        .map(|notation| {
            tasks
                .iter()
                .map(|task| {
                    let scores: Vec<&TrialResult> = log
                        .results()
                        .iter()
                        .filter(|r| &r.notation == notation && &r.task == task)
                        .collect();
                    match mean(scores.iter().map(|r| f64::from(r.score))) {
                        Some(mean_score) => Cell::Scored {
                            mean_score,
                            total: task_totals[task],
                            trials: scores.len(),
                        },
                        None => Cell::NoData,
                    }
                })
                .collect()
        })
        .collect();

    Ok(RunSummary {
        notations: summaries,
        matrix: ScoreMatrix {
            notations,
            tasks,
            cells,
        },
        task_totals,
        skipped: log.skipped().to_vec(),
        sizes: None,
    })
}

/// Write the text report to `path` and the JSON form next to it.
pub fn write_summary(path: &Path, summary: &RunSummary) -> Result<(), ReportError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: io::Error| ReportError::Io { path, source }
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    fs::write(path, summary.format_report()).map_err(io_err(path))?;

    let json_path = path.with_extension("json");
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(&json_path, json).map_err(io_err(&json_path))
}

fn task_totals(results: &[TrialResult]) -> Result<BTreeMap<String, u32>, ReportError> {
    let mut totals = BTreeMap::new();
    for result in results {
        let expected = *totals.entry(result.task.clone()).or_insert(result.total);
        if expected != result.total {
            return Err(ReportError::InconsistentTotal {
                task: result.task.clone(),
                expected,
                found: result.total,
            });
        }
    }
    Ok(totals)
}

fn catalog_position(id: &str) -> usize {
    Notation::catalog()
        .iter()
        .position(|n| n.id == id)
        .unwrap_or(usize::MAX)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

fn format_optional(value: Option<f64>, f: impl Fn(f64) -> String) -> String {
    value.map_or_else(|| NO_DATA.to_string(), f)
}

pub(crate) fn column_width<'a>(names: impl Iterator<Item = &'a str>, header: &str) -> usize {
    names.map(str::len).chain([header.len()]).max().unwrap_or(0)
}
