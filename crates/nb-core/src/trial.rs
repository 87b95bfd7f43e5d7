//! Trial results and the run log.
//!
//! A [`RunLog`] is owned by whoever starts a run. The orchestrator appends to
//! it; reporting only reads it. The JSON Lines format written here is the
//! durable record of a run: outputs can be re-scored later without calling
//! the generation service again, so field names must stay stable.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// How a generation prompt draws on the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptMode {
    /// Task plus examples
    ExamplesOnly,
    /// Task plus the notation's spec
    SpecOnly,
    /// Task plus spec and examples
    SpecAndExamples,
}

impl PromptMode {
    /// Short name used on the command line and in reports.
    pub fn name(&self) -> &'static str {
        match self {
            PromptMode::ExamplesOnly => "examples",
            PromptMode::SpecOnly => "spec",
            PromptMode::SpecAndExamples => "spec+examples",
        }
    }

    /// Whether prompts in this mode need example files.
    pub fn needs_examples(&self) -> bool {
        matches!(self, PromptMode::ExamplesOnly | PromptMode::SpecAndExamples)
    }

    /// Whether prompts in this mode need a spec.
    pub fn needs_spec(&self) -> bool {
        matches!(self, PromptMode::SpecOnly | PromptMode::SpecAndExamples)
    }
}

impl fmt::Display for PromptMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of one named predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateOutcome {
    pub name: String,
    pub passed: bool,
}

/// One scored trial. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    /// Notation id
    pub notation: String,
    /// Task id
    pub task: String,
    /// Trial index within the (notation, task) pair, 0-based
    pub trial: u32,
    /// Prompt mode the run used. Comprehension prompts follow it too: they
    /// carry the notation's spec when the mode needs one.
    pub prompt_mode: PromptMode,
    /// Name of the template that built the prompt (e.g. `comprehension`)
    #[serde(default)]
    pub template: String,
    /// Raw generated text
    pub output: String,
    /// Tokens in the assembled prompt
    pub prompt_tokens: u64,
    /// Tokens in the generated text
    pub output_tokens: u64,
    /// Latency of the successful generation call
    pub elapsed_secs: f64,
    /// Predicate outcomes in registration order
    pub checks: Vec<PredicateOutcome>,
    /// Number of satisfied predicates
    pub score: u32,
    /// Number of predicates registered for the task
    pub total: u32,
    /// Names of unsatisfied predicates
    pub unmet: Vec<String>,
}

impl TrialResult {
    /// Score as `"k/n"`.
    pub fn format_score(&self) -> String {
        format!("{}/{}", self.score, self.total)
    }

    /// Score as a ratio in `[0, 1]`.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        f64::from(self.score) / f64::from(self.total)
    }
}

/// A (notation, task) pair that had no usable corpus data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedTrial {
    pub notation: String,
    pub task: String,
    pub reason: String,
}

/// Errors reading or writing a persisted run log.
#[derive(Debug, thiserror::Error)]
pub enum RunLogError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed record at {path}:{line}: {source}")]
    Json {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Ordered, append-only record of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunLog {
    results: Vec<TrialResult>,
    skipped: Vec<SkippedTrial>,
}

impl RunLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a scored trial.
    pub fn push(&mut self, result: TrialResult) {
        self.results.push(result);
    }

    /// Append a skipped pair.
    pub fn push_skipped(&mut self, skipped: SkippedTrial) {
        self.skipped.push(skipped);
    }

    /// Scored trials in run order.
    pub fn results(&self) -> &[TrialResult] {
        &self.results
    }

    /// Skipped pairs in run order.
    pub fn skipped(&self) -> &[SkippedTrial] {
        &self.skipped
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty() && self.skipped.is_empty()
    }

    /// Sibling path holding skipped pairs for a results file.
    pub fn skipped_path(path: &Path) -> PathBuf {
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("run");
        path.with_file_name(format!("{}.skipped.jsonl", stem))
    }

    /// Write results to `path` and skipped pairs to its sibling, one JSON
    /// object per line.
    pub fn write_jsonl(&self, path: &Path) -> Result<(), RunLogError> {
        write_lines(path, &self.results)?;
        write_lines(&Self::skipped_path(path), &self.skipped)
    }

    /// Read a log written by [`RunLog::write_jsonl`]. A missing skipped
    /// sibling means nothing was skipped.
    pub fn read_jsonl(path: &Path) -> Result<Self, RunLogError> {
        let results = read_lines(path)?;
        let skipped_path = Self::skipped_path(path);
        let skipped = if skipped_path.exists() {
            read_lines(&skipped_path)?
        } else {
            Vec::new()
        };
        Ok(Self { results, skipped })
    }
}

/// Appends records to a persisted run log as they are produced.
///
/// Existing files are extended, never truncated. Every record is flushed
/// before the call returns, so an interrupted run keeps everything scored
/// before the interruption.
pub struct RunLogWriter {
    results: LineAppender,
    skipped: LineAppender,
}

impl RunLogWriter {
    /// Open `path` and its skipped sibling for appending, creating them
    /// (and missing parent directories) if needed.
    pub fn open(path: &Path) -> Result<Self, RunLogError> {
        Ok(Self {
            results: LineAppender::open(path)?,
            skipped: LineAppender::open(&RunLog::skipped_path(path))?,
        })
    }

    /// Results file being appended to.
    pub fn path(&self) -> &Path {
        &self.results.path
    }

    /// Append one scored trial.
    pub fn append_result(&mut self, result: &TrialResult) -> Result<(), RunLogError> {
        self.results.append(result)
    }

    /// Append one skipped pair.
    pub fn append_skipped(&mut self, skipped: &SkippedTrial) -> Result<(), RunLogError> {
        self.skipped.append(skipped)
    }
}

struct LineAppender {
    path: PathBuf,
    writer: BufWriter<File>,
    appended: usize,
}

impl LineAppender {
    fn open(path: &Path) -> Result<Self, RunLogError> {
        let io_err = |source: io::Error| RunLogError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_err)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            appended: 0,
        })
    }

    fn append<T: Serialize>(&mut self, record: &T) -> Result<(), RunLogError> {
        let mut line = serde_json::to_vec(record).map_err(|source| RunLogError::Json {
            path: self.path.clone(),
            line: self.appended + 1,
            source,
        })?;
        line.push(b'\n');

        let path = &self.path;
        let io_err = |source: io::Error| RunLogError::Io {
            path: path.clone(),
            source,
        };
        self.writer.write_all(&line).map_err(io_err)?;
        self.writer.flush().map_err(io_err)?;
        self.appended += 1;
        Ok(())
    }
}

fn write_lines<T: Serialize>(path: &Path, records: &[T]) -> Result<(), RunLogError> {
    let io_err = |source: io::Error| RunLogError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
    for (i, record) in records.iter().enumerate() {
        serde_json::to_writer(&mut writer, record).map_err(|source| RunLogError::Json {
            path: path.to_path_buf(),
            line: i + 1,
            source,
        })?;
        writer.write_all(b"\n").map_err(io_err)?;
    }
    writer.flush().map_err(io_err)
}

fn read_lines<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, RunLogError> {
    let io_err = |source: io::Error| RunLogError::Io {
        path: path.to_path_buf(),
        source,
    };

    let reader = BufReader::new(File::open(path).map_err(io_err)?);
    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(io_err)?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|source| RunLogError::Json {
            path: path.to_path_buf(),
            line: i + 1,
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}
