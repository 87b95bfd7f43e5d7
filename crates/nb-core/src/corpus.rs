//! Example and specification loading.
//!
//! Layout on disk:
//!
//! ```text
//! <root>/
//!   python-baseline/
//!     01-simple-function.py
//!     02-with-dependencies.py
//!     ...
//!   idea1/
//!     01-simple-function.ilo
//!     SPEC.md              (optional)
//! ```
//!
//! Example names carry a leading two-digit sequence index. Missing data is
//! never an error here: an absent directory yields no examples and an absent
//! `SPEC.md` yields an empty spec. The orchestrator decides what an empty
//! contribution means.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::measure::{Measurement, SizeMeter};
use crate::normalize::normalize;
use crate::notation::Notation;

/// File name of the optional per-notation specification.
pub const SPEC_FILE_NAME: &str = "SPEC.md";

/// Sequence prefix of the first example in a corpus.
pub const FIRST_SEQUENCE_PREFIX: &str = "01";

/// Corpus loading errors.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Which examples to hand to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExampleMode {
    /// Only the first example in sequence. Starves the model of later
    /// examples so that it must extrapolate instead of copying.
    FirstOnly,
    /// Every example in the corpus.
    All,
}

/// A raw example file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Example {
    /// File name without directory
    pub file_name: String,
    /// Unmodified file contents
    pub raw: String,
}

/// An example after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedExample {
    /// File name without directory
    pub file_name: String,
    /// Normalized text, never empty
    pub text: String,
}

/// Loads examples and specs from a corpus root.
#[derive(Debug, Clone)]
pub struct CorpusLoader {
    root: PathBuf,
}

impl CorpusLoader {
    /// Create a loader rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Corpus root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one notation's files.
    pub fn notation_dir(&self, notation: &Notation) -> PathBuf {
        self.root.join(notation.id)
    }

    /// Raw example files for `notation`, sorted by file name.
    pub fn load_raw(&self, notation: &Notation) -> Result<Vec<Example>, CorpusError> {
        let dir = self.notation_dir(notation);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(notation = notation.id, dir = %dir.display(), "no corpus directory");
                return Ok(Vec::new());
            }
            Err(source) => return Err(CorpusError::Io { path: dir, source }),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| CorpusError::Io {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name != SPEC_FILE_NAME && notation.matches_file(name) {
                names.push(name.to_string());
            }
        }
        names.sort();

        names
            .into_iter()
            .map(|file_name| {
                let path = dir.join(&file_name);
                let raw = fs::read_to_string(&path).map_err(|source| CorpusError::Io { path, source })?;
                Ok(Example { file_name, raw })
            })
            .collect()
    }

    /// Normalized examples for `notation`, in sequence order.
    ///
    /// Files that normalize to nothing are dropped.
    pub fn load_examples(
        &self,
        notation: &Notation,
        mode: ExampleMode,
    ) -> Result<Vec<NormalizedExample>, CorpusError> {
        let examples = self
            .load_raw(notation)?
            .into_iter()
            .filter(|e| match mode {
                ExampleMode::All => true,
                ExampleMode::FirstOnly => e.file_name.starts_with(FIRST_SEQUENCE_PREFIX),
            })
            .filter_map(|e| {
                let text = normalize(&e.raw, notation);
                (!text.trim().is_empty()).then_some(NormalizedExample {
                    file_name: e.file_name,
                    text,
                })
            })
            .collect::<Vec<_>>();

        debug!(notation = notation.id, ?mode, count = examples.len(), "loaded examples");
        Ok(examples)
    }

    /// The example whose name starts with `index` (e.g. `"05"`), if any.
    pub fn load_example_by_index(
        &self,
        notation: &Notation,
        index: &str,
    ) -> Result<Option<NormalizedExample>, CorpusError> {
        Ok(self
            .load_examples(notation, ExampleMode::All)?
            .into_iter()
            .find(|e| e.file_name.starts_with(index)))
    }

    /// Specification text for `notation`, or an empty string when none exists.
    pub fn load_spec(&self, notation: &Notation) -> Result<String, CorpusError> {
        let path = self.notation_dir(notation).join(SPEC_FILE_NAME);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(source) => Err(CorpusError::Io { path, source }),
        }
    }

    /// Per-file sizes of every example, for size comparison.
    pub fn size_inventory(
        &self,
        notation: &Notation,
        meter: &SizeMeter,
    ) -> Result<Vec<(String, Measurement)>, CorpusError> {
        Ok(self
            .load_raw(notation)?
            .into_iter()
            .filter(|e| !normalize(&e.raw, notation).trim().is_empty())
            .map(|e| {
                let m = meter.measure_example(notation, &e);
                (e.file_name, m)
            })
            .collect())
    }
}
