//! Static notation catalog.
//!
//! Notations are defined once at startup and never change afterwards.

use std::fmt;

/// Identifier of the notation every size ratio is measured against.
pub const BASELINE_NOTATION: &str = "python-baseline";

/// A candidate program encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Notation {
    /// Directory name under the corpus root, also used in reports
    pub id: &'static str,
    /// File extensions (with leading dot) that hold examples
    pub extensions: &'static [&'static str],
    /// Line comment prefix. `None` disables comment stripping.
    pub comment_prefix: Option<&'static str>,
}

const CATALOG: &[Notation] = &[
    Notation::new("python-baseline", &[".py"], Some("#")),
    Notation::new("idea1", &[".ilo"], Some("--")),
    Notation::new("idea1-compact", &[".ilo"], Some("--")),
    Notation::new("idea2-tool-calling", &[".json"], None),
    Notation::new("idea3-constrained-decoding", &[".md"], None),
    Notation::new("idea4-ast-bytecode", &[".ast"], None),
    Notation::new("idea5-workflow-dag", &[".yaml"], Some("#")),
    Notation::new("idea6-mcp-composition", &[".json"], None),
    Notation::new("idea7-dense-wire", &[".ilo"], Some("--")),
];

impl Notation {
    /// Define a notation.
    #[must_use]
    pub const fn new(
        id: &'static str,
        extensions: &'static [&'static str],
        comment_prefix: Option<&'static str>,
    ) -> Self {
        Self {
            id,
            extensions,
            comment_prefix,
        }
    }

    /// All built-in notations, baseline first.
    #[must_use]
    pub fn catalog() -> &'static [Notation] {
        CATALOG
    }

    /// Look up a built-in notation by id.
    #[must_use]
    pub fn find(id: &str) -> Option<Notation> {
        CATALOG.iter().copied().find(|n| n.id == id)
    }

    /// Whether `file_name` carries one of this notation's extensions.
    #[must_use]
    pub fn matches_file(&self, file_name: &str) -> bool {
        self.extensions.iter().any(|ext| file_name.ends_with(ext))
    }

    /// Whether this is the size baseline.
    #[must_use]
    pub fn is_baseline(&self) -> bool {
        self.id == BASELINE_NOTATION
    }
}

impl fmt::Display for Notation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id)
    }
}
