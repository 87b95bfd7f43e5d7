//! Comment and blank line stripping.
//!
//! Size comparisons are only fair when notations that allow comments are
//! measured without them, so every text is normalized before it is counted
//! or placed in a prompt.

use crate::notation::Notation;

/// Drop blank lines and whole-line comments.
///
/// Lines break at `\n`, `\r\n` and a lone `\r`, plus the other separators
/// Python's `str.splitlines` recognises. A line is dropped when its trimmed
/// form is empty or starts with the notation's comment prefix. Kept lines are
/// emitted verbatim (leading indentation included) and in their original
/// order, joined by `\n`.
///
/// Kept lines never contain a separator, so a second pass splits them the
/// same way and returns its input unchanged.
#[must_use]
pub fn normalize(text: &str, notation: &Notation) -> String {
    let prefix = notation.comment_prefix;

    // `\r\n` splits into a line and an empty piece; the empty piece is
    // dropped with the blank lines.
    text.split(is_line_break)
        .filter(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                return false;
            }
            !prefix.is_some_and(|p| trimmed.starts_with(p))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}
