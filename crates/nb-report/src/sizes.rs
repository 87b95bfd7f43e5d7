//! Corpus size comparison against the baseline notation.

use nb_core::{Measurement, BASELINE_NOTATION};
use serde::Serialize;

use crate::summary::column_width;
use crate::NO_DATA;

/// Size totals for one notation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizeRow {
    pub notation: String,
    /// Per-file sizes, sorted by file name
    pub files: Vec<(String, u64, u64)>,
    pub tokens: u64,
    pub chars: u64,
    /// `tokens / baseline tokens`
    pub token_ratio: Option<f64>,
    /// `chars / baseline chars`
    pub char_ratio: Option<f64>,
}

impl SizeRow {
    pub fn has_data(&self) -> bool {
        !self.files.is_empty()
    }
}

/// Token and character totals per notation, relative to the baseline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizeComparison {
    pub encoding: String,
    pub rows: Vec<SizeRow>,
}

impl SizeComparison {
    /// Build from per-notation inventories as produced by
    /// `CorpusLoader::size_inventory`.
    ///
    /// Ratios are `None` when either the notation or the baseline has no
    /// files.
    pub fn from_inventories(
        encoding: impl Into<String>,
        inventories: Vec<(String, Vec<(String, Measurement)>)>,
    ) -> Self {
        let totals = |files: &[(String, Measurement)]| {
            files
                .iter()
                .fold(Measurement::default(), |acc, (_, m)| acc.plus(*m))
        };

        let baseline = inventories
            .iter()
            .find(|(id, files)| id == BASELINE_NOTATION && !files.is_empty())
            .map(|(_, files)| totals(files));

        let rows = inventories
            .into_iter()
            .map(|(notation, mut files)| {
                files.sort_by(|a, b| a.0.cmp(&b.0));
                let total = totals(&files);
                let has_data = !files.is_empty();
                let ratio = |own: u64, base: u64| {
                    (has_data && base > 0).then(|| own as f64 / base as f64)
                };
                SizeRow {
                    token_ratio: baseline.and_then(|b| ratio(total.tokens, b.tokens)),
                    char_ratio: baseline.and_then(|b| ratio(total.chars, b.chars)),
                    files: files
                        .into_iter()
                        .map(|(name, m)| (name, m.tokens, m.chars))
                        .collect(),
                    tokens: total.tokens,
                    chars: total.chars,
                    notation,
                }
            })
            .collect();

        Self {
            encoding: encoding.into(),
            rows,
        }
    }

    pub fn row(&self, notation: &str) -> Option<&SizeRow> {
        self.rows.iter().find(|r| r.notation == notation)
    }

    /// Fixed-width totals table, one row per notation.
    pub fn format_table(&self) -> String {
        let name_width = column_width(self.rows.iter().map(|r| r.notation.as_str()), "notation");
        let mut table = format!(
            "{:<name_width$}  {:>7}  {:>7}  {:>8}  {:>9}\n",
            "notation", "files", "tokens", "chars", "vs base"
        );
        table.push_str(&"-".repeat(name_width + 43));
        table.push('\n');

        for row in &self.rows {
            if row.has_data() {
                table.push_str(&format!(
                    "{:<name_width$}  {:>7}  {:>7}  {:>8}  {:>9}\n",
                    row.notation,
                    row.files.len(),
                    row.tokens,
                    row.chars,
                    format_ratio(row.token_ratio),
                ));
            } else {
                table.push_str(&format!(
                    "{:<name_width$}  {:>7}  {:>7}  {:>8}  {:>9}\n",
                    row.notation, 0, NO_DATA, NO_DATA, NO_DATA
                ));
            }
        }
        table
    }

    /// Per-file breakdown followed by the totals table.
    pub fn format_report(&self) -> String {
        let mut report = format!("Token comparison ({})\n", self.encoding);
        report.push_str(&"=".repeat(report.len() - 1));
        report.push('\n');

        for row in self.rows.iter().filter(|r| r.has_data()) {
            report.push_str(&format!("\n{:<30}  {:>7}  {:>7}\n", row.notation, "tokens", "chars"));
            report.push_str(&"-".repeat(48));
            report.push('\n');
            for (name, tokens, chars) in &row.files {
                report.push_str(&format!("  {:<28}  {:>7}  {:>7}\n", name, tokens, chars));
            }
            report.push_str(&format!(
                "  {:<28}  {:>7}  {:>7}  {}\n",
                "TOTAL",
                row.tokens,
                row.chars,
                format_ratio(row.token_ratio)
            ));
        }

        report.push('\n');
        report.push_str(&self.format_table());
        report
    }
}

pub(crate) fn format_ratio(ratio: Option<f64>) -> String {
    ratio.map_or_else(|| NO_DATA.to_string(), |r| format!("{:.2}x", r))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(tokens: u64, chars: u64) -> Measurement {
        Measurement { tokens, chars }
    }

    fn inventories() -> Vec<(String, Vec<(String, Measurement)>)> {
        vec![
            (
                BASELINE_NOTATION.to_string(),
                vec![
                    ("02-b.py".to_string(), m(60, 240)),
                    ("01-a.py".to_string(), m(40, 160)),
                ],
            ),
            ("idea1".to_string(), vec![("01-a.ilo".to_string(), m(25, 50))]),
            ("idea4-ast-bytecode".to_string(), Vec::new()),
        ]
    }

    #[test]
    fn test_ratios_against_baseline() {
        let sizes = SizeComparison::from_inventories("cl100k_base", inventories());

        let baseline = sizes.row(BASELINE_NOTATION).unwrap();
        assert_eq!(baseline.tokens, 100);
        assert_eq!(baseline.token_ratio, Some(1.0));
        assert_eq!(baseline.files[0].0, "01-a.py");

        let idea1 = sizes.row("idea1").unwrap();
        assert_eq!(idea1.token_ratio, Some(0.25));
        assert_eq!(idea1.char_ratio, Some(0.125));
    }

    #[test]
    fn test_empty_notation_has_no_ratio() {
        let sizes = SizeComparison::from_inventories("cl100k_base", inventories());
        let empty = sizes.row("idea4-ast-bytecode").unwrap();

        assert!(!empty.has_data());
        assert_eq!(empty.token_ratio, None);

        let table = sizes.format_table();
        let line = table
            .lines()
            .find(|l| l.starts_with("idea4-ast-bytecode"))
            .unwrap();
        assert_eq!(line.matches(NO_DATA).count(), 3);
    }

    #[test]
    fn test_missing_baseline_yields_no_ratios() {
        let mut inv = inventories();
        inv.remove(0);
        let sizes = SizeComparison::from_inventories("cl100k_base", inv);

        assert!(sizes.rows.iter().all(|r| r.token_ratio.is_none()));
        assert!(sizes.format_table().contains("no data"));
    }

    #[test]
    fn test_report_lists_files() {
        let report = SizeComparison::from_inventories("cl100k_base", inventories()).format_report();

        assert!(report.starts_with("Token comparison (cl100k_base)"));
        assert!(report.contains("01-a.ilo"));
        assert!(report.contains("0.25x"));
        assert_eq!(report.matches("idea4-ast-bytecode").count(), 1);
    }
}
