//! Prompt assembly from fixed templates.
//!
//! Prompts carry no hints about how to write the notation beyond what the
//! corpus shows. Each template is a constant with named insertion points,
//! filled by single-pass interpolation: inserted text is never rescanned, so
//! corpus content that happens to contain `{task}` stays literal.

use nb_core::{NormalizedExample, PromptMode};

/// Which template to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    /// Learn the notation from examples
    ExamplesOnly,
    /// Learn the notation from its specification
    SpecOnly,
    /// Specification followed by examples
    SpecAndExamples,
    /// Explain an existing program
    Comprehension,
}

impl TemplateKind {
    /// Name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            TemplateKind::ExamplesOnly => "examples_only",
            TemplateKind::SpecOnly => "spec_only",
            TemplateKind::SpecAndExamples => "spec_and_examples",
            TemplateKind::Comprehension => "comprehension",
        }
    }

    fn template(&self) -> &'static str {
        match self {
            TemplateKind::ExamplesOnly => EXAMPLES_ONLY,
            TemplateKind::SpecOnly => SPEC_ONLY,
            TemplateKind::SpecAndExamples => SPEC_AND_EXAMPLES,
            TemplateKind::Comprehension => COMPREHENSION,
        }
    }
}

impl From<PromptMode> for TemplateKind {
    fn from(mode: PromptMode) -> Self {
        match mode {
            PromptMode::ExamplesOnly => TemplateKind::ExamplesOnly,
            PromptMode::SpecOnly => TemplateKind::SpecOnly,
            PromptMode::SpecAndExamples => TemplateKind::SpecAndExamples,
        }
    }
}

const EXAMPLES_ONLY: &str = r#"You will write a program in a programming notation you have not seen before. Learn the notation from the examples below.

{examples}## TASK

{task}

Use only the notation shown above. Return ONLY the program in a single fenced code block."#;

const SPEC_ONLY: &str = r#"You will write a program in a programming notation you have not seen before. Learn the notation from its specification below.

{spec}## TASK

{task}

Use only the notation described above. Return ONLY the program in a single fenced code block."#;

const SPEC_AND_EXAMPLES: &str = r#"You will write a program in a programming notation you have not seen before. Learn the notation from its specification and the examples below.

{spec}{examples}## TASK

{task}

Use only the notation described above. Return ONLY the program in a single fenced code block."#;

const COMPREHENSION: &str = r#"Below is a program written in a compact programming notation.

{spec}## PROGRAM

{examples}## QUESTION

{task}

Answer in plain prose."#;

/// Build a prompt.
///
/// Pure: the same arguments always produce byte-identical output. An empty
/// `spec` or `examples` drops its section entirely.
pub fn assemble(
    kind: TemplateKind,
    task_description: &str,
    examples: &[NormalizedExample],
    spec: &str,
) -> String {
    let examples_section = match kind {
        TemplateKind::Comprehension => program_section(examples),
        _ => examples_section(examples),
    };
    let spec_section = spec_section(spec);

    interpolate(
        kind.template(),
        &[
            ("task", task_description.trim()),
            ("examples", &examples_section),
            ("spec", &spec_section),
        ],
    )
}

fn examples_section(examples: &[NormalizedExample]) -> String {
    if examples.is_empty() {
        return String::new();
    }
    let mut section = String::from("## EXAMPLES\n\n");
    for example in examples {
        section.push_str(&format!("### {}\n\n```\n{}\n```\n\n", example.file_name, example.text));
    }
    section
}

fn program_section(examples: &[NormalizedExample]) -> String {
    examples
        .iter()
        .map(|e| format!("```\n{}\n```\n\n", e.text))
        .collect()
}

fn spec_section(spec: &str) -> String {
    let spec = spec.trim();
    if spec.is_empty() {
        return String::new();
    }
    format!("## SPECIFICATION\n\n{}\n\n", spec)
}

/// Replace `{name}` placeholders in one left-to-right pass.
///
/// Braces that do not name a known placeholder are copied through.
fn interpolate(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() + values.iter().map(|(_, v)| v.len()).sum::<usize>());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let hit = values.iter().find_map(|(name, value)| {
            after
                .strip_prefix(*name)
                .and_then(|tail| tail.strip_prefix('}'))
                .map(|tail| (*value, tail))
        });
        match hit {
            Some((value, tail)) => {
                out.push_str(value);
                rest = tail;
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn example(name: &str, text: &str) -> NormalizedExample {
        NormalizedExample {
            file_name: name.to_string(),
            text: text.to_string(),
        }
    }

    const KINDS: [TemplateKind; 4] = [
        TemplateKind::ExamplesOnly,
        TemplateKind::SpecOnly,
        TemplateKind::SpecAndExamples,
        TemplateKind::Comprehension,
    ];

    #[test]
    fn test_assembly_is_deterministic() {
        let examples = vec![example("01-a.ilo", "f x:n>n;*x 2"), example("02-b.ilo", "g>t;\"hi\"")];
        for kind in KINDS {
            let a = assemble(kind, "Write f.", &examples, "grammar");
            let b = assemble(kind, "Write f.", &examples, "grammar");
            assert_eq!(a.as_bytes(), b.as_bytes(), "{}", kind.name());
        }
    }

    #[test]
    fn test_no_placeholders_left() {
        let examples = vec![example("01-a.ilo", "x")];
        for kind in KINDS {
            let prompt = assemble(kind, "task", &examples, "spec");
            for placeholder in ["{task}", "{examples}", "{spec}"] {
                assert!(!prompt.contains(placeholder), "{} left {}", kind.name(), placeholder);
            }
        }
    }

    #[test]
    fn test_examples_in_order() {
        let examples = vec![example("01-a.ilo", "first"), example("02-b.ilo", "second")];
        let prompt = assemble(TemplateKind::ExamplesOnly, "task", &examples, "");
        let first = prompt.find("### 01-a.ilo").unwrap();
        let second = prompt.find("### 02-b.ilo").unwrap();
        assert!(first < second);
        assert!(prompt.contains("```\nfirst\n```"));
    }

    #[test]
    fn test_empty_sections_omitted() {
        let prompt = assemble(TemplateKind::SpecAndExamples, "task", &[], "  \n");
        assert!(!prompt.contains("## SPECIFICATION"));
        assert!(!prompt.contains("## EXAMPLES"));
        assert!(prompt.contains("## TASK\n\ntask"));
    }

    #[test]
    fn test_spec_only_ignores_examples_heading() {
        let prompt = assemble(TemplateKind::SpecOnly, "task", &[], "fn := name args > type ; body");
        assert!(prompt.contains("## SPECIFICATION\n\nfn := name args > type ; body"));
        assert!(!prompt.contains("## EXAMPLES"));
    }

    #[test]
    fn test_comprehension_shows_program_without_file_name() {
        let prompt = assemble(
            TemplateKind::Comprehension,
            "Explain it.",
            &[example("05-workflow.ilo", "checkout pid amt")],
            "",
        );
        assert!(prompt.contains("## PROGRAM\n\n```\ncheckout pid amt\n```"));
        assert!(!prompt.contains("05-workflow.ilo"));
        assert!(prompt.ends_with("Answer in plain prose."));
    }

    #[test]
    fn test_inserted_text_not_rescanned() {
        let prompt = assemble(
            TemplateKind::ExamplesOnly,
            "the task",
            &[example("01-a.ilo", "literal {task} and {spec} and {other")],
            "",
        );
        assert!(prompt.contains("literal {task} and {spec} and {other"));
    }

    #[test]
    fn test_interpolate_unknown_braces() {
        assert_eq!(interpolate("{a}{b}{", &[("a", "1")]), "1{b}{");
    }

    #[test]
    fn test_mode_to_template() {
        assert_eq!(TemplateKind::from(PromptMode::SpecOnly), TemplateKind::SpecOnly);
        assert_eq!(TemplateKind::from(PromptMode::ExamplesOnly), TemplateKind::ExamplesOnly);
    }

    fn kind_strategy() -> impl Strategy<Value = TemplateKind> {
        prop::sample::select(KINDS.to_vec())
    }

    proptest! {
        #[test]
        fn test_assembly_byte_identical_and_verbatim(
            kind in kind_strategy(),
            task in "[a-z {}\n]{0,30}",
            texts in prop::collection::vec("[a-z0-9 {}:;>\n]{0,40}", 0..4),
            spec in "[a-z {}\n]{0,40}",
        ) {
            let examples: Vec<NormalizedExample> = texts
                .iter()
                .enumerate()
                .map(|(i, t)| example(&format!("0{}-x.ilo", i + 1), t))
                .collect();

            let a = assemble(kind, &task, &examples, &spec);
            let b = assemble(kind, &task, &examples, &spec);
            prop_assert_eq!(a.as_bytes(), b.as_bytes());

            prop_assert!(a.contains(task.trim()));
            if kind != TemplateKind::SpecOnly {
                for text in &texts {
                    prop_assert!(a.contains(text.as_str()));
                }
            }
            if kind != TemplateKind::ExamplesOnly {
                prop_assert!(a.contains(spec.trim()));
            }
        }
    }
}
