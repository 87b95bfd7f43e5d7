//! Trial orchestration.
//!
//! Drives every (notation, task, trial) triple through
//!
//! ```text
//! Init ──> PromptBuilt ──> CallIssued ──> Scored
//!                               │
//!                               └──────> Aborted (ends the whole run)
//! ```
//!
//! Iteration order is fixed: notations in the order given, then tasks in the
//! order given, then trial indices ascending. Calls are strictly sequential
//! so that latencies are comparable and the service sees one request at a
//! time.
//!
//! A fatal call failure stops the run instead of skipping the trial. A
//! notation that silently lost trials would be averaged over fewer samples
//! than its peers.

use std::fmt;

use nb_checks::{Task, TaskKind};
use nb_core::{
    CorpusError, CorpusLoader, Notation, NormalizedExample, RunLog, RunLogError, RunLogWriter,
    SizeMeter, SkippedTrial, TrialResult,
};
use tracing::{debug, info, warn};

use crate::caller::{CallError, Generation, ResilientCaller, TextGenerator};
use crate::config::HarnessConfig;
use crate::prompt::{assemble, TemplateKind};

/// Lifecycle of one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialState {
    Init,
    PromptBuilt,
    CallIssued,
    Scored,
    Aborted,
}

impl fmt::Display for TrialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrialState::Init => "init",
            TrialState::PromptBuilt => "prompt_built",
            TrialState::CallIssued => "call_issued",
            TrialState::Scored => "scored",
            TrialState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Errors that end a run.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("Run aborted at notation={notation} task={task} trial={trial}: {source}")]
    Aborted {
        notation: String,
        task: String,
        trial: u32,
        #[source]
        source: CallError,
    },

    #[error("Corpus error for notation={notation}: {source}")]
    Corpus {
        notation: String,
        #[source]
        source: CorpusError,
    },

    #[error("Failed to record trial: {0}")]
    RunLog(#[from] RunLogError),
}

/// A built prompt, or the reason the pair has nothing to prompt with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreparedPrompt {
    Ready { template: TemplateKind, text: String },
    Missing(String),
}

/// Runs trials and appends them to a caller-owned [`RunLog`].
pub struct TrialOrchestrator<G> {
    caller: ResilientCaller<G>,
    corpus: CorpusLoader,
    meter: SizeMeter,
    config: HarnessConfig,
}

impl<G: TextGenerator> TrialOrchestrator<G> {
    /// Create an orchestrator.
    pub fn new(generator: G, corpus: CorpusLoader, meter: SizeMeter, config: HarnessConfig) -> Self {
        let caller = ResilientCaller::new(generator, config.retry);
        Self {
            caller,
            corpus,
            meter,
            config,
        }
    }

    /// Current config.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Size meter used for prompt and output accounting.
    pub fn meter(&self) -> &SizeMeter {
        &self.meter
    }

    /// Run every trial for `notations` × `tasks`.
    ///
    /// Results are appended to `log` as they are scored. On error, the log
    /// keeps everything recorded before the failing trial.
    pub async fn run(
        &self,
        notations: &[Notation],
        tasks: &[Task],
        log: &mut RunLog,
    ) -> Result<(), HarnessError> {
        self.run_inner(notations, tasks, log, None).await
    }

    /// Like [`run`](Self::run), and also appends every result and skip to
    /// `writer` the moment it is recorded.
    pub async fn run_recorded(
        &self,
        notations: &[Notation],
        tasks: &[Task],
        log: &mut RunLog,
        writer: &mut RunLogWriter,
    ) -> Result<(), HarnessError> {
        self.run_inner(notations, tasks, log, Some(writer)).await
    }

    async fn run_inner(
        &self,
        notations: &[Notation],
        tasks: &[Task],
        log: &mut RunLog,
        mut writer: Option<&mut RunLogWriter>,
    ) -> Result<(), HarnessError> {
        info!(
            notations = notations.len(),
            tasks = tasks.len(),
            trials = self.config.trials,
            mode = %self.config.prompt_mode,
            "run started"
        );

        for notation in notations {
            for task in tasks {
                self.run_pair(notation, task, log, writer.as_deref_mut()).await?;
            }
        }

        info!(
            scored = log.results().len(),
            skipped = log.skipped().len(),
            "run finished"
        );
        Ok(())
    }

    async fn run_pair(
        &self,
        notation: &Notation,
        task: &Task,
        log: &mut RunLog,
        mut writer: Option<&mut RunLogWriter>,
    ) -> Result<(), HarnessError> {
        let (template, prompt) = match self.prepare(notation, task)? {
            PreparedPrompt::Ready { template, text } => (template, text),
            PreparedPrompt::Missing(reason) => {
                warn!(notation = notation.id, task = task.id, %reason, "skipping pair");
                let skipped = SkippedTrial {
                    notation: notation.id.to_string(),
                    task: task.id.to_string(),
                    reason,
                };
                if let Some(writer) = writer {
                    writer.append_skipped(&skipped)?;
                }
                log.push_skipped(skipped);
                return Ok(());
            }
        };

        let prompt_tokens = self.meter.measure(&prompt).tokens;
        debug!(
            notation = notation.id,
            task = task.id,
            template = template.name(),
            prompt_tokens,
            state = %TrialState::PromptBuilt,
            "prompt built"
        );

        for trial in 0..self.config.trials {
            debug!(notation = notation.id, task = task.id, trial, state = %TrialState::CallIssued, "calling generator");

            let generation = match self
                .caller
                .generate(&prompt, self.config.max_output_tokens)
                .await
            {
                Ok(generation) => generation,
                Err(source) => {
                    warn!(
                        notation = notation.id,
                        task = task.id,
                        trial,
                        state = %TrialState::Aborted,
                        error = %source,
                        "aborting run"
                    );
                    return Err(HarnessError::Aborted {
                        notation: notation.id.to_string(),
                        task: task.id.to_string(),
                        trial,
                        source,
                    });
                }
            };

            let result = self.score_trial(notation, task, template, trial, prompt_tokens, generation);
            info!(
                notation = notation.id,
                task = task.id,
                trial,
                score = %result.format_score(),
                output_tokens = result.output_tokens,
                elapsed_secs = result.elapsed_secs,
                state = %TrialState::Scored,
                "trial scored"
            );
            if let Some(writer) = writer.as_deref_mut() {
                writer.append_result(&result)?;
            }
            log.push(result);
        }

        Ok(())
    }

    /// Load corpus data and assemble the prompt for a pair.
    pub fn prepare(&self, notation: &Notation, task: &Task) -> Result<PreparedPrompt, HarnessError> {
        debug!(notation = notation.id, task = task.id, state = %TrialState::Init, "preparing prompt");
        let corpus_err = |source: CorpusError| HarnessError::Corpus {
            notation: notation.id.to_string(),
            source,
        };
        let mode = self.config.prompt_mode;

        let spec = if mode.needs_spec() {
            self.corpus.load_spec(notation).map_err(corpus_err)?
        } else {
            String::new()
        };

        match task.kind {
            TaskKind::Generation => {
                let examples: Vec<NormalizedExample> = if mode.needs_examples() {
                    self.corpus
                        .load_examples(notation, self.config.example_mode)
                        .map_err(corpus_err)?
                } else {
                    Vec::new()
                };

                if mode.needs_examples() && examples.is_empty() {
                    return Ok(PreparedPrompt::Missing(format!("no examples for {} mode", mode)));
                }
                if mode.needs_spec() && spec.trim().is_empty() {
                    return Ok(PreparedPrompt::Missing("no specification".to_string()));
                }

                let template = TemplateKind::from(mode);
                Ok(PreparedPrompt::Ready {
                    template,
                    text: assemble(template, task.description, &examples, &spec),
                })
            }
            TaskKind::Comprehension { subject_index } => {
                let Some(subject) = self
                    .corpus
                    .load_example_by_index(notation, subject_index)
                    .map_err(corpus_err)?
                else {
                    return Ok(PreparedPrompt::Missing(format!("no example {}", subject_index)));
                };

                Ok(PreparedPrompt::Ready {
                    template: TemplateKind::Comprehension,
                    text: assemble(TemplateKind::Comprehension, task.description, &[subject], &spec),
                })
            }
        }
    }

    fn score_trial(
        &self,
        notation: &Notation,
        task: &Task,
        template: TemplateKind,
        trial: u32,
        prompt_tokens: u64,
        generation: Generation,
    ) -> TrialResult {
        let check = task.checker.check(&generation.text);
        debug_assert_eq!(check.total(), task.total(), "Checker must report every predicate");

        TrialResult {
            notation: notation.id.to_string(),
            task: task.id.to_string(),
            trial,
            prompt_mode: self.config.prompt_mode,
            template: template.name().to_string(),
            output_tokens: self.meter.measure(&generation.text).tokens,
            output: generation.text,
            prompt_tokens,
            elapsed_secs: generation.elapsed.as_secs_f64(),
            checks: check.to_outcomes(),
            score: check.score() as u32,
            total: check.total() as u32,
            unmet: check.unmet().into_iter().map(String::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::atomic::Ordering;

    use nb_checks::find_task;
    use nb_core::{ExampleMode, PromptMode, Tokenizer};

    use super::*;
    use crate::caller::tests::{unavailable, ScriptedGenerator};
    use crate::caller::RetryPolicy;
    use crate::client::ClientError;

    struct WordTokenizer;

    impl Tokenizer for WordTokenizer {
        fn encode(&self, text: &str) -> Vec<u32> {
            text.split_whitespace().map(|_| 0).collect()
        }

        fn encoding_name(&self) -> &str {
            "words"
        }
    }

    const ILO: Notation = Notation::new("idea1", &[".ilo"], Some("--"));
    const PY: Notation = Notation::new("python-baseline", &[".py"], Some("#"));

    const EIGHT_OF_TEN: &str = r#"```
approve_loan score:n income:n debt:n>r text n
<score 500{^"reject: score too low"}
<income 20000{^"reject: income too low"}
ratio=/debt income
>ratio 0.4{^"reject: debt ratio too high"}
>=score 750{~3.5}
>=score 600{~5.0}
~7.5 -- rate
```"#;

    fn corpus(files: &[(&Notation, &str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (notation, name, content) in files {
            let notation_dir = dir.path().join(notation.id);
            fs::create_dir_all(&notation_dir).unwrap();
            fs::write(notation_dir.join(name), content).unwrap();
        }
        dir
    }

    fn orchestrator(
        root: &std::path::Path,
        script: Vec<Result<String, ClientError>>,
        config: HarnessConfig,
    ) -> TrialOrchestrator<ScriptedGenerator> {
        TrialOrchestrator::new(
            ScriptedGenerator::new(script),
            CorpusLoader::new(root),
            SizeMeter::new(Box::new(WordTokenizer)),
            config,
        )
    }

    fn one_trial() -> HarnessConfig {
        HarnessConfig {
            trials: 1,
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_example_decision_logic_scores_eight() {
        let dir = corpus(&[(&ILO, "01-simple.ilo", "-- comment\ntot p:n q:n>n;*p q\n")]);
        let orch = orchestrator(dir.path(), vec![Ok(EIGHT_OF_TEN.to_string())], one_trial());
        let task = find_task("decision_logic").unwrap();
        let mut log = RunLog::new();

        orch.run(&[ILO], std::slice::from_ref(task), &mut log).await.unwrap();

        assert_eq!(log.results().len(), 1);
        let result = &log.results()[0];
        assert_eq!(result.format_score(), "8/10");
        assert_eq!(result.unmet, vec!["rate_tiers", "tier_order"]);
        assert_eq!(result.notation, "idea1");
        assert_eq!(result.prompt_mode, PromptMode::ExamplesOnly);
        assert_eq!(result.template, "examples_only");
        assert!(result.prompt_tokens > 0);
        assert!(result.output_tokens > 0);
        assert_eq!(result.checks.len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_order_is_notation_task_trial() {
        let dir = corpus(&[
            (&PY, "01-a.py", "a = 1\n"),
            (&ILO, "01-a.ilo", "a=1\n"),
        ]);
        let config = HarnessConfig {
            trials: 2,
            ..Default::default()
        };
        let script = (0..8).map(|i| Ok(format!("out {}", i))).collect();
        let orch = orchestrator(dir.path(), script, config);
        let tasks = [*find_task("decision_logic").unwrap(), *find_task("workflow").unwrap()];
        let mut log = RunLog::new();

        orch.run(&[PY, ILO], &tasks, &mut log).await.unwrap();

        let order: Vec<_> = log
            .results()
            .iter()
            .map(|r| (r.notation.as_str(), r.task.as_str(), r.trial))
            .collect();
        assert_eq!(
            order,
            vec![
                ("python-baseline", "decision_logic", 0),
                ("python-baseline", "decision_logic", 1),
                ("python-baseline", "workflow", 0),
                ("python-baseline", "workflow", 1),
                ("idea1", "decision_logic", 0),
                ("idea1", "decision_logic", 1),
                ("idea1", "workflow", 0),
                ("idea1", "workflow", 1),
            ]
        );
        assert_eq!(log.results()[5].output, "out 5");
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_abort_run() {
        let dir = corpus(&[(&PY, "01-a.py", "a = 1\n"), (&ILO, "01-a.ilo", "a=1\n")]);
        let orch = orchestrator(dir.path(), Vec::new(), one_trial());
        let task = find_task("decision_logic").unwrap();
        let mut log = RunLog::new();

        let err = orch
            .run(&[PY, ILO], std::slice::from_ref(task), &mut log)
            .await
            .unwrap_err();

        match err {
            HarnessError::Aborted { notation, task, trial, source } => {
                assert_eq!(notation, "python-baseline");
                assert_eq!(task, "decision_logic");
                assert_eq!(trial, 0);
                assert!(matches!(source, CallError::Exhausted { attempts: 5, .. }));
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(log.results().is_empty());
        assert_eq!(orch.caller.generator().calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_keeps_earlier_results() {
        let dir = corpus(&[(&PY, "01-a.py", "a = 1\n"), (&ILO, "01-a.ilo", "a=1\n")]);
        let mut script = vec![Ok("first".to_string())];
        script.extend((0..5).map(|_| Err(unavailable())));
        let orch = orchestrator(dir.path(), script, one_trial());
        let task = find_task("workflow").unwrap();
        let mut log = RunLog::new();

        let err = orch.run(&[PY, ILO], std::slice::from_ref(task), &mut log).await;

        assert!(matches!(err, Err(HarnessError::Aborted { ref notation, .. }) if notation == "idea1"));
        assert_eq!(log.results().len(), 1);
        assert_eq!(log.results()[0].notation, "python-baseline");
    }

    #[tokio::test(start_paused = true)]
    async fn test_recorded_run_persists_results_before_abort() {
        let dir = corpus(&[(&PY, "01-a.py", "a = 1\n"), (&ILO, "01-a.ilo", "a=1\n")]);
        let out = tempfile::tempdir().unwrap();
        let path = out.path().join("run.jsonl");
        fs::write(&path, "").unwrap();

        let mut script = vec![Ok("first".to_string())];
        script.extend((0..5).map(|_| Err(unavailable())));
        let orch = orchestrator(dir.path(), script, one_trial());
        let tasks = [*find_task("workflow").unwrap()];
        let mut log = RunLog::new();
        let mut writer = RunLogWriter::open(&path).unwrap();

        let err = orch.run_recorded(&[PY, ILO], &tasks, &mut log, &mut writer).await;

        assert!(matches!(err, Err(HarnessError::Aborted { .. })));
        let persisted = RunLog::read_jsonl(&path).unwrap();
        assert_eq!(persisted, log);
        assert_eq!(persisted.results()[0].output, "first");
    }

    #[tokio::test(start_paused = true)]
    async fn test_recorded_run_appends_skips_and_keeps_prior_runs() {
        let dir = corpus(&[(&PY, "01-a.py", "a = 1\n")]);
        let out = tempfile::tempdir().unwrap();
        let path = out.path().join("run.jsonl");
        let tasks = [*find_task("data_transform").unwrap()];

        for _ in 0..2 {
            let orch = orchestrator(dir.path(), vec![Ok("x".into())], one_trial());
            let mut writer = RunLogWriter::open(&path).unwrap();
            orch.run_recorded(&[ILO, PY], &tasks, &mut RunLog::new(), &mut writer)
                .await
                .unwrap();
        }

        let persisted = RunLog::read_jsonl(&path).unwrap();
        assert_eq!(persisted.results().len(), 2);
        assert_eq!(persisted.skipped().len(), 2);
        assert_eq!(persisted.skipped()[0].notation, "idea1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_comprehension_trial_records_template() {
        let dir = corpus(&[(&ILO, "05-workflow.ilo", "chk pid amt\n")]);
        let orch = orchestrator(dir.path(), vec![Ok("It charges.".into())], one_trial());
        let mut log = RunLog::new();

        orch.run(&[ILO], std::slice::from_ref(find_task("explain_workflow").unwrap()), &mut log)
            .await
            .unwrap();

        let result = &log.results()[0];
        assert_eq!(result.template, "comprehension");
        assert_eq!(result.prompt_mode, PromptMode::ExamplesOnly);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_corpus_is_skipped_not_scored() {
        let dir = corpus(&[(&PY, "01-a.py", "a = 1\n")]);
        let orch = orchestrator(dir.path(), vec![Ok("x".into())], one_trial());
        let task = find_task("data_transform").unwrap();
        let mut log = RunLog::new();

        orch.run(&[ILO, PY], std::slice::from_ref(task), &mut log).await.unwrap();

        assert_eq!(log.skipped().len(), 1);
        assert_eq!(log.skipped()[0].notation, "idea1");
        assert_eq!(log.results().len(), 1);
        assert_eq!(log.results()[0].notation, "python-baseline");
        assert_eq!(orch.caller.generator().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_spec_mode_without_spec_is_missing() {
        let dir = corpus(&[(&PY, "01-a.py", "a = 1\n")]);
        let config = HarnessConfig {
            prompt_mode: PromptMode::SpecOnly,
            ..Default::default()
        };
        let orch = orchestrator(dir.path(), Vec::new(), config);

        let prepared = orch.prepare(&PY, find_task("workflow").unwrap()).unwrap();
        assert_eq!(prepared, PreparedPrompt::Missing("no specification".to_string()));
    }

    #[test]
    fn test_spec_and_examples_prompt() {
        let dir = corpus(&[(&ILO, "01-a.ilo", "a=1\n"), (&ILO, "SPEC.md", "Prefix operators.\n")]);
        let config = HarnessConfig {
            prompt_mode: PromptMode::SpecAndExamples,
            ..Default::default()
        };
        let orch = orchestrator(dir.path(), Vec::new(), config);

        match orch.prepare(&ILO, find_task("workflow").unwrap()).unwrap() {
            PreparedPrompt::Ready { template, text } => {
                assert_eq!(template, TemplateKind::SpecAndExamples);
                assert!(text.contains("Prefix operators."));
                assert!(text.contains("### 01-a.ilo"));
            }
            other => panic!("expected prompt, got {:?}", other),
        }
    }

    #[test]
    fn test_comprehension_uses_subject_example() {
        let dir = corpus(&[
            (&ILO, "01-a.ilo", "a=1\n"),
            (&ILO, "05-workflow.ilo", "-- checkout\nchk pid amt\n"),
        ]);
        let config = HarnessConfig {
            example_mode: ExampleMode::FirstOnly,
            ..Default::default()
        };
        let orch = orchestrator(dir.path(), Vec::new(), config);

        match orch.prepare(&ILO, find_task("explain_workflow").unwrap()).unwrap() {
            PreparedPrompt::Ready { template, text } => {
                assert_eq!(template, TemplateKind::Comprehension);
                assert!(text.contains("chk pid amt"));
                assert!(!text.contains("a=1"));
            }
            other => panic!("expected prompt, got {:?}", other),
        }

        let empty = corpus(&[(&ILO, "01-a.ilo", "a=1\n")]);
        let orch = orchestrator(empty.path(), Vec::new(), HarnessConfig::default());
        assert_eq!(
            orch.prepare(&ILO, find_task("explain_workflow").unwrap()).unwrap(),
            PreparedPrompt::Missing("no example 05".to_string())
        );
    }

    #[test]
    fn test_first_only_prompt_excludes_later_examples() {
        let dir = corpus(&[(&ILO, "01-a.ilo", "first=1\n"), (&ILO, "02-b.ilo", "second=2\n")]);
        let orch = orchestrator(dir.path(), Vec::new(), HarnessConfig::quick());

        match orch.prepare(&ILO, find_task("workflow").unwrap()).unwrap() {
            PreparedPrompt::Ready { text, .. } => {
                assert!(text.contains("first=1"));
                assert!(!text.contains("second=2"));
            }
            other => panic!("expected prompt, got {:?}", other),
        }
    }

    #[test]
    fn test_retry_policy_flows_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = HarnessConfig {
            retry: RetryPolicy {
                attempts_max: 2,
                ..Default::default()
            },
            ..Default::default()
        };
        let orch = orchestrator(dir.path(), Vec::new(), config);
        assert_eq!(orch.caller.policy().attempts_max, 2);
    }
}
