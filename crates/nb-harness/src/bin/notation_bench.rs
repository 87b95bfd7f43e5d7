//! CLI for the notation benchmark.
//!
//! # Usage
//!
//! ```bash
//! # Token comparison across the corpus
//! notation-bench sizes --corpus examples
//!
//! # Evaluate two notations on one task, one trial each
//! notation-bench run --corpus examples --notation python-baseline --notation idea1 \
//!     --task decision_logic --quick
//!
//! # Summarize or re-score a saved log
//! notation-bench report results/run.jsonl
//! notation-bench rescore results/run.jsonl --output results/rescored.jsonl
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use nb_checks::{count_changed, find_task, registry, rescore, Task};
use nb_core::{
    ConfigError, CorpusError, CorpusLoader, ExampleMode, Notation, PromptMode, RunLog,
    RunLogError, RunLogWriter, SizeMeter,
};
use nb_harness::{
    init_tracing, ClaudeClient, ClientError, HarnessConfig, HarnessError, TrialOrchestrator,
};
use nb_report::{summarize, write_summary, ReportError, RunSummary, SizeComparison};
use tracing::{error, info, Level};

#[derive(Parser)]
#[command(name = "notation-bench")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compare program notations by size and by how well a model writes them", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare corpus token counts against the baseline notation
    Sizes {
        /// Corpus root holding one directory per notation
        #[arg(short, long, default_value = "examples")]
        corpus: PathBuf,

        /// Restrict to these notations (default: all)
        #[arg(short, long)]
        notation: Vec<String>,
    },

    /// Run trials against the generation service
    Run {
        /// Corpus root holding one directory per notation
        #[arg(short, long, default_value = "examples")]
        corpus: PathBuf,

        /// Restrict to these notations (default: all)
        #[arg(short, long)]
        notation: Vec<String>,

        /// Restrict to these tasks (default: all)
        #[arg(short, long)]
        task: Vec<String>,

        /// How prompts draw on the corpus
        #[arg(short, long, value_enum, default_value_t = ModeArg::ExamplesOnly)]
        mode: ModeArg,

        /// Trials per (notation, task) pair
        #[arg(short = 'n', long)]
        trials: Option<u32>,

        /// Include only the first example of each notation
        #[arg(long)]
        first_only: bool,

        /// Output token budget per call
        #[arg(long)]
        max_output_tokens: Option<u32>,

        /// One trial per pair, first example only
        #[arg(long, conflicts_with = "thorough")]
        quick: bool,

        /// Five trials per pair
        #[arg(long)]
        thorough: bool,

        /// Run log (JSON Lines); appended to, never truncated
        #[arg(short, long, default_value = "results/run.jsonl")]
        output: PathBuf,

        /// Text summary; a JSON copy is written alongside
        #[arg(short, long, default_value = "results/summary.txt")]
        summary: PathBuf,
    },

    /// Recompute checks for a saved log with the current checkers
    Rescore {
        /// Run log to re-score
        log: PathBuf,

        /// Where to write the re-scored log (default: print summary only)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Summarize a saved log
    Report {
        /// Run log to summarize
        log: PathBuf,

        /// Also write the summary (and its JSON copy) here
        #[arg(short, long)]
        summary: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    ExamplesOnly,
    SpecOnly,
    SpecAndExamples,
}

impl From<ModeArg> for PromptMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::ExamplesOnly => PromptMode::ExamplesOnly,
            ModeArg::SpecOnly => PromptMode::SpecOnly,
            ModeArg::SpecAndExamples => PromptMode::SpecAndExamples,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("Unknown notation: {0}")]
    UnknownNotation(String),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(
        "{0}\n\nMake sure ANTHROPIC_API_KEY is set:\n  export ANTHROPIC_API_KEY=sk-ant-..."
    )]
    Client(#[from] ClientError),

    #[error(transparent)]
    Corpus(#[from] CorpusError),

    #[error(transparent)]
    Harness(#[from] HarnessError),

    #[error(transparent)]
    RunLog(#[from] RunLogError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    init_tracing(cli.log_json, level);

    let outcome = match cli.command {
        Commands::Sizes { corpus, notation } => cmd_sizes(&corpus, &notation),
        Commands::Run {
            corpus,
            notation,
            task,
            mode,
            trials,
            first_only,
            max_output_tokens,
            quick,
            thorough,
            output,
            summary,
        } => {
            let mut config = if quick {
                HarnessConfig::quick()
            } else if thorough {
                HarnessConfig::thorough()
            } else {
                HarnessConfig::default()
            };
            config.prompt_mode = mode.into();
            if let Some(trials) = trials {
                config.trials = trials;
            }
            if first_only {
                config.example_mode = ExampleMode::FirstOnly;
            }
            if let Some(max) = max_output_tokens {
                config.max_output_tokens = max;
            }
            cmd_run(&corpus, &notation, &task, config, &output, &summary).await
        }
        Commands::Rescore { log, output } => cmd_rescore(&log, output.as_deref()),
        Commands::Report { log, summary } => cmd_report(&log, summary.as_deref()),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_sizes(corpus: &Path, notation_ids: &[String]) -> Result<(), CliError> {
    let notations = select_notations(notation_ids)?;
    let meter = SizeMeter::cl100k()?;
    let sizes = size_comparison(&CorpusLoader::new(corpus), &meter, &notations)?;
    println!("{}", sizes.format_report());
    Ok(())
}

async fn cmd_run(
    corpus: &Path,
    notation_ids: &[String],
    task_ids: &[String],
    config: HarnessConfig,
    output: &Path,
    summary_path: &Path,
) -> Result<(), CliError> {
    let notations = select_notations(notation_ids)?;
    let tasks = select_tasks(task_ids)?;

    // Both are configuration errors and must fail before any call is made.
    let meter = SizeMeter::cl100k()?;
    let client = ClaudeClient::from_env()?;

    let pairs = notations.len() * tasks.len();
    info!(
        model = %client.config().model,
        pairs,
        calls = config.calls_for(pairs),
        "starting evaluation"
    );

    let loader = CorpusLoader::new(corpus);
    let orchestrator = TrialOrchestrator::new(client, loader.clone(), meter, config);

    let mut writer = RunLogWriter::open(output)?;
    let mut log = RunLog::new();
    let outcome = orchestrator
        .run_recorded(&notations, &tasks, &mut log, &mut writer)
        .await;
    info!(
        path = %writer.path().display(),
        results = log.results().len(),
        skipped = log.skipped().len(),
        "run log appended"
    );
    outcome?;

    let sizes = size_comparison(&loader, orchestrator.meter(), &notations)?;
    let summary = summarize(&log)?.with_sizes(sizes);
    write_summary(summary_path, &summary)?;
    print_summary(&summary);
    Ok(())
}

fn cmd_rescore(log_path: &Path, output: Option<&Path>) -> Result<(), CliError> {
    let log = RunLog::read_jsonl(log_path)?;
    let rescored = rescore(&log);

    let changed = count_changed(&log, &rescored);
    info!(
        trials = rescored.results().len(),
        changed,
        "log re-scored"
    );

    if let Some(path) = output {
        rescored.write_jsonl(path)?;
    }
    print_summary(&summarize(&rescored)?);
    Ok(())
}

fn cmd_report(log_path: &Path, summary_path: Option<&Path>) -> Result<(), CliError> {
    let log = RunLog::read_jsonl(log_path)?;
    let summary = summarize(&log)?;
    if let Some(path) = summary_path {
        write_summary(path, &summary)?;
    }
    print_summary(&summary);
    Ok(())
}

fn select_notations(ids: &[String]) -> Result<Vec<Notation>, CliError> {
    if ids.is_empty() {
        return Ok(Notation::catalog().to_vec());
    }
    ids.iter()
        .map(|id| Notation::find(id).ok_or_else(|| CliError::UnknownNotation(id.clone())))
        .collect()
}

fn select_tasks(ids: &[String]) -> Result<Vec<Task>, CliError> {
    if ids.is_empty() {
        return Ok(registry().to_vec());
    }
    ids.iter()
        .map(|id| {
            find_task(id)
                .copied()
                .ok_or_else(|| CliError::UnknownTask(id.clone()))
        })
        .collect()
}

fn size_comparison(
    loader: &CorpusLoader,
    meter: &SizeMeter,
    notations: &[Notation],
) -> Result<SizeComparison, CorpusError> {
    let inventories = notations
        .iter()
        .map(|n| Ok((n.id.to_string(), loader.size_inventory(n, meter)?)))
        .collect::<Result<Vec<_>, CorpusError>>()?;
    Ok(SizeComparison::from_inventories(meter.encoding_name(), inventories))
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("{}", summary.format_report());
}
