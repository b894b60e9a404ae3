//! gap-guard command line.
//!
//! Validates saved LLM responses and inspects the effective configuration.
//!
//! ```text
//! gap-guard validate gaps response.json --paper paper.txt
//! gap-guard validate proposal proposal.json
//! gap-guard toxicity response.txt
//! gap-guard config --config guard.toml
//! ```
//!
//! Results go to stdout as JSON; logs go to stderr.
//! Exit codes: 0 accepted/clean, 1 rejected/toxic, 2 error.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use gap_guard::config::{load_config, GuardConfig};
use gap_guard::observability::logging;
use gap_guard::validation::{detect_toxicity, GapValidationOptions, ResponseValidator, ValidationTask};

#[derive(Parser)]
#[command(name = "gap-guard")]
#[command(about = "Validate LLM research-analysis responses", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a saved LLM response
    Validate {
        #[arg(value_enum)]
        task: TaskArg,

        /// File holding the raw response text
        file: PathBuf,

        /// Paper text to check gap claims against
        #[arg(long)]
        paper: Option<PathBuf>,

        /// Override the configured maximum number of gaps
        #[arg(long)]
        max_gaps: Option<usize>,
    },
    /// Scan a file for sensitive content
    Toxicity { file: PathBuf },
    /// Print the effective configuration
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum TaskArg {
    Gaps,
    Proposal,
    RedTeam,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            tracing::error!(error = %e, "gap-guard failed");
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

/// Returns whether the input passed.
fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GuardConfig::default(),
    };
    logging::init(&config.observability);

    match cli.command {
        Commands::Validate {
            task,
            file,
            paper,
            max_gaps,
        } => {
            let response = read(&file)?;
            let task = match task {
                TaskArg::Gaps => {
                    let mut options = GapValidationOptions::default();
                    if let Some(paper) = paper {
                        options = options.with_paper(read(&paper)?);
                    }
                    if let Some(max_gaps) = max_gaps {
                        options = options.with_max_gaps(max_gaps);
                    }
                    ValidationTask::GapExtraction(options)
                }
                TaskArg::Proposal => ValidationTask::ResearchProposal,
                TaskArg::RedTeam => ValidationTask::RedTeamAnalysis,
            };

            let validator = ResponseValidator::new(config.validator);
            let result = validator.validate(&task, &response);
            tracing::info!(
                task = task.name(),
                file = %file.display(),
                score = result.score,
                valid = result.is_valid,
                "Validation complete"
            );
            print_json(&result)?;
            Ok(result.is_valid)
        }
        Commands::Toxicity { file } => {
            let report = detect_toxicity(&read(&file)?);
            print_json(&report)?;
            Ok(!report.detected)
        }
        Commands::Config => {
            print_json(&config)?;
            Ok(true)
        }
    }
}

fn read(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    fs::read_to_string(path).map_err(|e| format!("cannot read {}: {}", path.display(), e).into())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
