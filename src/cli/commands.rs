//! CLI command definitions for quiz_forge.
//!
//! Every command maps to one coordinator operation and prints JSON: the
//! task's status view (or results) on success, `{"error": "..."}` on failure.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use serde_json::json;
use tracing::{info, warn};

use crate::error::LlmError;
use crate::llm::{ChatCompletionsClient, GenerationRequest, GenerationResponse, LlmProvider};
use crate::pipeline::{
    parse_question_types, PipelineConfig, PipelineCoordinator, PipelineError, Stage,
};
use crate::storage::{FileTaskStore, TaskStore};

/// Multi-stage authoring and validation of multiple-choice questions.
#[derive(Parser, Debug)]
#[command(name = "quiz-forge")]
#[command(about = "Author and validate multiple-choice questions with a staged LLM pipeline")]
#[command(version)]
#[command(
    long_about = "quiz_forge drives a task through four stages: content (question authoring), rt (technical review), de (design review) and validator (final entries, reports and final document).\n\nExample usage:\n  quiz-forge create --objectives-file objetivos.txt --theory-file teoria.md\n  quiz-forge run <TASK_ID>\n  quiz-forge results <TASK_ID> --export"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// Directory holding task files and exported results.
    #[arg(long, env = "QUIZ_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Directory with template, rubric and stopword overrides.
    #[arg(long, env = "QUIZ_TEMPLATES_DIR", global = true)]
    pub templates_dir: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Create a task from learning objectives and a theory text.
    Create(CreateArgs),

    /// Run exactly one stage of a task.
    Advance(AdvanceArgs),

    /// Run the remaining stages of a task until it completes.
    Run(TaskArgs),

    /// Show a task's status.
    Status(TaskArgs),

    /// Show a task's approved questions, reports and final document.
    Results(ResultsArgs),
}

/// Arguments for `quiz-forge create`.
#[derive(Parser, Debug)]
pub struct CreateArgs {
    /// Learning objectives, one "Obj.N: ..." marker per line.
    #[arg(long, conflicts_with = "objectives_file")]
    pub objectives: Option<String>,

    /// File containing the learning objectives.
    #[arg(long)]
    pub objectives_file: Option<PathBuf>,

    /// Theory text the questions are based on.
    #[arg(long, conflicts_with = "theory_file")]
    pub theory: Option<String>,

    /// File containing the theory text.
    #[arg(long)]
    pub theory_file: Option<PathBuf>,

    /// Comma-separated question types (single_answer, multiple_answer, assertion_reason).
    #[arg(short = 't', long)]
    pub types: Option<String>,
}

/// Arguments for `quiz-forge advance`.
#[derive(Parser, Debug)]
pub struct AdvanceArgs {
    /// Task identifier.
    pub task_id: String,

    /// Stage to run (content, rt, de, validator).
    pub stage: String,
}

/// Arguments naming one task.
#[derive(Parser, Debug)]
pub struct TaskArgs {
    /// Task identifier.
    pub task_id: String,
}

/// Arguments for `quiz-forge results`.
#[derive(Parser, Debug)]
pub struct ResultsArgs {
    /// Task identifier.
    pub task_id: String,

    /// Also write questions, reports and the final document under
    /// `<data_dir>/output/<task_id>/`.
    #[arg(long)]
    pub export: bool,
}

/// Parse CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<ExitCode> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
///
/// Operation failures are printed as `{"error": "..."}` and yield a
/// failing exit code; configuration problems are returned as errors.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = PipelineConfig::from_env()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(dir) = cli.templates_dir {
        config.templates_dir = Some(dir);
    }

    let store = FileTaskStore::new(&config.data_dir);
    let coordinator = PipelineCoordinator::from_config(
        &config,
        build_provider(),
        Arc::new(store.clone()) as Arc<dyn TaskStore>,
    )?;

    match execute(cli.command, &config, &coordinator, &store).await {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            warn!(error = %e, "Command failed");
            println!("{}", serde_json::to_string_pretty(&json!({ "error": e.to_string() }))?);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn execute(
    command: Commands,
    config: &PipelineConfig,
    coordinator: &PipelineCoordinator,
    store: &FileTaskStore,
) -> Result<serde_json::Value, PipelineError> {
    let value = match command {
        Commands::Create(args) => {
            let objectives = read_input(args.objectives, args.objectives_file.as_deref(), "objectives")?;
            let theory = read_input(args.theory, args.theory_file.as_deref(), "theory")?;
            let types = match args.types {
                Some(types) => parse_question_types(&types).map_err(PipelineError::InvalidInput)?,
                None => config.question_types.clone(),
            };
            let view = coordinator.create_task(&objectives, &theory, &types).await?;
            info!(task_id = %view.task_id, "Created task");
            to_value(&view)?
        }
        Commands::Advance(args) => {
            let stage: Stage = args.stage.parse().map_err(PipelineError::InvalidInput)?;
            to_value(&coordinator.advance(&args.task_id, stage).await?)?
        }
        Commands::Run(args) => to_value(&coordinator.run_all(&args.task_id).await?)?,
        Commands::Status(args) => to_value(&coordinator.status(&args.task_id).await?)?,
        Commands::Results(args) => {
            let results = coordinator.results(&args.task_id).await?;
            let mut value = to_value(&results)?;
            if args.export {
                let task = coordinator.task(&args.task_id).await?;
                let dir = store.export_results(&task).await?;
                value["exported_to"] = json!(dir.display().to_string());
            }
            value
        }
    };
    Ok(value)
}

fn read_input(inline: Option<String>, file: Option<&Path>, name: &str) -> Result<String, PipelineError> {
    match (inline, file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
            PipelineError::InvalidInput(format!("cannot read {} file {}: {}", name, path.display(), e))
        }),
        (None, None) => Err(PipelineError::InvalidInput(format!(
            "--{name} or --{name}-file is required"
        ))),
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, PipelineError> {
    serde_json::to_value(value)
        .map_err(|e| PipelineError::InvalidInput(format!("cannot encode output: {}", e)))
}

/// The chat-completions client from `LLM_*` variables.
///
/// Without `LLM_API_BASE` the commands that never generate still work;
/// any generation call then fails with a retryable error.
fn build_provider() -> Arc<dyn LlmProvider> {
    match ChatCompletionsClient::from_env() {
        Ok(client) => Arc::new(client),
        Err(e) => {
            warn!(error = %e, "LLM client not configured; generation is unavailable");
            Arc::new(UnconfiguredProvider)
        }
    }
}

struct UnconfiguredProvider;

#[async_trait]
impl LlmProvider for UnconfiguredProvider {
    async fn generate(&self, _request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        Err(LlmError::MissingApiBase)
    }
}
