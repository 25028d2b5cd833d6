//! Graphwright CLI - generate graph-orchestration code and graph IR from
//! descriptions and diagrams.
//!
//! This CLI provides a `graphwright` command that runs the code-generation
//! workflow, maintains the reference documentation cache, predicts graph IR
//! documents and scores them.

mod commands;
mod config;

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{create, ingest, predict, score};

/// Graphwright - diagrams and descriptions to LangGraph code
#[derive(Parser, Debug)]
#[command(
    name = "graphwright",
    author,
    version,
    about = "Graphwright - diagrams and descriptions to LangGraph code",
    long_about = "Graphwright turns a text description or a diagram into LangGraph code through a generate, lint and fix loop,\nand extracts graph-structured JSON from diagrams and notebooks."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Configuration file layered over the global and local ones
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate code from a description and an optional diagram
    ///
    /// Runs the route, generate, format, lint and fix workflow and writes the
    /// final code to the output file or stdout.
    Create {
        /// Description of the application to build
        description: String,

        /// Diagram image used as the base for the graph
        #[arg(long)]
        diagram: Option<PathBuf>,

        /// File the code is written to (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Model engine (openai, universal, mock)
        #[arg(long)]
        engine: Option<String>,

        /// Model used for code generation
        #[arg(long)]
        model: Option<String>,

        /// Lint reports after which the fix loop stops
        #[arg(long)]
        max_tries: Option<usize>,
    },

    /// Rebuild the reference documentation cache
    Ingest {
        /// Print the ingested documents instead of writing them to file
        #[arg(long)]
        dry_run: bool,
    },

    /// Extract graph JSON from diagrams or notebooks
    ///
    /// Writes one JSON line per input with either a `schema` or an `error`.
    Predict {
        /// Image, notebook or text files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// JSONL file the results are written to (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Inputs predicted at the same time
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Score a predicted graph against an expected one
    Score {
        /// Predicted graph JSON
        predicted: PathBuf,

        /// Expected graph JSON
        expected: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let app_config = config::load_config(args.config.as_deref())?;

    // Initialize tracing
    let level = match args.log_level.as_deref().or(app_config.log_level.as_deref()).unwrap_or("info") {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // If no command provided, show help
    let Some(command) = args.command else {
        Args::command().print_help()?;
        return Ok(());
    };

    match command {
        Command::Create { description, diagram, output, engine, model, max_tries } => {
            let options = create::CreateOptions { description, diagram, output, engine, model, max_tries };
            create::execute(app_config, options).await?;
        }
        Command::Ingest { dry_run } => {
            ingest::execute(&app_config, dry_run).await?;
        }
        Command::Predict { inputs, output, concurrency } => {
            predict::execute(&app_config, &inputs, output.as_deref(), concurrency).await?;
        }
        Command::Score { predicted, expected, json } => {
            score::execute(&predicted, &expected, json)?;
        }
    }

    Ok(())
}
