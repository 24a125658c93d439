//! text2cypher-rag CLI: ask the movie graph one question
//!
//! Reads the graph store and language-model settings from the environment
//! (and a `.env` file when present), prompts for a question, and prints the
//! answer, the generated Cypher and the records it returned.

use clap::Parser;
use text2cypher_rag::config::{LLM_MODEL, LLM_PROVIDER, NEO4J_DATABASE};
use text2cypher_rag::{
    input, run_once, ExemplarSet, HttpModelProvider, LayeredEnv, Neo4jProvider, OutputFormat,
    ProcessEnv, QuestionSource, RagResult, SchemaDescription, ScriptedQuestions,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "text2cypher-rag", version, about = "Answer questions over a Neo4j movie graph")]
struct Cli {
    /// Answer this question instead of prompting on stdin
    #[arg(short, long)]
    question: Option<String>,

    /// Output format
    #[arg(long, default_value = "text")]
    format: Format,

    /// LLM provider (openai, ollama, gemini); overrides LLM_PROVIDER
    #[arg(long)]
    provider: Option<String>,

    /// Model name; overrides LLM_MODEL
    #[arg(long)]
    model: Option<String>,

    /// Neo4j database name; overrides NEO4J_DATABASE
    #[arg(long)]
    database: Option<String>,

    /// Print the built-in schema and exemplars, then exit
    #[arg(long)]
    print_schema: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, clap::ValueEnum)]
enum Format {
    Text,
    Json,
    Table,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
            Format::Table => OutputFormat::Table,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG may come from .env
    let dotenv = dotenvy::dotenv();
    init_tracing(cli.verbose);
    if let Err(e) = dotenv {
        if !e.not_found() {
            warn!(error = %e, "failed to load .env file");
        }
    }

    if cli.print_schema {
        print_schema();
        return;
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error ({} stage): {}", e.stage(), e);
        std::process::exit(e.stage().exit_code());
    }
}

/// `RUST_LOG` wins over the verbosity flag
fn log_filter(verbose: u8) -> EnvFilter {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn init_tracing(verbose: u8) {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose))
        .with_writer(std::io::stderr)
        .init();
}

fn print_schema() {
    println!("{}", SchemaDescription::movies());
    println!("{}", ExemplarSet::movies().to_prompt_text());
}

async fn run(cli: Cli) -> RagResult<()> {
    let process_env = ProcessEnv;
    let env = LayeredEnv::new(&process_env)
        .set(LLM_PROVIDER, cli.provider)
        .set(LLM_MODEL, cli.model)
        .set(NEO4J_DATABASE, cli.database);

    let mut scripted;
    let mut interactive;
    let source: &mut dyn QuestionSource = match cli.question {
        Some(question) => {
            scripted = ScriptedQuestions::new([question]);
            &mut scripted
        }
        None => {
            interactive = input::stdin();
            &mut interactive
        }
    };

    let mut stdout = std::io::stdout();
    run_once(
        &env,
        &Neo4jProvider,
        &HttpModelProvider,
        cli.format.into(),
        source,
        &mut stdout,
    )
    .await?;
    Ok(())
}
