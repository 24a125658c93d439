//! text2cypher-rag
//!
//! Answers a free-text question about a Neo4j movie graph: a language model
//! translates the question into Cypher, the query runs against the store, and
//! the rows are summarized into a natural-language answer.
//!
//! # Architecture
//!
//! - `config`: explicit configuration loaded once from an environment source
//! - `graph`: connection provider and the Neo4j HTTP transport
//! - `schema`: the static schema description and worked exemplars
//! - `llm`: language-model trait and HTTP providers (OpenAI, Ollama, Gemini)
//! - `nlq`: text-to-Cypher query synthesis and validation
//! - `rag`: retrieval-augmented answer composition
//! - `input` / `output`: question sources and result rendering
//! - `pipeline`: the single linear run, with guaranteed connection release
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use text2cypher_rag::{run_once, HttpModelProvider, Neo4jProvider, OutputFormat, ProcessEnv};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let mut input = text2cypher_rag::input::stdin();
//!     let mut out = std::io::stdout();
//!     let result = run_once(
//!         &ProcessEnv,
//!         &Neo4jProvider,
//!         &HttpModelProvider,
//!         OutputFormat::Text,
//!         &mut input,
//!         &mut out,
//!     )
//!     .await;
//!     if let Err(e) = result {
//!         eprintln!("{} failed: {}", e.stage(), e);
//!     }
//! }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod graph;
pub mod input;
pub mod llm;
pub mod nlq;
pub mod output;
pub mod pipeline;
pub mod rag;
pub mod schema;

pub use config::{AppConfig, ConnectionConfig, EnvSource, LLMProvider, LayeredEnv, LlmConfig, ProcessEnv};
pub use error::{RagError, RagResult, Stage, SynthesisError};
pub use graph::neo4j::{Neo4jConnection, Neo4jProvider};
pub use graph::{ConnectionProvider, GraphConnection, QueryResult, Record};
pub use input::{PromptedInput, QuestionSource, ScriptedQuestions, QUESTION_PROMPT};
pub use llm::{HttpModelProvider, LanguageModel, LlmError, LlmResult, ModelProvider, ModelRole, Prompt};
pub use nlq::{QuerySynthesizer, Text2CypherSynthesizer};
pub use output::OutputFormat;
pub use pipeline::{run_once, Pipeline, PipelineState};
pub use rag::{AnswerComposer, AnswerResult, GraphRag, RetrievalContext, NO_RESULTS_ANSWER};
pub use schema::{Exemplar, ExemplarSet, SchemaDescription};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
