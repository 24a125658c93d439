//! Retrieval-augmented answering
//!
//! [`GraphRag`] synthesizes a query, runs it against the graph store and asks
//! the language model to summarize the rows into an answer.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{RagError, RagResult};
use crate::graph::Record;
use crate::llm::{LanguageModel, Prompt};
use crate::nlq::QuerySynthesizer;

/// Answer given when the generated query matches nothing
pub const NO_RESULTS_ANSWER: &str =
    "I couldn't find any matching records in the graph to answer that question.";

const SYSTEM_PROMPT: &str = "Answer the user question using the provided context.";

/// The query that was run and the rows it returned
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalContext {
    pub generated_query: String,
    pub raw_items: Vec<Record>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerResult {
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<RetrievalContext>,
}

/// Answers a question end to end
#[async_trait]
pub trait AnswerComposer: Send + Sync {
    /// With `return_context` the result carries the generated query and raw rows.
    async fn answer(&self, question: &str, return_context: bool) -> RagResult<AnswerResult>;
}

pub struct GraphRag<S> {
    synthesizer: S,
    model: Arc<dyn LanguageModel>,
}

impl<S: QuerySynthesizer> GraphRag<S> {
    pub fn new(synthesizer: S, model: Arc<dyn LanguageModel>) -> Self {
        Self { synthesizer, model }
    }

    pub fn build_prompt(question: &str, records: &[Record]) -> Prompt {
        let context: Vec<String> = records
            .iter()
            .map(|r| serde_json::to_string(r).unwrap_or_default())
            .collect();

        let user = format!(
            "Context:
{}

Question:
{}

Answer:",
            context.join("\n"),
            question.trim()
        );
        Prompt::new(SYSTEM_PROMPT, user)
    }
}

#[async_trait]
impl<S: QuerySynthesizer> AnswerComposer for GraphRag<S> {
    async fn answer(&self, question: &str, return_context: bool) -> RagResult<AnswerResult> {
        let cypher = self.synthesizer.synthesize(question).await?;
        let result = self.synthesizer.connection().execute(&cypher).await?;
        info!(rows = result.len(), "retrieved records");

        let answer = if result.is_empty() {
            NO_RESULTS_ANSWER.to_string()
        } else {
            let prompt = Self::build_prompt(question, &result.records);
            debug!(prompt = %prompt.user, "answer prompt");
            let reply = self
                .model
                .invoke(&prompt)
                .await
                .map_err(|e| RagError::Generation(e.to_string()))?;
            let reply = reply.trim();
            if reply.is_empty() {
                return Err(RagError::Generation("language model returned an empty answer".to_string()));
            }
            reply.to_string()
        };

        let context = return_context.then(|| RetrievalContext {
            generated_query: cypher,
            raw_items: result.records,
        });
        Ok(AnswerResult { answer, context })
    }
}
