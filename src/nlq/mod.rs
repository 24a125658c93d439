//! Natural Language Querying (NLQ)
//!
//! Text-to-Cypher translation: the language model is prompted with the graph
//! schema and the worked exemplars, and its reply is cleaned and checked
//! before anything reaches the store.

use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

use crate::error::{RagResult, SynthesisError};
use crate::graph::GraphConnection;
use crate::llm::{LanguageModel, Prompt};
use crate::schema::{ExemplarSet, SchemaDescription};

const SYSTEM_PROMPT: &str = "You are an expert in translating questions into Neo4j Cypher queries.";

/// Turns a question into a Cypher query
#[async_trait]
pub trait QuerySynthesizer: Send + Sync {
    async fn synthesize(&self, question: &str) -> RagResult<String>;

    /// Connection the synthesized queries are meant to run against
    fn connection(&self) -> &Arc<dyn GraphConnection>;
}

/// LLM-backed synthesizer for a fixed schema and exemplar set
pub struct Text2CypherSynthesizer {
    model: Arc<dyn LanguageModel>,
    connection: Arc<dyn GraphConnection>,
    schema: SchemaDescription,
    exemplars: ExemplarSet,
}

impl Text2CypherSynthesizer {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        connection: Arc<dyn GraphConnection>,
        schema: SchemaDescription,
        exemplars: ExemplarSet,
    ) -> Self {
        Self {
            model,
            connection,
            schema,
            exemplars,
        }
    }

    pub fn schema(&self) -> &SchemaDescription {
        &self.schema
    }

    pub fn build_prompt(&self, question: &str) -> Prompt {
        let examples = if self.exemplars.is_empty() {
            "(none)".to_string()
        } else {
            self.exemplars.to_prompt_text()
        };

        let user = format!(
            "Task: Generate a Cypher statement for querying a Neo4j graph database from a user question.

Schema:
{}
Examples:
{}

Question:
{}

Use only the node labels, relationship types and properties declared in the schema.
The statement must be read-only.
Return ONLY the Cypher statement, no markdown, no explanations.

Cypher:",
            self.schema.to_prompt_text(),
            examples,
            question.trim()
        );

        Prompt::new(SYSTEM_PROMPT, user)
    }

    /// Reject replies that would write or that step outside the schema
    pub fn validate(&self, cypher: &str) -> Result<(), SynthesisError> {
        if cypher.is_empty() {
            return Err(SynthesisError::EmptyQuery);
        }
        if let Some(clause) = find_write_clause(cypher) {
            return Err(SynthesisError::UnsafeQuery(clause));
        }
        for label in node_labels(cypher) {
            if !self.schema.has_label(&label) {
                return Err(SynthesisError::UndeclaredElement { kind: "label", name: label });
            }
        }
        for rel_type in relationship_types(cypher) {
            if !self.schema.has_relationship(&rel_type) {
                return Err(SynthesisError::UndeclaredElement {
                    kind: "relationship type",
                    name: rel_type,
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl QuerySynthesizer for Text2CypherSynthesizer {
    async fn synthesize(&self, question: &str) -> RagResult<String> {
        let prompt = self.build_prompt(question);
        debug!(prompt = %prompt.user, "text-to-cypher prompt");

        let reply = self
            .model
            .invoke(&prompt)
            .await
            .map_err(SynthesisError::from)?;
        let cypher = extract_cypher(&reply);
        self.validate(&cypher)?;

        info!(%cypher, "synthesized query");
        Ok(cypher)
    }

    fn connection(&self) -> &Arc<dyn GraphConnection> {
        &self.connection
    }
}

/// Extract the Cypher statement from a model reply that may be wrapped in a
/// markdown fence or prefixed with a `Cypher:` tag.
pub fn extract_cypher(reply: &str) -> String {
    let mut text = reply.trim();

    if let Some(start) = text.find("```") {
        let after_fence = &text[start + 3..];
        // Skip a language tag such as "cypher"
        let body_start = match after_fence.find('\n') {
            Some(i) if after_fence[..i].trim().chars().all(|c| c.is_ascii_alphanumeric()) => i + 1,
            _ => 0,
        };
        let body = &after_fence[body_start..];
        text = match body.find("```") {
            Some(end) => &body[..end],
            None => body,
        };
        text = text.trim();
    }

    if let Some(tag) = text.get(..7) {
        if tag.eq_ignore_ascii_case("cypher:") {
            text = text[7..].trim_start();
        }
    }

    let text = text.trim();
    text.strip_suffix(';').unwrap_or(text).trim_end().to_string()
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex"))
}

/// Replace string literals so their contents are not mistaken for clauses
fn strip_string_literals(cypher: &str) -> String {
    static LITERALS: OnceLock<Regex> = OnceLock::new();
    regex(&LITERALS, r#"'(?:[^'\\]|\\.)*'|"(?:[^"\\]|\\.)*""#)
        .replace_all(cypher, "''")
        .into_owned()
}

/// First write clause in the query, upper-cased
fn find_write_clause(cypher: &str) -> Option<String> {
    static WRITES: OnceLock<Regex> = OnceLock::new();
    let re = regex(
        &WRITES,
        r"(?i)(?:^|[^.\w])(CREATE|MERGE|SET|DELETE|DETACH|REMOVE|DROP|LOAD\s+CSV)\b",
    );
    let stripped = strip_string_literals(cypher);
    re.captures(&stripped).map(|caps| {
        caps[1]
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase()
    })
}

fn split_names(group: &str) -> impl Iterator<Item = String> + '_ {
    group
        .split(|c| c == ':' || c == '|' || c == '&')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// Labels used in node patterns such as `(m:Movie)` or `(:Person:Actor)`
pub fn node_labels(cypher: &str) -> Vec<String> {
    static NODES: OnceLock<Regex> = OnceLock::new();
    let re = regex(
        &NODES,
        r"\(\s*(?:[A-Za-z_][A-Za-z0-9_]*)?\s*:\s*([A-Za-z_][A-Za-z0-9_]*(?:\s*[:|&]\s*[A-Za-z_][A-Za-z0-9_]*)*)",
    );
    let stripped = strip_string_literals(cypher);
    re.captures_iter(&stripped)
        .flat_map(|caps| split_names(&caps[1]).collect::<Vec<_>>())
        .collect()
}

/// Relationship types used in patterns such as `[r:RATED]` or `[:ACTED_IN|DIRECTED]`
pub fn relationship_types(cypher: &str) -> Vec<String> {
    static RELS: OnceLock<Regex> = OnceLock::new();
    let re = regex(
        &RELS,
        r"\[\s*(?:[A-Za-z_][A-Za-z0-9_]*)?\s*:\s*([A-Za-z_][A-Za-z0-9_]*(?:\s*\|\s*:?\s*[A-Za-z_][A-Za-z0-9_]*)*)",
    );
    let stripped = strip_string_literals(cypher);
    re.captures_iter(&stripped)
        .flat_map(|caps| split_names(&caps[1]).collect::<Vec<_>>())
        .collect()
}
