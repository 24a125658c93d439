//! Orchestration
//!
//! One question, one answer. The pipeline opens the graph store connection,
//! wires the synthesizer and composer around it, answers the question, prints
//! the result and releases the connection on every exit path.

use std::io::Write;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{AppConfig, EnvSource};
use crate::error::{RagError, RagResult, SynthesisError};
use crate::graph::{ConnectionProvider, GraphConnection};
use crate::input::QuestionSource;
use crate::llm::{ModelProvider, ModelRole};
use crate::nlq::Text2CypherSynthesizer;
use crate::output::{render, OutputFormat};
use crate::rag::{AnswerComposer, AnswerResult, GraphRag};
use crate::schema::{ExemplarSet, SchemaDescription};

/// Lifecycle of a run; transitions only move forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineState {
    Unstarted,
    Connected,
    Synthesizing,
    Answered,
    Closed,
}

pub struct Pipeline<'a> {
    config: &'a AppConfig,
    connections: &'a dyn ConnectionProvider,
    models: &'a dyn ModelProvider,
    schema: SchemaDescription,
    exemplars: ExemplarSet,
    format: OutputFormat,
    state: PipelineState,
}

impl<'a> Pipeline<'a> {
    /// A pipeline over the built-in movie schema and exemplars
    pub fn new(
        config: &'a AppConfig,
        connections: &'a dyn ConnectionProvider,
        models: &'a dyn ModelProvider,
    ) -> Self {
        Self {
            config,
            connections,
            models,
            schema: SchemaDescription::movies(),
            exemplars: ExemplarSet::movies(),
            format: OutputFormat::Text,
            state: PipelineState::Unstarted,
        }
    }

    pub fn with_registry(mut self, schema: SchemaDescription, exemplars: ExemplarSet) -> Self {
        self.schema = schema;
        self.exemplars = exemplars;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn transition(&mut self, next: PipelineState) {
        debug_assert!(next > self.state, "{:?} -> {:?}", self.state, next);
        info!(from = ?self.state, to = ?next, "pipeline state");
        self.state = next;
    }

    /// Answer one question and print the result to `out`.
    ///
    /// Once the connection is open it is closed exactly once, whether or
    /// not the later steps succeed.
    pub async fn run(
        &mut self,
        input: &mut dyn QuestionSource,
        out: &mut dyn Write,
    ) -> RagResult<AnswerResult> {
        if self.state != PipelineState::Unstarted {
            return Err(RagError::Input("a pipeline answers a single question".to_string()));
        }
        let connection = self.connections.open(&self.config.connection).await?;
        self.transition(PipelineState::Connected);

        let outcome = self.run_connected(Arc::clone(&connection), input, out).await;

        if let Err(e) = connection.close().await {
            warn!(error = %e, "failed to close graph store connection");
        }
        self.transition(PipelineState::Closed);

        if let Err(e) = &outcome {
            warn!(stage = %e.stage(), error = %e, "pipeline aborted");
        }
        outcome
    }

    async fn run_connected(
        &mut self,
        connection: Arc<dyn GraphConnection>,
        input: &mut dyn QuestionSource,
        out: &mut dyn Write,
    ) -> RagResult<AnswerResult> {
        let query_model = self
            .models
            .build(ModelRole::Synthesis, &self.config.llm)
            .map_err(SynthesisError::from)?;
        let synthesizer = Text2CypherSynthesizer::new(
            query_model,
            connection,
            self.schema.clone(),
            self.exemplars.clone(),
        );

        let answer_model = self
            .models
            .build(ModelRole::Answer, &self.config.llm)
            .map_err(|e| RagError::Generation(e.to_string()))?;
        let composer = GraphRag::new(synthesizer, answer_model);

        let question = input.next_question()?;
        info!(%question, "received question");
        self.transition(PipelineState::Synthesizing);

        let result = composer.answer(&question, true).await?;
        self.transition(PipelineState::Answered);

        render(&result, self.format, out)?;
        Ok(result)
    }
}

/// Load configuration from `env` and answer one question.
///
/// Configuration errors surface before any connection is attempted.
pub async fn run_once(
    env: &dyn EnvSource,
    connections: &dyn ConnectionProvider,
    models: &dyn ModelProvider,
    format: OutputFormat,
    input: &mut dyn QuestionSource,
    out: &mut dyn Write,
) -> RagResult<AnswerResult> {
    let config = AppConfig::from_env(env)?;
    info!(config = ?config, "configuration loaded");
    let mut pipeline = Pipeline::new(&config, connections, models).with_format(format);
    let answer = pipeline.run(input, out).await?;
    Ok(answer)
}
