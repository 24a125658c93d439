//! Pipeline error taxonomy
//!
//! Every failure aborts the single linear run. The variant records which
//! stage failed so the CLI can print a stage-specific diagnostic.

use std::fmt;
use thiserror::Error;

/// Pipeline stage a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Connection,
    Input,
    Synthesis,
    Execution,
    Generation,
    Output,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Config => "config",
            Stage::Connection => "connection",
            Stage::Input => "input",
            Stage::Synthesis => "synthesis",
            Stage::Execution => "execution",
            Stage::Generation => "generation",
            Stage::Output => "output",
        }
    }

    /// Process exit code reported by the CLI when this stage fails
    pub fn exit_code(&self) -> i32 {
        match self {
            Stage::Config => 2,
            Stage::Connection => 3,
            Stage::Input => 4,
            Stage::Synthesis => 5,
            Stage::Execution => 6,
            Stage::Generation => 7,
            Stage::Output => 8,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons query synthesis can fail
#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("language model call failed: {0}")]
    Model(#[from] crate::llm::LlmError),
    #[error("language model returned an empty query")]
    EmptyQuery,
    #[error("generated query contains write clause `{0}`")]
    UnsafeQuery(String),
    #[error("generated query references undeclared {kind} `{name}`")]
    UndeclaredElement { kind: &'static str, name: String },
}

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Input error: {0}")]
    Input(String),
    #[error("Synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),
    #[error("Execution error: {0}")]
    Execution(String),
    #[error("Generation error: {0}")]
    Generation(String),
    #[error("Output error: {0}")]
    Output(String),
}

impl RagError {
    pub fn stage(&self) -> Stage {
        match self {
            RagError::Config(_) => Stage::Config,
            RagError::Connection(_) => Stage::Connection,
            RagError::Input(_) => Stage::Input,
            RagError::Synthesis(_) => Stage::Synthesis,
            RagError::Execution(_) => Stage::Execution,
            RagError::Generation(_) => Stage::Generation,
            RagError::Output(_) => Stage::Output,
        }
    }
}

pub type RagResult<T> = Result<T, RagError>;
