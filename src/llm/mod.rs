//! Language-model access
//!
//! Both query synthesis and answer summarization go through the
//! [`LanguageModel`] trait. [`client::HttpLanguageModel`] talks to the
//! configured provider over HTTP.

pub mod client;

use crate::config::LlmConfig;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM API error: {0}")]
    ApiError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type LlmResult<T> = Result<T, LlmError>;

/// One completion request
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Return the model's text reply to `prompt`
    async fn invoke(&self, prompt: &Prompt) -> LlmResult<String>;
}

/// What a model instance is used for; selects its sampling settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    Synthesis,
    Answer,
}

/// Builds the language models the pipeline needs
pub trait ModelProvider: Send + Sync {
    fn build(&self, role: ModelRole, config: &LlmConfig) -> LlmResult<Arc<dyn LanguageModel>>;
}

/// Provider backed by [`client::HttpLanguageModel`]
pub struct HttpModelProvider;

impl ModelProvider for HttpModelProvider {
    fn build(&self, role: ModelRole, config: &LlmConfig) -> LlmResult<Arc<dyn LanguageModel>> {
        let temperature = match role {
            ModelRole::Synthesis => config.synthesis_temperature,
            ModelRole::Answer => config.answer_temperature,
        };
        Ok(Arc::new(client::HttpLanguageModel::new(config, temperature)?))
    }
}
