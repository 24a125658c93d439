//! Process configuration
//!
//! Built once at process entry from an [`EnvSource`] and passed by reference
//! to every component that needs it.

use crate::error::{RagError, RagResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub const NEO4J_URI: &str = "NEO4J_URI";
pub const NEO4J_USERNAME: &str = "NEO4J_USERNAME";
pub const NEO4J_PASSWORD: &str = "NEO4J_PASSWORD";
pub const NEO4J_DATABASE: &str = "NEO4J_DATABASE";
pub const LLM_PROVIDER: &str = "LLM_PROVIDER";
pub const LLM_MODEL: &str = "LLM_MODEL";
pub const LLM_BASE_URL: &str = "LLM_BASE_URL";
pub const LLM_TIMEOUT_SECS: &str = "LLM_TIMEOUT_SECS";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";

const DEFAULT_DATABASE: &str = "neo4j";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Source of configuration variables
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Explicit values layered over another source
pub struct LayeredEnv<'a> {
    overrides: HashMap<String, String>,
    base: &'a dyn EnvSource,
}

impl<'a> LayeredEnv<'a> {
    pub fn new(base: &'a dyn EnvSource) -> Self {
        Self {
            overrides: HashMap::new(),
            base,
        }
    }

    /// Override `key` when `value` is present
    pub fn set(mut self, key: &str, value: Option<String>) -> Self {
        if let Some(value) = value {
            self.overrides.insert(key.to_string(), value);
        }
        self
    }
}

impl EnvSource for LayeredEnv<'_> {
    fn var(&self, key: &str) -> Option<String> {
        self.overrides.get(key).cloned().or_else(|| self.base.var(key))
    }
}

/// Read a variable, treating blank values as absent
fn lookup(env: &dyn EnvSource, key: &str) -> Option<String> {
    env.var(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn require(env: &dyn EnvSource, key: &str) -> RagResult<String> {
    lookup(env, key).ok_or_else(|| {
        RagError::Config(format!("required environment variable {} is not set", key))
    })
}

/// Graph store address and credentials
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub uri: String,
    pub username: String,
    pub password: String,
    pub database: String,
}

impl ConnectionConfig {
    pub fn from_env(env: &dyn EnvSource) -> RagResult<Self> {
        Ok(Self {
            uri: require(env, NEO4J_URI)?,
            username: require(env, NEO4J_USERNAME)?,
            password: require(env, NEO4J_PASSWORD)?,
            database: lookup(env, NEO4J_DATABASE).unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
        })
    }
}

// Keeps the password out of logs
impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("uri", &self.uri)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

/// Supported language-model backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LLMProvider {
    OpenAI,
    Ollama,
    Gemini,
}

impl LLMProvider {
    pub fn default_model(&self) -> &'static str {
        match self {
            LLMProvider::OpenAI => "gpt-4o",
            LLMProvider::Ollama => "llama3",
            LLMProvider::Gemini => "gemini-2.5-flash",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            LLMProvider::OpenAI => "https://api.openai.com/v1",
            LLMProvider::Ollama => "http://localhost:11434",
            LLMProvider::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        }
    }

    /// Environment variable holding the API key, if the provider needs one
    pub fn api_key_var(&self) -> Option<&'static str> {
        match self {
            LLMProvider::OpenAI => Some(OPENAI_API_KEY),
            LLMProvider::Ollama => None,
            LLMProvider::Gemini => Some(GEMINI_API_KEY),
        }
    }
}

impl FromStr for LLMProvider {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            "ollama" => Ok(LLMProvider::Ollama),
            "gemini" => Ok(LLMProvider::Gemini),
            other => Err(RagError::Config(format!(
                "unknown LLM provider '{}' (expected openai, ollama or gemini)",
                other
            ))),
        }
    }
}

/// Language-model backend settings shared by synthesis and answering
#[derive(Clone)]
pub struct LlmConfig {
    pub provider: LLMProvider,
    /// Model name (e.g., "gpt-4o", "llama3")
    pub model: String,
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub timeout_secs: u64,
    /// Temperature for Cypher generation
    pub synthesis_temperature: Option<f32>,
    /// Temperature for answer summarization; `None` leaves the provider default
    pub answer_temperature: Option<f32>,
}

impl LlmConfig {
    pub fn from_env(env: &dyn EnvSource) -> RagResult<Self> {
        let provider = match lookup(env, LLM_PROVIDER) {
            Some(value) => value.parse()?,
            None => LLMProvider::OpenAI,
        };
        let mut config = Self::for_provider(provider, env)?;
        if let Some(model) = lookup(env, LLM_MODEL) {
            config.model = model;
        }
        if let Some(raw) = lookup(env, LLM_TIMEOUT_SECS) {
            config.timeout_secs = raw.parse().map_err(|_| {
                RagError::Config(format!("{} must be a whole number of seconds, got '{}'", LLM_TIMEOUT_SECS, raw))
            })?;
        }
        Ok(config)
    }

    /// Provider-specific defaults plus the credential and base URL for `provider`
    pub fn for_provider(provider: LLMProvider, env: &dyn EnvSource) -> RagResult<Self> {
        let api_key = match provider.api_key_var() {
            Some(var) => Some(require(env, var)?),
            None => None,
        };

        let mut base_url = lookup(env, LLM_BASE_URL);
        if base_url.is_none() && provider == LLMProvider::OpenAI {
            base_url = lookup(env, OPENAI_BASE_URL);
        }
        let api_base_url = base_url
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| provider.default_base_url().to_string());

        Ok(Self {
            provider,
            model: provider.default_model().to_string(),
            api_key,
            api_base_url,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            synthesis_temperature: Some(0.0),
            answer_temperature: None,
        })
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("synthesis_temperature", &self.synthesis_temperature)
            .field("answer_temperature", &self.answer_temperature)
            .finish()
    }
}

/// Everything the pipeline needs, loaded once
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub connection: ConnectionConfig,
    pub llm: LlmConfig,
}

impl AppConfig {
    /// Load the full configuration. Fails with [`RagError::Config`] when any
    /// required variable is absent.
    pub fn from_env(env: &dyn EnvSource) -> RagResult<Self> {
        let connection = ConnectionConfig::from_env(env)?;
        let llm = LlmConfig::from_env(env)?;
        Ok(Self { connection, llm })
    }
}
