//! HTTP client for the supported LLM providers

use crate::config::{LLMProvider, LlmConfig};
use crate::llm::{LanguageModel, LlmError, LlmResult, Prompt};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub struct HttpLanguageModel {
    client: Client,
    provider: LLMProvider,
    model: String,
    api_key: Option<String>,
    api_base_url: String,
    temperature: Option<f32>,
}

impl HttpLanguageModel {
    pub fn new(config: &LlmConfig, temperature: Option<f32>) -> LlmResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::ConfigError(e.to_string()))?;

        if config.provider.api_key_var().is_some() && config.api_key.is_none() {
            return Err(LlmError::ConfigError(format!(
                "{:?} requires an API key",
                config.provider
            )));
        }

        Ok(Self {
            client,
            provider: config.provider,
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            temperature,
        })
    }

    fn api_key(&self) -> LlmResult<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| LlmError::ConfigError(format!("{:?} requires an API key", self.provider)))
    }

    async fn openai_chat(&self, prompt: &Prompt) -> LlmResult<String> {
        #[derive(Serialize)]
        struct Message<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct Request<'a> {
            model: &'a str,
            messages: Vec<Message<'a>>,
            #[serde(skip_serializing_if = "Option::is_none")]
            temperature: Option<f32>,
        }

        #[derive(Deserialize)]
        struct Response {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: MessageContent,
        }

        #[derive(Deserialize)]
        struct MessageContent {
            content: Option<String>,
        }

        let api_key = self.api_key()?;
        let url = format!("{}/chat/completions", self.api_base_url);
        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&Request {
                model: &self.model,
                messages: vec![
                    Message { role: "system", content: &prompt.system },
                    Message { role: "user", content: &prompt.user },
                ],
                temperature: self.temperature,
            })
            .send()
            .await
            .map_err(network_error)?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::ApiError(format!("OpenAI error {}: {}", status, text)));
        }

        let result: Response = resp
            .json()
            .await
            .map_err(|e| LlmError::SerializationError(e.without_url().to_string()))?;
        result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::ApiError("OpenAI returned no choices".to_string()))
    }

    async fn ollama_generate(&self, prompt: &Prompt) -> LlmResult<String> {
        #[derive(Serialize)]
        struct Options {
            temperature: f32,
        }

        #[derive(Serialize)]
        struct Request<'a> {
            model: &'a str,
            prompt: &'a str,
            system: &'a str,
            stream: bool,
            #[serde(skip_serializing_if = "Option::is_none")]
            options: Option<Options>,
        }

        #[derive(Deserialize)]
        struct Response {
            response: String,
        }

        let url = format!("{}/api/generate", self.api_base_url);
        let resp = self
            .client
            .post(&url)
            .json(&Request {
                model: &self.model,
                prompt: &prompt.user,
                system: &prompt.system,
                stream: false,
                options: self.temperature.map(|temperature| Options { temperature }),
            })
            .send()
            .await
            .map_err(network_error)?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::ApiError(format!("Ollama error {}: {}", status, text)));
        }

        let result: Response = resp
            .json()
            .await
            .map_err(|e| LlmError::SerializationError(e.without_url().to_string()))?;
        Ok(result.response)
    }

    async fn gemini_generate(&self, prompt: &Prompt) -> LlmResult<String> {
        #[derive(Serialize)]
        struct Request {
            #[serde(rename = "systemInstruction")]
            system_instruction: Content,
            contents: Vec<Content>,
            #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
            generation_config: Option<GenerationConfig>,
        }

        #[derive(Serialize, Deserialize)]
        struct Content {
            #[serde(skip_serializing_if = "Option::is_none")]
            role: Option<String>,
            parts: Vec<Part>,
        }

        #[derive(Serialize, Deserialize)]
        struct Part {
            text: String,
        }

        #[derive(Serialize)]
        struct GenerationConfig {
            temperature: f32,
        }

        #[derive(Deserialize)]
        struct Response {
            candidates: Option<Vec<Candidate>>,
        }

        #[derive(Deserialize)]
        struct Candidate {
            content: Content,
        }

        let api_key = self.api_key()?;
        let url = format!("{}/models/{}:generateContent", self.api_base_url, self.model);

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&Request {
                system_instruction: Content {
                    role: None,
                    parts: vec![Part { text: prompt.system.clone() }],
                },
                contents: vec![Content {
                    role: Some("user".to_string()),
                    parts: vec![Part { text: prompt.user.clone() }],
                }],
                generation_config: self.temperature.map(|temperature| GenerationConfig { temperature }),
            })
            .send()
            .await
            .map_err(network_error)?;

        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::ApiError(format!("Gemini error: {}", text)));
        }

        let result: Response = resp
            .json()
            .await
            .map_err(|e| LlmError::SerializationError(e.without_url().to_string()))?;

        let text: String = result
            .candidates
            .and_then(|candidates| candidates.into_iter().next())
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect()
            })
            .ok_or_else(|| LlmError::ApiError("Gemini returned no candidates".to_string()))?;
        Ok(text)
    }
}

/// Network error without the request URL
fn network_error(e: reqwest::Error) -> LlmError {
    LlmError::NetworkError(e.without_url().to_string())
}

#[async_trait]
impl LanguageModel for HttpLanguageModel {
    async fn invoke(&self, prompt: &Prompt) -> LlmResult<String> {
        debug!(provider = ?self.provider, model = %self.model, "invoking language model");
        match self.provider {
            LLMProvider::OpenAI => self.openai_chat(prompt).await,
            LLMProvider::Ollama => self.ollama_generate(prompt).await,
            LLMProvider::Gemini => self.gemini_generate(prompt).await,
        }
    }
}
