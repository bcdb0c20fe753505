//! Remote text generation backends.
//!
//! One attempt per run, no retries. Every transport or protocol problem is
//! folded into [`RemoteOutcome::Failure`] so callers can fall back without
//! inspecting error types.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::InferenceBackend;
use crate::errors::InferenceError;

pub const HF_INFERENCE_BASE: &str = "https://api-inference.huggingface.co";
const HF_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const LOCAL_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Outcome of a single generation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome {
    Success(String),
    Failure(String),
}

/// Sampling settings for one bounded generation.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub do_sample: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 500,
            temperature: 0.7,
            do_sample: true,
        }
    }
}

/// A text generation backend. Implementations never return an error;
/// failures are data.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> RemoteOutcome;
}

#[async_trait]
impl TextGenerator for Box<dyn TextGenerator> {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> RemoteOutcome {
        (**self).generate(prompt, params).await
    }
}

/// Build the generator the configuration selects.
pub fn generator_for(backend: &InferenceBackend) -> Result<Box<dyn TextGenerator>, InferenceError> {
    match backend {
        InferenceBackend::HuggingFace { api_key, model } => Ok(Box::new(
            HuggingFaceGenerator::new(api_key.clone(), model.clone())?,
        )),
        InferenceBackend::Local { endpoint, model } => Ok(Box::new(LocalGenerator::new(
            endpoint.clone(),
            model.clone(),
        )?)),
    }
}

/// Hosted HuggingFace Inference API client.
pub struct HuggingFaceGenerator {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HuggingFaceGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, InferenceError> {
        let client = Client::builder().timeout(HF_REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: HF_INFERENCE_BASE.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Point the client at a different endpoint (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn request(&self, prompt: &str, params: &GenerationParams) -> Result<String, InferenceError> {
        let url = format!(
            "{}/models/{}",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let body = HfRequest {
            inputs: prompt,
            parameters: HfParameters {
                max_new_tokens: params.max_new_tokens,
                temperature: params.temperature,
                do_sample: params.do_sample,
                return_full_text: false,
            },
        };

        debug!(model = %self.model, "sending generation request");
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let candidates: Vec<HfGeneration> = response.json().await?;
        candidates
            .into_iter()
            .next()
            .map(|generation| generation.generated_text)
            .ok_or(InferenceError::EmptyResponse)
    }
}

#[async_trait]
impl TextGenerator for HuggingFaceGenerator {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> RemoteOutcome {
        match self.request(prompt, params).await {
            Ok(text) => RemoteOutcome::Success(text),
            Err(err) => RemoteOutcome::Failure(err.to_string()),
        }
    }
}

#[derive(Serialize)]
struct HfRequest<'a> {
    inputs: &'a str,
    parameters: HfParameters,
}

#[derive(Serialize)]
struct HfParameters {
    max_new_tokens: u32,
    temperature: f32,
    do_sample: bool,
    return_full_text: bool,
}

#[derive(Deserialize)]
struct HfGeneration {
    generated_text: String,
}

/// OpenAI-compatible local endpoint (Ollama, LM Studio and similar).
pub struct LocalGenerator {
    client: Client,
    endpoint: String,
    model: String,
}

impl LocalGenerator {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self, InferenceError> {
        // Local models can be slow to answer; give them more room than the
        // hosted API.
        let client = Client::builder().timeout(LOCAL_REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
        })
    }

    async fn request(&self, prompt: &str, params: &GenerationParams) -> Result<String, InferenceError> {
        let url = format!("{}/chat/completions", self.endpoint.trim_end_matches('/'));
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: params.max_new_tokens,
            temperature: params.temperature,
        };

        debug!(model = %self.model, "sending local generation request");
        let response = self.client.post(&url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(InferenceError::EmptyResponse)
    }
}

#[async_trait]
impl TextGenerator for LocalGenerator {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> RemoteOutcome {
        match self.request(prompt, params).await {
            Ok(text) => RemoteOutcome::Success(text),
            Err(err) => RemoteOutcome::Failure(err.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}
