//! LLM client for API communication

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;

/// Response from LLM
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// The generated content
    pub content: String,
    /// Number of tokens used
    pub tokens_used: Option<usize>,
}

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A chat-completion model
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send `messages` and wait for the full reply
    async fn chat(&self, messages: &[ChatMessage]) -> Result<LlmResponse>;
}

/// Configuration for LLM client
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// API endpoint URL
    pub endpoint: String,
    /// Model name
    pub model: String,
    /// API key
    pub api_key: Option<String>,
    /// Maximum tokens for response
    pub max_tokens: Option<usize>,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com".to_string(),
            model: "gpt-4o".to_string(),
            api_key: None,
            max_tokens: None,
            temperature: 0.1,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Client for an OpenAI-compatible chat completions API
pub struct LlmClient {
    config: LlmConfig,
    client: reqwest::Client,
}

impl LlmClient {
    /// Create a new LLM client
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { config, client })
    }

    /// Create with an OpenAI-compatible endpoint
    pub fn openai_compatible(endpoint: &str, model: &str, api_key: Option<&str>) -> Result<Self> {
        Self::new(LlmConfig {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key: api_key.map(|s| s.to_string()),
            ..Default::default()
        })
    }

    /// Generate a completion for a full conversation
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<LlmResponse> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.endpoint.trim_end_matches('/')
        );

        let request = OpenAIChatRequest {
            model: self.config.model.clone(),
            messages: messages.to_vec(),
            max_tokens: self.config.max_tokens,
            temperature: Some(self.config.temperature),
        };

        let mut req_builder = self.client.post(&url).json(&request);

        if let Some(ref key) = self.config.api_key {
            req_builder = req_builder.bearer_auth(key);
        }

        let response = req_builder
            .send()
            .await
            .context("Failed to send request to OpenAI-compatible API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI request failed: {} - {}", status, body);
        }

        let result: OpenAIChatResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI response")?;

        let content = result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("OpenAI response contained no choices"))?;

        let tokens_used = result.usage.map(|u| u.total_tokens as usize);

        Ok(LlmResponse {
            content,
            tokens_used,
        })
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<LlmResponse> {
        self.complete(messages).await
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChatResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIReplyMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIReplyMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    total_tokens: i32,
}

/// Mock chat model for testing
pub struct MockChatModel {
    responses: Vec<(String, String)>,
    default_response: Option<String>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockChatModel {
    /// Create a new mock that fails every call until responses are added
    pub fn new() -> Self {
        Self {
            responses: Vec::new(),
            default_response: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Reply with `response` whenever the user message contains `prompt_contains`
    pub fn add_response(&mut self, prompt_contains: &str, response: &str) {
        self.responses
            .push((prompt_contains.to_string(), response.to_string()));
    }

    /// Reply with `response` when no other response matches
    pub fn with_default(mut self, response: &str) -> Self {
        self.default_response = Some(response.to_string());
        self
    }

    /// Conversations received so far
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl Default for MockChatModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<LlmResponse> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }

        let prompt = messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let reply = self
            .responses
            .iter()
            .find(|(key, _)| prompt.contains(key.as_str()))
            .map(|(_, response)| response.clone())
            .or_else(|| self.default_response.clone())
            .ok_or_else(|| anyhow::anyhow!("mock model has no response for this prompt"))?;

        Ok(LlmResponse {
            content: reply,
            tokens_used: Some(100),
        })
    }
}
