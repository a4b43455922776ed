//! LLM provider abstraction.
//!
//! The engine treats hosted inference as an opaque collaborator: one prompt
//! in, one loosely-typed JSON envelope out. Chat-style providers (OpenAI,
//! Anthropic) answer with the assistant message content as a string
//! envelope; the generic hosted-inference provider returns whatever JSON
//! body the endpoint produced. Envelope classification happens downstream
//! in [`crate::envelope`] — providers never interpret the payload.

use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CuratorError;
use crate::prompts::{CLASSIFICATION_MARKER, UPDATE_MARKER};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for LLM providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmProviderConfig {
    pub provider_type: LlmProviderType,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub timeout_seconds: Option<u64>,
}

impl Default for LlmProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: LlmProviderType::Stub,
            model: "stub-model".to_string(),
            api_key: None,
            base_url: None,
            max_tokens: Some(2048),
            temperature: Some(0.7),
            timeout_seconds: Some(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Supported LLM provider types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderType {
    /// Deterministic responses for testing and offline development.
    Stub,
    /// OpenAI-compatible chat completions (works with OpenRouter too).
    OpenAi,
    /// Anthropic messages API.
    Anthropic,
    /// Generic hosted inference endpoint returning an untyped JSON envelope.
    Hosted,
}

impl FromStr for LlmProviderType {
    type Err = CuratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stub" => Ok(Self::Stub),
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "hosted" => Ok(Self::Hosted),
            other => Err(CuratorError::Config(format!(
                "unknown provider type: {}",
                other
            ))),
        }
    }
}

/// Abstract interface for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync + std::fmt::Debug {
    /// Run one inference call and return the raw response envelope.
    async fn infer(&self, prompt: &str) -> Result<Value, CuratorError>;

    /// Provider information for logging and display.
    fn get_info(&self) -> LlmProviderInfo;
}

/// Information about an LLM provider
#[derive(Debug, Clone)]
pub struct LlmProviderInfo {
    pub name: String,
    pub model: String,
}

// ---------------------------------------------------------------------------
// OpenAI-compatible provider
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

/// OpenAI-compatible provider (works with OpenAI and OpenRouter)
#[derive(Debug)]
pub struct OpenAiLlmProvider {
    config: LlmProviderConfig,
    client: reqwest::Client,
}

impl OpenAiLlmProvider {
    pub fn new(config: LlmProviderConfig) -> Result<Self, CuratorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(
                config.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ))
            .build()?;
        Ok(Self { config, client })
    }

    async fn make_request(&self, prompt: &str) -> Result<String, CuratorError> {
        let api_key = self.config.api_key.as_ref().ok_or_else(|| {
            CuratorError::Config("API key required for OpenAI provider".to_string())
        })?;

        let base_url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or("https://api.openai.com/v1");
        let url = format!("{}/chat/completions", base_url);

        let request_body = OpenAiRequest {
            model: self.config.model.clone(),
            messages: vec![OpenAiMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let start = Instant::now();
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let raw_body = response.text().await?;
        if !status.is_success() {
            return Err(CuratorError::Provider(format!(
                "OpenAI request failed (HTTP {}): {}",
                status.as_u16(),
                truncate(&raw_body, 500)
            )));
        }

        let body: OpenAiResponse = serde_json::from_str(&raw_body).map_err(|e| {
            CuratorError::Provider(format!(
                "unexpected OpenAI response shape: {} (body: {})",
                e,
                truncate(&raw_body, 500)
            ))
        })?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CuratorError::Provider("response missing choices".to_string()))?;

        if choice.finish_reason.as_deref() == Some("length") {
            tracing::warn!(
                max_tokens = ?self.config.max_tokens,
                "model response was truncated (finish_reason: length)"
            );
        }
        tracing::debug!(
            latency_ms = start.elapsed().as_millis() as u64,
            model = %self.config.model,
            "completion received"
        );

        Ok(choice.message.content)
    }
}

#[async_trait]
impl LlmProvider for OpenAiLlmProvider {
    async fn infer(&self, prompt: &str) -> Result<Value, CuratorError> {
        let content = self.make_request(prompt).await?;
        Ok(Value::String(content))
    }

    fn get_info(&self) -> LlmProviderInfo {
        LlmProviderInfo {
            name: "OpenAI".to_string(),
            model: self.config.model.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Anthropic provider
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    text: String,
}

#[derive(Debug)]
pub struct AnthropicLlmProvider {
    config: LlmProviderConfig,
    client: reqwest::Client,
}

impl AnthropicLlmProvider {
    pub fn new(config: LlmProviderConfig) -> Result<Self, CuratorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(
                config.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ))
            .build()?;
        Ok(Self { config, client })
    }

    async fn make_request(&self, prompt: &str) -> Result<String, CuratorError> {
        let api_key = self.config.api_key.as_ref().ok_or_else(|| {
            CuratorError::Config("API key required for Anthropic provider".to_string())
        })?;

        let base_url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or("https://api.anthropic.com/v1");
        let url = format!("{}/messages", base_url);

        let request_body = AnthropicRequest {
            model: self.config.model.clone(),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.config.max_tokens.unwrap_or(1024),
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let raw_body = response.text().await?;
        if !status.is_success() {
            return Err(CuratorError::Provider(format!(
                "Anthropic request failed (HTTP {}): {}",
                status.as_u16(),
                truncate(&raw_body, 500)
            )));
        }

        let body: AnthropicResponse = serde_json::from_str(&raw_body).map_err(|e| {
            CuratorError::Provider(format!(
                "unexpected Anthropic response shape: {} (body: {})",
                e,
                truncate(&raw_body, 500)
            ))
        })?;

        body.content
            .into_iter()
            .next()
            .map(|item| item.text)
            .ok_or_else(|| CuratorError::Provider("response missing content".to_string()))
    }
}

#[async_trait]
impl LlmProvider for AnthropicLlmProvider {
    async fn infer(&self, prompt: &str) -> Result<Value, CuratorError> {
        let content = self.make_request(prompt).await?;
        Ok(Value::String(content))
    }

    fn get_info(&self) -> LlmProviderInfo {
        LlmProviderInfo {
            name: "Anthropic".to_string(),
            model: self.config.model.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Generic hosted inference provider
// ---------------------------------------------------------------------------

/// Provider for hosted inference endpoints that take `{"prompt": ...}` and
/// answer with an arbitrary JSON envelope (`output`, `data.output`, `text`,
/// ... — no schema guarantee). This is the provider the defensive envelope
/// classification exists for.
#[derive(Debug)]
pub struct HostedInferenceProvider {
    config: LlmProviderConfig,
    client: reqwest::Client,
}

impl HostedInferenceProvider {
    pub fn new(config: LlmProviderConfig) -> Result<Self, CuratorError> {
        if config.base_url.is_none() {
            return Err(CuratorError::Config(
                "base_url required for hosted inference provider".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(
                config.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ))
            .build()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl LlmProvider for HostedInferenceProvider {
    async fn infer(&self, prompt: &str) -> Result<Value, CuratorError> {
        // Presence checked in `new`.
        let url = self.config.base_url.as_deref().ok_or_else(|| {
            CuratorError::Config("base_url required for hosted inference provider".to_string())
        })?;

        let mut payload = serde_json::json!({ "prompt": prompt });
        if !self.config.model.is_empty() {
            payload["model"] = Value::String(self.config.model.clone());
        }

        let response = self.client.post(url).json(&payload).send().await?;
        let status = response.status();
        let raw_body = response.text().await?;
        if !status.is_success() {
            return Err(CuratorError::Provider(format!(
                "hosted inference request failed (HTTP {}): {}",
                status.as_u16(),
                truncate(&raw_body, 500)
            )));
        }

        serde_json::from_str(&raw_body).map_err(|e| {
            CuratorError::Provider(format!(
                "hosted inference response is not JSON: {} (body: {})",
                e,
                truncate(&raw_body, 500)
            ))
        })
    }

    fn get_info(&self) -> LlmProviderInfo {
        LlmProviderInfo {
            name: "Hosted".to_string(),
            model: self.config.model.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Stub provider
// ---------------------------------------------------------------------------

/// Deterministic provider for tests and offline development.
///
/// Responses can be scripted in FIFO order; when the script is empty the
/// stub routes on the marker header each prompt builder embeds.
#[derive(Debug)]
pub struct StubLlmProvider {
    config: LlmProviderConfig,
    script: Mutex<VecDeque<Value>>,
}

impl StubLlmProvider {
    pub fn new(config: LlmProviderConfig) -> Self {
        Self {
            config,
            script: Mutex::new(VecDeque::new()),
        }
    }

    /// Stub with a pre-loaded FIFO response script.
    pub fn with_script(responses: Vec<Value>) -> Self {
        Self {
            config: LlmProviderConfig::default(),
            script: Mutex::new(responses.into()),
        }
    }

    /// Append a response to the script.
    pub fn push_response(&self, response: Value) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(response);
        }
    }

    fn canned_response(&self, prompt: &str) -> Value {
        if prompt.contains(CLASSIFICATION_MARKER) {
            return Value::String(
                r#"{"intent": "full", "targetCategories": []}"#.to_string(),
            );
        }
        if prompt.contains(UPDATE_MARKER) {
            // An empty update degrades to a full regeneration, matching the
            // pipeline's uniform fallback contract.
            return Value::String("[]".to_string());
        }
        Value::String(
            r#"[
                {"name": "Essential tools", "description": "Core tools for the job", "searchTerms": ["starter tool kit", "hand tools", "multi tool"], "priority": 5, "type": "tools"},
                {"name": "Supplies", "description": "Consumables to keep on hand", "searchTerms": ["starter supplies", "refill pack", "basics"], "priority": 4, "type": "consumables"},
                {"name": "Storage & containers", "description": "Keep everything organized", "searchTerms": ["storage bins", "containers", "organizer"], "priority": 3, "type": "containers"},
                {"name": "Accessories", "description": "Extras that help", "searchTerms": ["accessories", "add-ons", "extras"], "priority": 2, "type": "accessories"}
            ]"#
            .to_string(),
        )
    }
}

#[async_trait]
impl LlmProvider for StubLlmProvider {
    async fn infer(&self, prompt: &str) -> Result<Value, CuratorError> {
        if let Ok(mut script) = self.script.lock() {
            if let Some(response) = script.pop_front() {
                return Ok(response);
            }
        }
        Ok(self.canned_response(prompt))
    }

    fn get_info(&self) -> LlmProviderInfo {
        LlmProviderInfo {
            name: "Stub".to_string(),
            model: self.config.model.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

pub struct LlmProviderFactory;

impl LlmProviderFactory {
    pub fn create_provider(
        config: LlmProviderConfig,
    ) -> Result<Box<dyn LlmProvider>, CuratorError> {
        match config.provider_type {
            LlmProviderType::Stub => Ok(Box::new(StubLlmProvider::new(config))),
            LlmProviderType::OpenAi => Ok(Box::new(OpenAiLlmProvider::new(config)?)),
            LlmProviderType::Anthropic => Ok(Box::new(AnthropicLlmProvider::new(config)?)),
            LlmProviderType::Hosted => Ok(Box::new(HostedInferenceProvider::new(config)?)),
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() > max {
        let mut end = max;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, total length: {} chars]", &text[..end], text.len())
    } else {
        text.to_string()
    }
}
