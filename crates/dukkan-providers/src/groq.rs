//! Groq provider — OpenAI-compatible chat completions API.
//!
//! Works against Groq's endpoint by default and any OpenAI-compatible
//! base URL.

use async_trait::async_trait;
use dukkan_core::{
    config::GroqConfig,
    context::{ApiMessage, Context},
    error::DukkanError,
    message::{MessageMetadata, OutgoingMessage},
    traits::Provider,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// OpenAI-compatible provider pointed at Groq.
pub struct GroqProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GroqProvider {
    /// Create from config values. The HTTP client carries the configured
    /// timeout so a hung call surfaces as `Timeout` instead of blocking a
    /// conversation forever.
    pub fn from_config(config: &GroqConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }
}

/// Build OpenAI-format messages from context (system as a message role).
pub(crate) fn build_chat_messages(system: &str, api_messages: &[ApiMessage]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(api_messages.len() + 1);
    if !system.is_empty() {
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: system.to_string(),
        });
    }
    for m in api_messages {
        messages.push(ChatMessage {
            role: m.role.clone(),
            content: m.content.clone(),
        });
    }
    messages
}

#[derive(Serialize, Deserialize, Clone)]
pub(crate) struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Serialize)]
pub(crate) struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Deserialize)]
pub(crate) struct ChatCompletionResponse {
    pub choices: Option<Vec<ChatChoice>>,
    pub model: Option<String>,
    pub usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
pub(crate) struct ChatChoice {
    pub message: Option<ChatMessage>,
}

#[derive(Deserialize)]
pub(crate) struct ChatUsage {
    pub total_tokens: Option<u64>,
}

#[async_trait]
impl Provider for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    fn requires_api_key(&self) -> bool {
        true
    }

    async fn complete(&self, context: &Context) -> Result<OutgoingMessage, DukkanError> {
        let (system, api_messages) = context.to_api_messages();
        let start = Instant::now();

        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: build_chat_messages(&system, &api_messages),
            temperature: context.sampling.temperature,
            max_tokens: context.sampling.max_tokens,
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!(
            "groq: POST {url} model={} temp={}",
            self.model, context.sampling.temperature
        );

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| crate::classify_request_error("groq", &e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(crate::classify_status("groq", status, &text));
        }

        let parsed: ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|e| DukkanError::Transport(format!("groq: failed to parse response: {e}")))?;

        let text = parsed
            .choices
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.message.as_ref())
            .map(|m| m.content.clone())
            .unwrap_or_default();

        let tokens = parsed.usage.as_ref().and_then(|u| u.total_tokens);
        let elapsed_ms = start.elapsed().as_millis() as u64;

        Ok(OutgoingMessage {
            text,
            metadata: MessageMetadata {
                provider_used: "groq".to_string(),
                tokens_used: tokens,
                processing_time_ms: elapsed_ms,
                model: parsed.model,
            },
        })
    }

    async fn is_available(&self) -> bool {
        if self.api_key.is_empty() {
            warn!("groq: no API key configured");
            return false;
        }
        let url = format!("{}/models", self.base_url.trim_end_matches('/'));
        match self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!("groq not available: {e}");
                false
            }
        }
    }
}
