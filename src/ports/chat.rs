use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// The LLM wire protocol, abstracted. Implementations speak the OpenAI
/// chat-completions shape or the Anthropic messages shape; callers only see
/// a unified `chat()` returning assistant text.
#[async_trait]
pub trait Chat: Send + Sync {
    async fn chat(&self, model: &str, messages: &[ChatMessage], max_tokens: u32) -> Result<String>;
}

pub struct OpenAiChat {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiChat {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
        }
    }
}

#[async_trait]
impl Chat for OpenAiChat {
    async fn chat(&self, model: &str, messages: &[ChatMessage], max_tokens: u32) -> Result<String> {
        let body = serde_json::json!({
            "model": model,
            "max_tokens": max_tokens,
            "messages": messages,
        });

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::LlmProvider(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(AppError::LlmProvider(format!("openai returned {}", resp.status())));
        }

        let parsed: serde_json::Value = resp.json().await.map_err(|e| AppError::LlmProvider(e.to_string()))?;
        let text = parsed["choices"][0]["message"]["content"].as_str().unwrap_or("").trim().to_string();
        Ok(text)
    }
}

pub struct AnthropicChat {
    client: reqwest::Client,
    api_key: String,
}

impl AnthropicChat {
    pub fn new(api_key: String) -> Self {
        Self { client: reqwest::Client::new(), api_key }
    }
}

#[async_trait]
impl Chat for AnthropicChat {
    async fn chat(&self, model: &str, messages: &[ChatMessage], max_tokens: u32) -> Result<String> {
        let mut system = String::new();
        let mut conv = Vec::new();
        for m in messages {
            match m.role {
                ChatRole::System => system = m.content.clone(),
                ChatRole::User => conv.push(serde_json::json!({"role": "user", "content": m.content})),
                ChatRole::Assistant => conv.push(serde_json::json!({"role": "assistant", "content": m.content})),
            }
        }
        if conv.is_empty() {
            return Ok(String::new());
        }

        let mut body = serde_json::json!({
            "model": model,
            "max_tokens": max_tokens,
            "messages": conv,
        });
        if !system.is_empty() {
            body["system"] = serde_json::Value::String(system);
        }

        let resp = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::LlmProvider(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(AppError::LlmProvider(format!("anthropic returned {}", resp.status())));
        }

        let parsed: serde_json::Value = resp.json().await.map_err(|e| AppError::LlmProvider(e.to_string()))?;
        let text = parsed["content"][0]["text"].as_str().unwrap_or("").trim().to_string();
        Ok(text)
    }
}

/// Build a `Chat` implementation from a provider name; unknown providers
/// default to OpenAI, matching the origin's own fallback.
pub fn build_chat(provider: &str, api_key: &str, base_url: &str) -> Box<dyn Chat> {
    match provider.to_lowercase().as_str() {
        "anthropic" => Box::new(AnthropicChat::new(api_key.to_string())),
        _ => Box::new(OpenAiChat::new(
            api_key.to_string(),
            if base_url.is_empty() { None } else { Some(base_url.to_string()) },
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_provider_defaults_to_openai() {
        // Construction alone should not panic/err for any provider string.
        let _ = build_chat("mystery-llm", "key", "");
    }
}
