//! Chat-completion client.
//!
//! One blocking POST per call, bearer-authenticated, bounded by the configured
//! timeout. No retries: a failure is returned to the caller as a
//! `CompletionError`.

use std::time::Duration;

use anyhow::anyhow;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use docchat_core::config::LlmSettings;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("completion API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed completion response: {0}")]
    MalformedResponse(String),

    #[error("no completion API configured")]
    NotConfigured,
}

pub trait CompletionClient: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// Stand-in for offline use (indexing); every call fails with `NotConfigured`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledClient;

impl CompletionClient for DisabledClient {
    fn complete(&self, _prompt: &str) -> Result<String, CompletionError> { Err(CompletionError::NotConfigured) }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

pub struct HttpCompletionClient {
    client: reqwest::blocking::Client,
    api_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl HttpCompletionClient {
    pub fn from_settings(settings: &LlmSettings) -> anyhow::Result<Self> {
        let api_url = settings.api_url.clone().filter(|s| !s.is_empty());
        let api_key = settings.api_key.clone().filter(|s| !s.is_empty());
        let (Some(api_url), Some(api_key)) = (api_url, api_key) else {
            return Err(anyhow!("Missing completion API credentials: set NVIDIA_API_URL and NVIDIA_API_KEY (or llm.api_url / llm.api_key)"));
        };
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_url,
            api_key,
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
    }

    pub fn model(&self) -> &str { &self.model }
}

impl CompletionClient for HttpCompletionClient {
    fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        debug!("sending completion request to {} (model {})", self.api_url, self.model);

        let response = self.client.post(&self.api_url).bearer_auth(&self.api_key).json(&body).send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(CompletionError::Status { status: status.as_u16(), body });
        }

        let json: serde_json::Value = response.json()?;
        json["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| CompletionError::MalformedResponse(format!("no choices[0].message.content in {json}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credentials_are_rejected() {
        let settings = LlmSettings::default();
        assert!(HttpCompletionClient::from_settings(&settings).is_err());
        let settings = LlmSettings { api_url: Some("http://localhost:1".into()), api_key: Some(String::new()), ..LlmSettings::default() };
        assert!(HttpCompletionClient::from_settings(&settings).is_err());
    }

    #[test]
    fn request_body_has_expected_shape() {
        let body = ChatRequest {
            model: "m",
            messages: vec![ChatMessage { role: "user", content: "hi" }],
            temperature: 0.5,
            max_tokens: 16,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({
            "model": "m",
            "messages": [{"role": "user", "content": "hi"}],
            "temperature": 0.5,
            "max_tokens": 16
        }));
    }
}
