//! Google Gemini client.
//!
//! Talks to the `generateContent` endpoint. Audio parts go inline as
//! base64, which is how voice messages get transcribed and answered in a
//! single call.

use super::{LlmError, LlmProvider, PromptPart};
use crate::config::GeminiConfig;
use async_trait::async_trait;
use base64::Engine;
use serde_json::json;
use std::time::Duration;

pub struct GeminiProvider {
    config: GeminiConfig,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig, api_key: String, timeout_secs: u64) -> Self {
        Self {
            config,
            api_key,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, parts: &[PromptPart]) -> super::Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.config.base_url, self.config.model, self.api_key
        );

        let mut json_parts = Vec::new();
        for part in parts {
            match part {
                PromptPart::Text(text) => json_parts.push(json!({ "text": text })),
                PromptPart::Audio { mime_type, data } => {
                    let encoded = base64::engine::general_purpose::STANDARD.encode(data);
                    json_parts.push(json!({
                        "inline_data": { "mime_type": mime_type, "data": encoded }
                    }));
                }
            }
        }

        let payload = json!({
            "contents": [{ "role": "user", "parts": json_parts }]
        });

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::NetworkError(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            if status.as_u16() == 400 || status.as_u16() == 404 {
                return Err(LlmError::InvalidRequest(text));
            } else if status.as_u16() == 429 {
                return Err(LlmError::RateLimitExceeded);
            } else if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(LlmError::AuthenticationFailed(text));
            } else {
                return Err(LlmError::ProviderUnavailable(format!(
                    "Gemini API error ({}): {}",
                    status, text
                )));
            }
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))?;

        let candidate = data
            .get("candidates")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .ok_or_else(|| LlmError::ParseError("No candidates in response".to_string()))?;

        let content = candidate
            .get("content")
            .ok_or_else(|| LlmError::ParseError("No content in candidate".to_string()))?;

        let parts = content
            .get("parts")
            .and_then(|p| p.as_array())
            .ok_or_else(|| LlmError::ParseError("No parts in candidate content".to_string()))?;

        let mut full_text = String::new();
        for part in parts {
            if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
                full_text.push_str(text);
            }
        }

        if full_text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        Ok(full_text)
    }
}
