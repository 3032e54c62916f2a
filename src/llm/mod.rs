//! LLM provider abstraction.
//!
//! The assistant treats the model as a black box: prompt parts in, free
//! text out. The `LlmProvider` trait is the seam that lets tests inject a
//! fake collaborator in place of the real Gemini client.

use async_trait::async_trait;

pub mod gemini;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Empty response")]
    EmptyResponse,
}

/// One part of a prompt: plain text, or raw audio for transcription.
#[derive(Debug, Clone)]
pub enum PromptPart {
    Text(String),
    Audio { mime_type: String, data: Vec<u8> },
}

impl PromptPart {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    pub fn audio(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self::Audio {
            mime_type: mime_type.into(),
            data,
        }
    }
}

/// Contract every LLM backend implements.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "gemini")
    fn name(&self) -> &str;

    /// Generate a free-text reply for the given prompt parts.
    async fn generate(&self, parts: &[PromptPart]) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_part_constructors() {
        let text = PromptPart::text("hello");
        assert!(matches!(text, PromptPart::Text(ref s) if s == "hello"));

        let audio = PromptPart::audio("audio/ogg", vec![1, 2, 3]);
        match audio {
            PromptPart::Audio { mime_type, data } => {
                assert_eq!(mime_type, "audio/ogg");
                assert_eq!(data, vec![1, 2, 3]);
            }
            _ => panic!("expected audio part"),
        }
    }
}
