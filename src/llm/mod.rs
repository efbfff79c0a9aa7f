//! LLM client for chat completions.
//!
//! Trait-based abstraction over completion providers, with the Anthropic
//! Messages API as the primary implementation. A straight request/response
//! client: the caller hands over the transcript, gets text back.

mod anthropic;

pub use anthropic::{AnthropicClient, DEFAULT_MODEL};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Role in a chat conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Error from LLM API calls.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Upstream returned a non-success status.
    #[error("LLM API request failed (HTTP {status}): {message}")]
    Http { status: u16, message: String },

    /// Transport-level failure.
    #[error("LLM request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Upstream body did not match the expected shape.
    #[error("failed to parse LLM response: {0}")]
    Parse(String),
}

/// Trait for LLM clients.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send the transcript and return the assistant's reply text.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
    ) -> Result<String, LlmError>;
}
