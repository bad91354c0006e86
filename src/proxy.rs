//! Completion proxy
//!
//! Server-side relay between the chat widget and the completion API. Every
//! call prepends the persona instruction and returns exactly one assistant
//! message plus the token usage reported upstream.

use crate::llm::{LlmError, LlmRequest, LlmService, Message, Role};
use crate::persona::Persona;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Token cap for the opening greeting
const WELCOME_MAX_TOKENS: u32 = 100;

/// Simulated latency of the stub endpoint
pub const DEFAULT_EXAMPLE_DELAY: Duration = Duration::from_secs(3);

const EXAMPLE_PREFIX: &str = "Answer to your question: ";

/// Reply returned by `send` and `welcome`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub message: Message,
    pub total_tokens: Option<u64>,
}

/// Errors surfaced by the proxy, on either side of the HTTP boundary
#[derive(Debug, Clone, Error)]
pub enum ProxyError {
    #[error("No completion service configured (set OPENAI_API_KEY)")]
    Unavailable,
    #[error("Completion failed: {0}")]
    Completion(#[from] LlmError),
    #[error("Could not reach the chat server: {0}")]
    Transport(String),
    #[error("Chat server returned {status}: {message}")]
    Server { status: u16, message: String },
}

/// The completion proxy
pub struct CompletionProxy {
    llm: Option<Arc<dyn LlmService>>,
    system_prompt: String,
    example_delay: Duration,
}

impl CompletionProxy {
    pub fn new(llm: Option<Arc<dyn LlmService>>, persona: &Persona) -> Self {
        Self {
            llm,
            system_prompt: persona.system_prompt(),
            example_delay: DEFAULT_EXAMPLE_DELAY,
        }
    }

    #[must_use]
    pub fn with_example_delay(mut self, delay: Duration) -> Self {
        self.example_delay = delay;
        self
    }

    pub fn is_available(&self) -> bool {
        self.llm.is_some()
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Relay a conversation (full history or a lone new message)
    pub async fn send(&self, messages: Vec<Message>) -> Result<ChatReply, ProxyError> {
        let llm = self.llm.as_ref().ok_or(ProxyError::Unavailable)?;

        let request = LlmRequest {
            system: Some(self.system_prompt.clone()),
            messages,
            max_tokens: None,
        };

        let response = llm.complete(&request).await?;
        Ok(ChatReply {
            total_tokens: response.total_tokens(),
            message: response.message,
        })
    }

    /// Produce the opening greeting from the persona instruction alone
    pub async fn welcome(&self) -> Result<ChatReply, ProxyError> {
        let llm = self.llm.as_ref().ok_or(ProxyError::Unavailable)?;

        let request = LlmRequest {
            system: Some(self.system_prompt.clone()),
            messages: vec![],
            max_tokens: Some(WELCOME_MAX_TOKENS),
        };

        let response = llm.complete(&request).await?;
        Ok(ChatReply {
            total_tokens: response.total_tokens(),
            message: response.message,
        })
    }

    /// Stub endpoint: waits, then echoes the content back as an assistant message.
    ///
    /// Never calls the completion API, so the client state machine can be
    /// exercised without a credential.
    pub async fn example(&self, role: &str, content: &str) -> Message {
        tracing::debug!(role, len = content.len(), "Example request");
        tokio::time::sleep(self.example_delay).await;
        Message {
            role: Role::Assistant,
            content: format!("{EXAMPLE_PREFIX}{content}"),
        }
    }
}
