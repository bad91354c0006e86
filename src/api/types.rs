//! API request and response types
//!
//! Shared by the server handlers and the HTTP proxy client.

use crate::llm::Message;
use serde::{Deserialize, Serialize};

pub use crate::proxy::ChatReply;

/// Request to relay a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRequest {
    pub messages: Vec<Message>,
}

/// Request for the opening greeting (no parameters)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WelcomeRequest {}

/// Request to the stub endpoint; the role is free-form here
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExampleRequest {
    pub role: String,
    pub content: String,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
