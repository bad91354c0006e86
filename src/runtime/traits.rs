//! Trait abstractions for runtime I/O
//!
//! The executor only reaches the completion proxy through [`ProxyClient`], so
//! it runs the same against the in-process proxy, the HTTP server, or a mock.

use crate::api::types::{ErrorResponse, ExampleRequest, SendRequest};
use crate::llm::Message;
use crate::proxy::{ChatReply, CompletionProxy, ProxyError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// Client side of the completion proxy
#[async_trait]
pub trait ProxyClient: Send + Sync {
    /// Relay a conversation and get one assistant reply
    async fn send(&self, messages: Vec<Message>) -> Result<ChatReply, ProxyError>;

    /// Get the opening greeting
    async fn welcome(&self) -> Result<ChatReply, ProxyError>;
}

// ============================================================================
// In-process proxy
// ============================================================================

#[async_trait]
impl ProxyClient for CompletionProxy {
    async fn send(&self, messages: Vec<Message>) -> Result<ChatReply, ProxyError> {
        CompletionProxy::send(self, messages).await
    }

    async fn welcome(&self) -> Result<ChatReply, ProxyError> {
        CompletionProxy::welcome(self).await
    }
}

// ============================================================================
// HTTP proxy client
// ============================================================================

/// Talks to a running `virtual-vince` server
#[derive(Clone)]
pub struct HttpProxyClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProxyClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProxyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProxyError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Decode a success body, or turn an error status into `ProxyError::Server`
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ProxyError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ProxyError::Transport(format!("Invalid response body: {e}")));
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error)
            .unwrap_or(body);

        Err(ProxyError::Server {
            status: status.as_u16(),
            message,
        })
    }

    /// Call the stub endpoint with a single message
    pub async fn example(&self, message: &Message) -> Result<Message, ProxyError> {
        let request = ExampleRequest {
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
        };

        let response = self
            .client
            .post(self.url("/api/chat/example"))
            .json(&request)
            .send()
            .await
            .map_err(|e| ProxyError::Transport(e.to_string()))?;

        Self::decode(response).await
    }
}

#[async_trait]
impl ProxyClient for HttpProxyClient {
    async fn send(&self, messages: Vec<Message>) -> Result<ChatReply, ProxyError> {
        let response = self
            .client
            .post(self.url("/api/chat/send"))
            .json(&SendRequest { messages })
            .send()
            .await
            .map_err(|e| ProxyError::Transport(e.to_string()))?;

        Self::decode(response).await
    }

    async fn welcome(&self) -> Result<ChatReply, ProxyError> {
        let response = self
            .client
            .get(self.url("/api/chat/welcome"))
            .send()
            .await
            .map_err(|e| ProxyError::Transport(e.to_string()))?;

        Self::decode(response).await
    }
}

// ============================================================================
// Stub routing
// ============================================================================

/// Routes sends through the stub endpoint, which echoes the newest message.
///
/// The stub reports no usage, so the token budget never trips. The welcome
/// call still goes to the real endpoint.
#[derive(Clone)]
pub struct ExampleProxyClient {
    http: HttpProxyClient,
}

impl ExampleProxyClient {
    pub fn new(http: HttpProxyClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ProxyClient for ExampleProxyClient {
    async fn send(&self, messages: Vec<Message>) -> Result<ChatReply, ProxyError> {
        let last = messages
            .last()
            .ok_or_else(|| ProxyError::Transport("Nothing to send".to_string()))?;

        let message = self.http.example(last).await?;
        Ok(ChatReply {
            message,
            total_tokens: None,
        })
    }

    async fn welcome(&self) -> Result<ChatReply, ProxyError> {
        self.http.welcome().await
    }
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: ProxyClient + ?Sized> ProxyClient for Arc<T> {
    async fn send(&self, messages: Vec<Message>) -> Result<ChatReply, ProxyError> {
        (**self).send(messages).await
    }

    async fn welcome(&self) -> Result<ChatReply, ProxyError> {
        (**self).welcome().await
    }
}
