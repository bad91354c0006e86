//! Completion service configuration and construction

use super::openai::{OpenAIService, DEFAULT_BASE_URL, DEFAULT_MODEL};
use super::{LlmService, LoggingService};
use crate::env::{self, ConfigError, Lookup};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Configuration for the completion provider
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub openai_api_key: Option<String>,
    /// Base URL of an OpenAI-compatible API (e.g. a local gateway)
    pub base_url: String,
    pub model: String,
    pub request_timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl LlmConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&env::process_env)
    }

    pub fn from_lookup(lookup: &impl Lookup) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            openai_api_key: env::string(lookup, "OPENAI_API_KEY"),
            base_url: env::string(lookup, "OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            model: env::string(lookup, "VINCE_MODEL").unwrap_or(defaults.model),
            request_timeout: env::parsed(lookup, "VINCE_REQUEST_TIMEOUT_SECS")?
                .map_or(defaults.request_timeout, Duration::from_secs),
        })
    }
}

/// Build the completion service, wrapped with logging.
///
/// Returns `None` when no credential is configured; the proxy then answers
/// `send`/`welcome` with "unavailable" and only the stub endpoint works.
pub fn build_service(config: &LlmConfig) -> Option<Arc<dyn LlmService>> {
    let api_key = config.openai_api_key.clone()?;

    match OpenAIService::new(
        api_key,
        config.model.clone(),
        &config.base_url,
        config.request_timeout,
    ) {
        Ok(service) => Some(Arc::new(LoggingService::new(Arc::new(service)))),
        Err(e) => {
            tracing::error!(error = %e, "Failed to create completion service");
            None
        }
    }
}
