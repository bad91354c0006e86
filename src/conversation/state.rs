//! Conversation state types

use super::ChatConfig;
use crate::llm::Message;
use serde::{Deserialize, Serialize};

/// Where the conversation is in its request cycle.
///
/// The phase is the in-flight lock: at most one completion request exists
/// while the phase is `Welcoming` or `AwaitingReply`. The displayed processing
/// flag is derived from it and lags behind by the processing delay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Phase {
    /// Welcome call in flight; input disabled
    Welcoming,

    /// Ready for input
    #[default]
    Idle,

    /// A submission is waiting for its reply
    AwaitingReply {
        submission: u64,
        /// Set once the processing delay has elapsed
        indicator_shown: bool,
    },
}

/// The conversation store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatState {
    /// Ordered, append-only transcript
    pub messages: Vec<Message>,
    /// Current contents of the input box
    pub draft: String,
    pub is_typing: bool,
    /// Id of the live typing-clear timer; older timers are stale
    pub typing_generation: u64,
    pub phase: Phase,
    /// Token usage as reported by the proxy
    pub token_count: u64,
    pub next_submission: u64,
    /// Message of the last failed proxy call, cleared by the next request
    pub last_error: Option<String>,
    pub mounted: bool,
}

impl ChatState {
    /// Initial state for a freshly mounted page
    pub fn new(config: &ChatConfig) -> Self {
        let (phase, messages) = if config.welcome {
            (Phase::Welcoming, Vec::new())
        } else {
            let seeded = config
                .greeting
                .as_ref()
                .map(|g| vec![Message::assistant(g.clone())])
                .unwrap_or_default();
            (Phase::Idle, seeded)
        };

        Self {
            messages,
            draft: String::new(),
            is_typing: false,
            typing_generation: 0,
            phase,
            token_count: 0,
            next_submission: 1,
            last_error: None,
            mounted: true,
        }
    }

    /// Whether the "assistant is typing" placeholder is visible
    pub fn is_processing(&self) -> bool {
        match self.phase {
            Phase::Welcoming => true,
            Phase::Idle => false,
            Phase::AwaitingReply {
                indicator_shown, ..
            } => indicator_shown,
        }
    }

    /// Whether a completion request is outstanding
    pub fn is_busy(&self) -> bool {
        !matches!(self.phase, Phase::Idle)
    }

    pub fn budget_exhausted(&self, config: &ChatConfig) -> bool {
        config
            .token_cutoff
            .is_some_and(|cutoff| self.token_count >= cutoff)
    }

    /// Whether the input form accepts text
    pub fn input_enabled(&self, config: &ChatConfig) -> bool {
        self.mounted && !matches!(self.phase, Phase::Welcoming) && !self.budget_exhausted(config)
    }

    /// Whether `Retry` has something to resend
    pub fn can_retry(&self) -> bool {
        self.last_error.is_some()
            && matches!(self.phase, Phase::Idle)
            && self
                .messages
                .last()
                .is_some_and(|m| m.role == crate::llm::Role::User)
    }
}
