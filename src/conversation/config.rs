//! Conversation configuration
//!
//! One conversation module covers every page variant: which history is sent,
//! whether a welcome call opens the session, and where the token budget cuts
//! the conversation off.

use crate::env::{self, ConfigError, Lookup};
use std::time::Duration;

/// What the proxy receives on each submit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryMode {
    /// The whole ordered message list
    #[default]
    FullList,
    /// Only the message just submitted
    SingleTurn,
}

impl std::str::FromStr for HistoryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "full" | "full-list" | "full_list" => Ok(HistoryMode::FullList),
            "single" | "single-turn" | "single_turn" => Ok(HistoryMode::SingleTurn),
            other => Err(format!("unknown history mode '{other}' (expected full or single)")),
        }
    }
}

/// Configuration for a conversation (immutable for its lifetime)
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub history_mode: HistoryMode,
    /// Issue a welcome call at mount time
    pub welcome: bool,
    /// Input is disabled once the token count reaches this value
    pub token_cutoff: Option<u64>,
    /// Inclusive bounds on submitted message length, in characters
    pub min_length: usize,
    pub max_length: usize,
    /// Delay before the processing indicator is shown
    pub processing_delay: Duration,
    /// Idle time after the last keystroke before `is_typing` clears
    pub typing_debounce: Duration,
    /// Seeded assistant greeting when the welcome call is disabled
    pub greeting: Option<String>,
    pub render_markdown: bool,
    /// Shift+Enter inserts a newline instead of submitting
    pub shift_enter_newline: bool,
    /// Shown in the "wait for ... to answer" alert
    pub assistant_name: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_mode: HistoryMode::FullList,
            welcome: true,
            token_cutoff: Some(500),
            min_length: 10,
            max_length: 200,
            processing_delay: Duration::from_millis(750),
            typing_debounce: Duration::from_millis(1500),
            greeting: None,
            render_markdown: true,
            shift_enter_newline: true,
            assistant_name: "Virtual Vince".to_string(),
        }
    }
}

impl ChatConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&env::process_env)
    }

    pub fn from_lookup(lookup: &impl Lookup) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            history_mode: env::parsed(lookup, "VINCE_HISTORY_MODE")?
                .unwrap_or(defaults.history_mode),
            welcome: env::flag(lookup, "VINCE_WELCOME")?.unwrap_or(defaults.welcome),
            token_cutoff: env::limit(lookup, "VINCE_TOKEN_CUTOFF")?
                .unwrap_or(defaults.token_cutoff),
            greeting: env::string(lookup, "VINCE_GREETING").or(defaults.greeting),
            render_markdown: env::flag(lookup, "VINCE_MARKDOWN")?
                .unwrap_or(defaults.render_markdown),
            assistant_name: env::string(lookup, "PERSONA_NAME")
                .unwrap_or(defaults.assistant_name),
            ..defaults
        })
    }

    /// Number of characters counted against the length bounds
    pub fn length_of(text: &str) -> usize {
        text.chars().count()
    }
}
