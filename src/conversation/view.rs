//! Transcript and input views
//!
//! Both are pure functions of the state and configuration. The front end
//! only paints what these return.

use super::markdown::{self, RichLine};
use super::{ChatConfig, ChatState};
use crate::llm::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptItem {
    pub role: Role,
    pub alignment: Alignment,
    pub show_avatar: bool,
    pub body: Vec<RichLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptView {
    pub items: Vec<TranscriptItem>,
    /// Name shown on the "is typing" placeholder row
    pub typing_placeholder: Option<String>,
    pub error_notice: Option<String>,
    /// Index of the newest row, counting the placeholder and notice rows
    pub scroll_anchor: Option<usize>,
}

impl TranscriptView {
    pub fn row_count(&self) -> usize {
        self.items.len()
            + usize::from(self.typing_placeholder.is_some())
            + usize::from(self.error_notice.is_some())
    }
}

pub fn render_transcript(state: &ChatState, config: &ChatConfig) -> TranscriptView {
    let items = state
        .messages
        .iter()
        .map(|message| match message.role {
            Role::Assistant => TranscriptItem {
                role: Role::Assistant,
                alignment: Alignment::Left,
                show_avatar: true,
                body: if config.render_markdown {
                    markdown::render(&message.content)
                } else {
                    markdown::plain(&message.content)
                },
            },
            Role::User => TranscriptItem {
                role: Role::User,
                alignment: Alignment::Right,
                show_avatar: false,
                body: markdown::plain(&message.content),
            },
        })
        .collect();

    let typing_placeholder = state
        .is_processing()
        .then(|| config.assistant_name.clone());

    let error_notice = state.last_error.as_ref().map(|error| {
        if state.can_retry() {
            format!("{error} (press Ctrl+R to retry)")
        } else {
            error.clone()
        }
    });

    let mut view = TranscriptView {
        items,
        typing_placeholder,
        error_notice,
        scroll_anchor: None,
    };
    view.scroll_anchor = view.row_count().checked_sub(1);
    view
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputView {
    /// Hidden once the token budget is exhausted
    pub visible: bool,
    pub enabled: bool,
    pub draft: String,
    /// `n/max` character counter
    pub counter: String,
    pub over_limit: bool,
    pub send_enabled: bool,
    pub typing_label: Option<&'static str>,
}

pub fn render_input(state: &ChatState, config: &ChatConfig) -> InputView {
    let length = ChatConfig::length_of(&state.draft);
    let enabled = state.input_enabled(config);

    InputView {
        visible: !state.budget_exhausted(config),
        enabled,
        draft: state.draft.clone(),
        counter: format!("{length}/{}", config.max_length),
        over_limit: length > config.max_length,
        send_enabled: enabled
            && !state.is_busy()
            && (config.min_length..=config.max_length).contains(&length),
        typing_label: state.is_typing.then_some("Typing..."),
    }
}
