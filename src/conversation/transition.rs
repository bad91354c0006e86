//! Pure state transition function
//!
//! Given the same state, configuration and event, `transition` always
//! produces the same result. Timers and proxy calls are requested as effects
//! and executed by the runtime.

use super::{ChatConfig, ChatState, Effect, Event, HistoryMode, Key, Phase};
use crate::llm::{Message, Role};
use crate::proxy::ChatReply;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ChatState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ChatState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    /// No state change, no effects
    pub fn unchanged(state: &ChatState) -> Self {
        Self::new(state.clone())
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Rejections surfaced to the user as alerts. State is never mutated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Message is too short")]
    TooShort,
    #[error("Message is too long")]
    TooLong,
    #[error("Wait for {0} to answer")]
    Busy(String),
    #[error("This conversation has reached its limit")]
    BudgetExhausted,
    #[error("There is no failed message to retry")]
    NothingToRetry,
    #[error("This conversation is closed")]
    Unmounted,
}

/// Pure transition function
#[allow(clippy::too_many_lines, clippy::match_same_arms)] // one arm per (phase, event) pair
pub fn transition(
    state: &ChatState,
    config: &ChatConfig,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    if !state.mounted {
        // Late timer or proxy completions after unmount are dropped
        return match event {
            Event::Input { .. } | Event::Key(_) | Event::Submit | Event::Retry => {
                Err(TransitionError::Unmounted)
            }
            _ => Ok(TransitionResult::unchanged(state)),
        };
    }

    match (&state.phase, event) {
        // ============================================================
        // Lifecycle
        // ============================================================
        (Phase::Welcoming, Event::Mount) => Ok(TransitionResult::unchanged(state)
            .with_effect(Effect::RequestWelcome)
            .with_effect(Effect::ScrollToBottom)),

        (_, Event::Mount) => {
            Ok(TransitionResult::unchanged(state).with_effect(Effect::ScrollToBottom))
        }

        (_, Event::Unmount) => {
            let mut new_state = state.clone();
            new_state.mounted = false;
            new_state.is_typing = false;
            Ok(TransitionResult::new(new_state).with_effect(Effect::CancelAll))
        }

        // ============================================================
        // Typing
        // ============================================================
        (_, Event::Input { .. } | Event::Key(_)) if !state.input_enabled(config) => {
            Ok(TransitionResult::unchanged(state))
        }

        (_, Event::Input { text }) => Ok(typed(state, config, text)),

        (_, Event::Key(Key::Char(c))) => {
            let mut text = state.draft.clone();
            text.push(c);
            Ok(typed(state, config, text))
        }

        (_, Event::Key(Key::Backspace)) => {
            let mut text = state.draft.clone();
            text.pop();
            Ok(typed(state, config, text))
        }

        (_, Event::Key(Key::Enter { shift: true })) if config.shift_enter_newline => {
            let mut text = state.draft.clone();
            text.push('\n');
            Ok(typed(state, config, text))
        }

        (_, Event::TypingElapsed { generation })
            if generation == state.typing_generation && state.is_typing =>
        {
            let mut new_state = state.clone();
            new_state.is_typing = false;
            Ok(TransitionResult::new(new_state))
        }

        // Stale timer: a newer keystroke or a submit superseded it
        (_, Event::TypingElapsed { .. }) => Ok(TransitionResult::unchanged(state)),

        // ============================================================
        // Submission
        // ============================================================
        (_, Event::Key(Key::Enter { .. }) | Event::Submit) => submit(state, config),

        (_, Event::Retry) => retry(state, config),

        (
            Phase::AwaitingReply {
                submission,
                indicator_shown: false,
            },
            Event::ProcessingDelayElapsed { submission: elapsed },
        ) if *submission == elapsed => {
            let mut new_state = state.clone();
            new_state.phase = Phase::AwaitingReply {
                submission: elapsed,
                indicator_shown: true,
            };
            Ok(TransitionResult::new(new_state).with_effect(Effect::ScrollToBottom))
        }

        // The reply already arrived, or the submission is not ours
        (_, Event::ProcessingDelayElapsed { .. }) => Ok(TransitionResult::unchanged(state)),

        // ============================================================
        // Proxy responses
        // ============================================================
        (Phase::Welcoming, Event::WelcomeReceived { reply }) => {
            let mut new_state = state.clone();
            append_reply(&mut new_state, config, reply);
            new_state.phase = Phase::Idle;
            Ok(TransitionResult::new(new_state).with_effect(Effect::ScrollToBottom))
        }

        (Phase::Welcoming, Event::WelcomeFailed { message }) => {
            let mut new_state = state.clone();
            new_state.phase = Phase::Idle;
            new_state.last_error = Some(message);
            Ok(TransitionResult::new(new_state).with_effect(Effect::ScrollToBottom))
        }

        (Phase::AwaitingReply { submission, .. }, Event::ReplyReceived { submission: s, reply })
            if *submission == s =>
        {
            let mut new_state = state.clone();
            append_reply(&mut new_state, config, reply);
            new_state.phase = Phase::Idle;
            Ok(TransitionResult::new(new_state)
                .with_effect(Effect::CancelProcessingIndicator)
                .with_effect(Effect::ScrollToBottom))
        }

        (Phase::AwaitingReply { submission, .. }, Event::ReplyFailed { submission: s, message })
            if *submission == s =>
        {
            let mut new_state = state.clone();
            new_state.phase = Phase::Idle;
            new_state.last_error = Some(message);
            Ok(TransitionResult::new(new_state)
                .with_effect(Effect::CancelProcessingIndicator)
                .with_effect(Effect::ScrollToBottom))
        }

        // Responses for a request this state is no longer waiting on
        (
            _,
            Event::WelcomeReceived { .. }
            | Event::WelcomeFailed { .. }
            | Event::ReplyReceived { .. }
            | Event::ReplyFailed { .. },
        ) => Ok(TransitionResult::unchanged(state)),
    }
}

/// A keystroke: replace the draft and restart the typing debounce
fn typed(state: &ChatState, config: &ChatConfig, text: String) -> TransitionResult {
    let mut new_state = state.clone();
    new_state.draft = text;
    new_state.is_typing = true;
    new_state.typing_generation += 1;
    let generation = new_state.typing_generation;

    TransitionResult::new(new_state).with_effect(Effect::ScheduleTypingClear {
        generation,
        delay: config.typing_debounce,
    })
}

fn submit(state: &ChatState, config: &ChatConfig) -> Result<TransitionResult, TransitionError> {
    if state.budget_exhausted(config) {
        return Err(TransitionError::BudgetExhausted);
    }

    let length = ChatConfig::length_of(&state.draft);
    if length < config.min_length {
        return Err(TransitionError::TooShort);
    }
    if length > config.max_length {
        return Err(TransitionError::TooLong);
    }
    if state.is_busy() {
        return Err(TransitionError::Busy(config.assistant_name.clone()));
    }

    let mut new_state = state.clone();
    let message = Message::user(std::mem::take(&mut new_state.draft));
    new_state.messages.push(message.clone());

    // Invalidate the pending typing-clear as well as canceling it
    new_state.is_typing = false;
    new_state.typing_generation += 1;

    let submission = begin_request(&mut new_state);
    let payload = match config.history_mode {
        HistoryMode::FullList => new_state.messages.clone(),
        HistoryMode::SingleTurn => vec![message],
    };

    Ok(TransitionResult::new(new_state)
        .with_effect(Effect::CancelTypingClear)
        .with_effect(Effect::ScheduleProcessingIndicator {
            submission,
            delay: config.processing_delay,
        })
        .with_effect(Effect::request_reply(submission, payload))
        .with_effect(Effect::ScrollToBottom))
}

fn retry(state: &ChatState, config: &ChatConfig) -> Result<TransitionResult, TransitionError> {
    if state.budget_exhausted(config) {
        return Err(TransitionError::BudgetExhausted);
    }
    if state.is_busy() {
        return Err(TransitionError::Busy(config.assistant_name.clone()));
    }
    if !state.can_retry() {
        return Err(TransitionError::NothingToRetry);
    }

    let mut new_state = state.clone();
    let submission = begin_request(&mut new_state);
    let payload = match config.history_mode {
        HistoryMode::FullList => new_state.messages.clone(),
        HistoryMode::SingleTurn => new_state.messages.last().cloned().into_iter().collect(),
    };

    Ok(TransitionResult::new(new_state)
        .with_effect(Effect::ScheduleProcessingIndicator {
            submission,
            delay: config.processing_delay,
        })
        .with_effect(Effect::request_reply(submission, payload))
        .with_effect(Effect::ScrollToBottom))
}

/// Take the in-flight lock for a new submission and return its id
fn begin_request(state: &mut ChatState) -> u64 {
    let submission = state.next_submission;
    state.next_submission += 1;
    state.phase = Phase::AwaitingReply {
        submission,
        indicator_shown: false,
    };
    state.last_error = None;
    submission
}

/// Append an assistant reply and account for its token usage.
///
/// A full-list request reports usage for the whole history, so it replaces
/// the count; single-turn requests report only their own usage.
fn append_reply(state: &mut ChatState, config: &ChatConfig, reply: ChatReply) {
    state.messages.push(Message {
        role: Role::Assistant,
        content: reply.message.content,
    });

    if let Some(tokens) = reply.total_tokens {
        state.token_count = match config.history_mode {
            HistoryMode::FullList => tokens,
            HistoryMode::SingleTurn => state.token_count.saturating_add(tokens),
        };
    }
}
