//! Effects produced by state transitions

use crate::llm::Message;
use std::time::Duration;

/// Effects to be executed by the runtime after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Cancel any pending typing-clear timer and schedule a new one
    ScheduleTypingClear { generation: u64, delay: Duration },

    /// Cancel the pending typing-clear timer
    CancelTypingClear,

    /// Schedule the delayed processing indicator for a submission
    ScheduleProcessingIndicator { submission: u64, delay: Duration },

    /// Cancel the pending processing indicator
    CancelProcessingIndicator,

    /// Ask the proxy for the opening greeting
    RequestWelcome,

    /// Ask the proxy for a reply
    RequestReply {
        submission: u64,
        messages: Vec<Message>,
    },

    /// Cancel every timer and any outstanding request
    CancelAll,

    /// Bring the newest transcript row into view
    ScrollToBottom,
}

impl Effect {
    pub fn request_reply(submission: u64, messages: Vec<Message>) -> Self {
        Effect::RequestReply {
            submission,
            messages,
        }
    }
}
