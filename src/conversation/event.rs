//! Events that can occur in a conversation

use crate::proxy::ChatReply;

/// A keystroke in the input box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
    Enter { shift: bool },
}

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    Mount,
    Unmount,

    // User events
    /// The host replaced the whole input text
    Input { text: String },
    Key(Key),
    Submit,
    /// Resend the unanswered history after a failure
    Retry,

    // Timer events
    TypingElapsed { generation: u64 },
    ProcessingDelayElapsed { submission: u64 },

    // Proxy events
    WelcomeReceived { reply: ChatReply },
    WelcomeFailed { message: String },
    ReplyReceived { submission: u64, reply: ChatReply },
    ReplyFailed { submission: u64, message: String },
}
