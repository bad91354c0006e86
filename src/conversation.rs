//! Conversation store and state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions. The
//! runtime owns the state, feeds events in, and executes the effects that
//! come back out.

mod config;
mod effect;
pub mod event;
pub mod markdown;
pub mod state;
pub(crate) mod transition;
pub mod view;

#[cfg(test)]
mod proptests;

pub use config::{ChatConfig, HistoryMode};
pub use effect::Effect;
pub use event::{Event, Key};
pub use state::{ChatState, Phase};
pub use transition::{transition, TransitionError, TransitionResult};
pub use view::{render_input, render_transcript, Alignment, InputView, TranscriptItem, TranscriptView};
