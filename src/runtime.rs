//! Runtime for driving a conversation
//!
//! Owns the state, runs timers and proxy calls, and broadcasts every change
//! to the front end.

mod executor;
mod timers;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::ChatRuntime;
pub use timers::TimerSlot;
pub use traits::*;

use crate::conversation::{ChatConfig, ChatState, Event};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// Updates sent to the front end
#[derive(Debug, Clone)]
pub enum UiEvent {
    StateChanged(ChatState),
    /// A rejected action, shown once
    Alert(String),
    ScrollToBottom,
}

/// Handle to interact with a running conversation
pub struct ChatHandle {
    event_tx: mpsc::Sender<Event>,
    ui_tx: broadcast::Sender<UiEvent>,
    task: JoinHandle<ChatState>,
}

impl ChatHandle {
    /// Start a runtime in the background. Nothing happens until `Event::Mount`
    /// is sent, so callers can subscribe first.
    pub fn spawn<P: ProxyClient + 'static>(config: ChatConfig, proxy: P) -> Self {
        let (event_tx, event_rx) = mpsc::channel(32);
        let (ui_tx, _) = broadcast::channel(128);

        let runtime = ChatRuntime::new(config, proxy, event_rx, event_tx.clone(), ui_tx.clone());
        let task = tokio::spawn(runtime.run());

        Self {
            event_tx,
            ui_tx,
            task,
        }
    }

    /// Send an event to the conversation
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.event_tx
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {e}"))
    }

    /// Subscribe to conversation updates
    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.ui_tx.subscribe()
    }

    /// Unmount the conversation if it is still mounted and wait for the
    /// runtime to stop
    pub async fn finished(self) -> Result<ChatState, String> {
        // Fails only when the runtime has already stopped
        let _ = self.event_tx.send(Event::Unmount).await;
        self.task
            .await
            .map_err(|e| format!("Chat runtime failed: {e}"))
    }
}
