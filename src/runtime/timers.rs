//! Cancelable one-shot timers

use crate::conversation::Event;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Holds at most one pending timer. Scheduling replaces the previous timer;
/// dropping the slot cancels it.
#[derive(Default)]
pub struct TimerSlot {
    cancel_token: Option<CancellationToken>,
}

impl TimerSlot {
    /// Deliver `event` on `event_tx` after `delay` unless canceled first
    pub fn schedule(&mut self, delay: Duration, event_tx: mpsc::Sender<Event>, event: Event) {
        self.cancel();

        let cancel_token = CancellationToken::new();
        self.cancel_token = Some(cancel_token.clone());

        tokio::spawn(async move {
            tokio::select! {
                biased;

                () = cancel_token.cancelled() => {}

                () = tokio::time::sleep(delay) => {
                    let _ = event_tx.send(event).await;
                }
            }
        });
    }

    pub fn cancel(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.cancel_token.is_some()
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}
