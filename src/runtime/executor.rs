//! Chat runtime executor

use super::timers::TimerSlot;
use super::traits::ProxyClient;
use super::UiEvent;

use crate::conversation::{transition, ChatConfig, ChatState, Effect, Event};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

/// Owns the conversation state and executes the effects of each transition
pub struct ChatRuntime<P>
where
    P: ProxyClient + 'static,
{
    config: ChatConfig,
    state: ChatState,
    proxy: Arc<P>,
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
    ui_tx: broadcast::Sender<UiEvent>,
    typing_timer: TimerSlot,
    processing_timer: TimerSlot,
    /// Token to cancel the outstanding proxy request
    request_cancel_token: Option<CancellationToken>,
}

impl<P> ChatRuntime<P>
where
    P: ProxyClient + 'static,
{
    pub fn new(
        config: ChatConfig,
        proxy: P,
        event_rx: mpsc::Receiver<Event>,
        event_tx: mpsc::Sender<Event>,
        ui_tx: broadcast::Sender<UiEvent>,
    ) -> Self {
        let state = ChatState::new(&config);
        Self {
            config,
            state,
            proxy: Arc::new(proxy),
            event_rx,
            event_tx,
            ui_tx,
            typing_timer: TimerSlot::default(),
            processing_timer: TimerSlot::default(),
            request_cancel_token: None,
        }
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    /// Process events until the conversation is unmounted. Returns the final state.
    pub async fn run(mut self) -> ChatState {
        tracing::info!(
            history_mode = ?self.config.history_mode,
            welcome = self.config.welcome,
            token_cutoff = ?self.config.token_cutoff,
            "Starting chat runtime"
        );

        while let Some(event) = self.event_rx.recv().await {
            self.process_event(event);
            if !self.state.mounted {
                break;
            }
        }

        self.cancel_all();
        tracing::info!(
            messages = self.state.messages.len(),
            token_count = self.state.token_count,
            "Chat runtime stopped"
        );
        self.state
    }

    fn process_event(&mut self, event: Event) {
        let result = match transition(&self.state, &self.config, event) {
            Ok(r) => r,
            Err(e) => {
                // Transition errors are user-facing (e.g., "message is too short")
                tracing::debug!(error = %e, "Event rejected");
                let _ = self.ui_tx.send(UiEvent::Alert(e.to_string()));
                return;
            }
        };

        if result.new_state != self.state {
            self.state = result.new_state;
            let _ = self.ui_tx.send(UiEvent::StateChanged(self.state.clone()));
        }

        for effect in result.effects {
            self.execute_effect(effect);
        }
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::ScheduleTypingClear { generation, delay } => {
                self.typing_timer.schedule(
                    delay,
                    self.event_tx.clone(),
                    Event::TypingElapsed { generation },
                );
            }

            Effect::CancelTypingClear => self.typing_timer.cancel(),

            Effect::ScheduleProcessingIndicator { submission, delay } => {
                self.processing_timer.schedule(
                    delay,
                    self.event_tx.clone(),
                    Event::ProcessingDelayElapsed { submission },
                );
            }

            Effect::CancelProcessingIndicator => self.processing_timer.cancel(),

            Effect::RequestWelcome => {
                let proxy = self.proxy.clone();
                self.spawn_request(async move {
                    tracing::info!("Requesting welcome message");
                    match proxy.welcome().await {
                        Ok(reply) => Event::WelcomeReceived { reply },
                        Err(e) => {
                            tracing::warn!(error = %e, "Welcome request failed");
                            Event::WelcomeFailed {
                                message: e.to_string(),
                            }
                        }
                    }
                });
            }

            Effect::RequestReply {
                submission,
                messages,
            } => {
                let proxy = self.proxy.clone();
                self.spawn_request(async move {
                    tracing::info!(submission, history_len = messages.len(), "Requesting reply");
                    match proxy.send(messages).await {
                        Ok(reply) => Event::ReplyReceived { submission, reply },
                        Err(e) => {
                            tracing::warn!(submission, error = %e, "Reply request failed");
                            Event::ReplyFailed {
                                submission,
                                message: e.to_string(),
                            }
                        }
                    }
                });
            }

            Effect::CancelAll => self.cancel_all(),

            Effect::ScrollToBottom => {
                let _ = self.ui_tx.send(UiEvent::ScrollToBottom);
            }
        }
    }

    /// Run a proxy call in the background and feed its outcome back as an event
    fn spawn_request<F>(&mut self, request: F)
    where
        F: Future<Output = Event> + Send + 'static,
    {
        let cancel_token = CancellationToken::new();
        if let Some(previous) = self.request_cancel_token.replace(cancel_token.clone()) {
            previous.cancel();
        }
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            tokio::select! {
                biased;

                () = cancel_token.cancelled() => {
                    tracing::info!("Proxy request cancelled");
                }

                event = request => {
                    let _ = event_tx.send(event).await;
                }
            }
        });
    }

    fn cancel_all(&mut self) {
        self.typing_timer.cancel();
        self.processing_timer.cancel();
        if let Some(token) = self.request_cancel_token.take() {
            token.cancel();
        }
    }
}
