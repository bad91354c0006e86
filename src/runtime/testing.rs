//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::ProxyClient;
use crate::llm::{LlmError, LlmRequest, LlmResponse, LlmService, Message, Usage};
use crate::proxy::{ChatReply, ProxyError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Mock LLM Service
// ============================================================================

/// Mock completion service that returns queued responses
pub struct MockLlmService {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmService {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful assistant reply
    pub fn queue_reply(&self, content: &str, total_tokens: Option<u64>) {
        let usage = total_tokens.map(|total| Usage {
            prompt_tokens: total / 2,
            completion_tokens: total - total / 2,
            total_tokens: total,
        });
        self.responses.lock().unwrap().push_back(Ok(LlmResponse {
            message: Message::assistant(content),
            usage,
        }));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockLlmService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmService for MockLlmService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}

// ============================================================================
// Mock Proxy Client
// ============================================================================

/// Mock proxy client with queued replies and an optional latency
pub struct MockProxyClient {
    replies: Mutex<VecDeque<Result<ChatReply, ProxyError>>>,
    welcomes: Mutex<VecDeque<Result<ChatReply, ProxyError>>>,
    delay: Duration,
    /// Payload of every `send`
    pub sends: Mutex<Vec<Vec<Message>>>,
    welcome_calls: AtomicUsize,
}

impl MockProxyClient {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            welcomes: Mutex::new(VecDeque::new()),
            delay,
            sends: Mutex::new(Vec::new()),
            welcome_calls: AtomicUsize::new(0),
        }
    }

    pub fn queue_reply(&self, content: &str, total_tokens: Option<u64>) {
        self.replies.lock().unwrap().push_back(Ok(ChatReply {
            message: Message::assistant(content),
            total_tokens,
        }));
    }

    pub fn queue_error(&self, error: ProxyError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn queue_welcome(&self, content: &str, total_tokens: Option<u64>) {
        self.welcomes.lock().unwrap().push_back(Ok(ChatReply {
            message: Message::assistant(content),
            total_tokens,
        }));
    }

    pub fn recorded_sends(&self) -> Vec<Vec<Message>> {
        self.sends.lock().unwrap().clone()
    }

    pub fn welcome_calls(&self) -> usize {
        self.welcome_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockProxyClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProxyClient for MockProxyClient {
    async fn send(&self, messages: Vec<Message>) -> Result<ChatReply, ProxyError> {
        self.sends.lock().unwrap().push(messages);
        tokio::time::sleep(self.delay).await;
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProxyError::Transport("No mock reply queued".to_string())))
    }

    async fn welcome(&self) -> Result<ChatReply, ProxyError> {
        self.welcome_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.welcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ProxyError::Unavailable))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{ChatConfig, ChatState, Event, HistoryMode, Key, Phase};
    use crate::llm::Role;
    use crate::runtime::{ChatHandle, UiEvent};
    use std::sync::Arc;
    use tokio::sync::broadcast;

    const HELLO: &str = "Hello there, how are you today?";

    fn no_welcome() -> ChatConfig {
        ChatConfig {
            welcome: false,
            ..Default::default()
        }
    }

    /// Let spawned timer and request tasks run to their next await point
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    /// Wait for a broadcast state matching `pred`
    async fn wait_for_state(
        rx: &mut broadcast::Receiver<UiEvent>,
        pred: impl Fn(&ChatState) -> bool,
    ) -> ChatState {
        let wait = async {
            loop {
                match rx.recv().await {
                    Ok(UiEvent::StateChanged(state)) if pred(&state) => return state,
                    Ok(_) => {}
                    Err(e) => panic!("UI channel failed: {e}"),
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(30), wait)
            .await
            .expect("timed out waiting for state")
    }

    async fn wait_for_alert(rx: &mut broadcast::Receiver<UiEvent>) -> String {
        let wait = async {
            loop {
                match rx.recv().await {
                    Ok(UiEvent::Alert(message)) => return message,
                    Ok(_) => {}
                    Err(e) => panic!("UI channel failed: {e}"),
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(30), wait)
            .await
            .expect("timed out waiting for alert")
    }

    /// Drain pending updates and return every state seen
    fn drain_states(rx: &mut broadcast::Receiver<UiEvent>) -> Vec<ChatState> {
        let mut states = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let UiEvent::StateChanged(state) = event {
                states.push(state);
            }
        }
        states
    }

    async fn start(
        config: ChatConfig,
        proxy: Arc<MockProxyClient>,
    ) -> (ChatHandle, broadcast::Receiver<UiEvent>) {
        let handle = ChatHandle::spawn(config, proxy);
        let rx = handle.subscribe();
        handle.send(Event::Mount).await.unwrap();
        (handle, rx)
    }

    async fn submit(handle: &ChatHandle, text: &str) {
        handle
            .send(Event::Input {
                text: text.to_string(),
            })
            .await
            .unwrap();
        handle.send(Event::Submit).await.unwrap();
    }

    #[tokio::test]
    async fn test_mock_llm_service() {
        let llm = MockLlmService::new();
        llm.queue_reply("Hello!", Some(12));

        let request = LlmRequest {
            messages: vec![Message::user(HELLO)],
            ..Default::default()
        };
        let response = llm.complete(&request).await.unwrap();
        assert_eq!(response.message.content, "Hello!");
        assert_eq!(response.total_tokens(), Some(12));
        assert_eq!(llm.recorded_requests().len(), 1);

        // Nothing queued
        assert!(llm.complete(&request).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_welcome_on_mount() {
        let proxy = Arc::new(MockProxyClient::with_delay(Duration::from_secs(1)));
        proxy.queue_welcome("Hey I am Virtual Vince! What's your name?", Some(90));

        let (handle, mut rx) = start(ChatConfig::default(), proxy.clone()).await;

        let state = wait_for_state(&mut rx, |s| s.phase == Phase::Idle).await;
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].role, Role::Assistant);
        assert_eq!(state.token_count, 90);
        assert!(state.input_enabled(&ChatConfig::default()));
        assert_eq!(proxy.welcome_calls(), 1);

        handle.send(Event::Unmount).await.unwrap();
        handle.finished().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_reply_shows_indicator_after_delay() {
        let proxy = Arc::new(MockProxyClient::with_delay(Duration::from_secs(2)));
        proxy.queue_reply("Great, thanks! What's your name?", Some(120));

        let (handle, mut rx) = start(no_welcome(), proxy.clone()).await;
        let start = tokio::time::Instant::now();
        submit(&handle, HELLO).await;

        let sent = wait_for_state(&mut rx, |s| s.messages.len() == 1).await;
        assert!(sent.is_busy());
        assert!(!sent.is_processing());
        assert!(sent.draft.is_empty());

        let shown = wait_for_state(&mut rx, ChatState::is_processing).await;
        assert!(start.elapsed() >= Duration::from_millis(750));
        assert_eq!(shown.messages.len(), 1);

        let done = wait_for_state(&mut rx, |s| s.messages.len() == 2).await;
        assert!(!done.is_processing());
        assert_eq!(done.token_count, 120);
        assert_eq!(proxy.recorded_sends(), vec![vec![Message::user(HELLO)]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_reply_never_shows_indicator() {
        let proxy = Arc::new(MockProxyClient::with_delay(Duration::from_millis(100)));
        proxy.queue_reply("Quick one!", None);

        let (handle, mut rx) = start(no_welcome(), proxy).await;
        submit(&handle, HELLO).await;

        wait_for_state(&mut rx, |s| s.messages.len() == 2).await;

        // Well past the processing delay
        tokio::time::sleep(Duration::from_secs(2)).await;
        settle().await;
        assert!(drain_states(&mut rx).iter().all(|s| !s.is_processing()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_message_alerts() {
        let proxy = Arc::new(MockProxyClient::new());
        let (handle, mut rx) = start(no_welcome(), proxy.clone()).await;

        submit(&handle, "hi").await;

        assert_eq!(wait_for_alert(&mut rx).await, "Message is too short");
        settle().await;
        assert!(proxy.recorded_sends().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_while_busy_alerts() {
        let proxy = Arc::new(MockProxyClient::with_delay(Duration::from_secs(5)));
        proxy.queue_reply("Sure.", Some(100));

        let (handle, mut rx) = start(no_welcome(), proxy.clone()).await;
        submit(&handle, HELLO).await;
        submit(&handle, "And what about the weather?").await;

        assert_eq!(
            wait_for_alert(&mut rx).await,
            "Wait for Virtual Vince to answer"
        );

        let done = wait_for_state(&mut rx, |s| s.phase == Phase::Idle).await;
        assert_eq!(done.messages.len(), 2);
        assert_eq!(proxy.recorded_sends().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_debounce() {
        let proxy = Arc::new(MockProxyClient::new());
        let (handle, mut rx) = start(no_welcome(), proxy).await;

        handle.send(Event::Key(Key::Char('H'))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1000)).await;
        handle.send(Event::Key(Key::Char('i'))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1000)).await;
        settle().await;

        // The first timer would have fired at 1500ms
        let states = drain_states(&mut rx);
        assert!(states.last().is_some_and(|s| s.is_typing && s.draft == "Hi"));

        tokio::time::sleep(Duration::from_millis(600)).await;
        settle().await;
        let states = drain_states(&mut rx);
        assert!(states.last().is_some_and(|s| !s.is_typing));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_then_retry() {
        let proxy = Arc::new(MockProxyClient::new());
        proxy.queue_error(ProxyError::Transport("connection refused".to_string()));
        proxy.queue_reply("Sorry about that!", Some(75));

        let (handle, mut rx) = start(no_welcome(), proxy.clone()).await;
        submit(&handle, HELLO).await;

        let failed = wait_for_state(&mut rx, |s| s.last_error.is_some()).await;
        assert_eq!(failed.phase, Phase::Idle);
        assert_eq!(failed.messages.len(), 1);
        assert!(failed.can_retry());

        handle.send(Event::Retry).await.unwrap();
        let done = wait_for_state(&mut rx, |s| s.messages.len() == 2).await;
        assert!(done.last_error.is_none());

        let sends = proxy.recorded_sends();
        assert_eq!(sends.len(), 2);
        assert_eq!(sends[0], sends[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_turn_sends_only_new_message() {
        let config = ChatConfig {
            welcome: false,
            history_mode: HistoryMode::SingleTurn,
            greeting: Some("Hey I am Virtual Vince!".to_string()),
            ..Default::default()
        };
        let proxy = Arc::new(MockProxyClient::new());
        proxy.queue_reply("Fine, thanks.", Some(30));

        let (handle, mut rx) = start(config, proxy.clone()).await;
        submit(&handle, HELLO).await;

        let done = wait_for_state(&mut rx, |s| s.messages.len() == 3).await;
        assert_eq!(done.token_count, 30);
        assert_eq!(proxy.recorded_sends(), vec![vec![Message::user(HELLO)]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_cancels_pending_work() {
        let proxy = Arc::new(MockProxyClient::with_delay(Duration::from_secs(5)));
        proxy.queue_reply("You will never see this", Some(10));

        let (handle, _rx) = start(no_welcome(), proxy.clone()).await;
        submit(&handle, HELLO).await;
        // Let the request start before unmounting
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.send(Event::Key(Key::Char('x'))).await.unwrap();
        handle.send(Event::Unmount).await.unwrap();

        let final_state = handle.finished().await.unwrap();
        assert!(!final_state.mounted);
        assert_eq!(final_state.messages, vec![Message::user(HELLO)]);

        tokio::time::sleep(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(proxy.recorded_sends().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_unmounts_a_mounted_conversation() {
        let proxy = Arc::new(MockProxyClient::with_delay(Duration::from_secs(1)));
        proxy.queue_welcome("Hey I am Virtual Vince! What's your name?", Some(90));

        let (handle, mut rx) = start(ChatConfig::default(), proxy).await;
        wait_for_state(&mut rx, |s| s.phase == Phase::Idle).await;

        let final_state = tokio::time::timeout(Duration::from_secs(5), handle.finished())
            .await
            .expect("runtime kept running without an unmount")
            .unwrap();
        assert!(!final_state.mounted);
        assert_eq!(final_state.messages.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_after_unmount() {
        let (handle, _rx) = start(no_welcome(), Arc::new(MockProxyClient::new())).await;
        handle.send(Event::Unmount).await.unwrap();
        settle().await;

        let final_state = tokio::time::timeout(Duration::from_secs(5), handle.finished())
            .await
            .expect("runtime kept running after an unmount")
            .unwrap();
        assert!(!final_state.mounted);
    }
}
