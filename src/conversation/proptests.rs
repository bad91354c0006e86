//! Property-based tests for the conversation state machine
//!
//! These tests verify key invariants hold across arbitrary event sequences.

use super::*;
use crate::llm::{Message, Role};
use crate::proxy::ChatReply;
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn idle_config() -> ChatConfig {
    ChatConfig {
        welcome: false,
        token_cutoff: None,
        ..Default::default()
    }
}

fn arb_config() -> impl Strategy<Value = ChatConfig> {
    (
        any::<bool>(),
        prop_oneof![Just(HistoryMode::FullList), Just(HistoryMode::SingleTurn)],
        prop_oneof![Just(None), (100u64..1000).prop_map(Some)],
    )
        .prop_map(|(welcome, history_mode, token_cutoff)| ChatConfig {
            welcome,
            history_mode,
            token_cutoff,
            ..Default::default()
        })
}

/// Fresh state after the runtime's single `Mount`
fn mounted(config: &ChatConfig) -> ChatState {
    let state = ChatState::new(config);
    transition(&state, config, Event::Mount).unwrap().new_state
}

fn reply(content: String, total_tokens: Option<u64>) -> ChatReply {
    ChatReply {
        message: Message::assistant(content),
        total_tokens,
    }
}

/// Whether a request is outstanding according to the effects so far
fn requests_in_flight(effects: &[Effect]) -> usize {
    effects
        .iter()
        .filter(|e| matches!(e, Effect::RequestReply { .. } | Effect::RequestWelcome))
        .count()
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_draft() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z ]{0,9}",
        "[a-zA-Z ?]{10,200}",
        "[a-z]{201,260}",
    ]
}

fn arb_key() -> impl Strategy<Value = Key> {
    prop_oneof![
        any::<char>().prop_map(Key::Char),
        Just(Key::Backspace),
        any::<bool>().prop_map(|shift| Key::Enter { shift }),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        arb_draft().prop_map(|text| Event::Input { text }),
        arb_key().prop_map(Event::Key),
        Just(Event::Submit),
        Just(Event::Retry),
        (0u64..6).prop_map(|generation| Event::TypingElapsed { generation }),
        (0u64..6).prop_map(|submission| Event::ProcessingDelayElapsed { submission }),
        ("[a-z ]{1,30}", proptest::option::of(0u64..400))
            .prop_map(|(c, t)| Event::WelcomeReceived { reply: reply(c, t) }),
        "[a-z ]{1,30}".prop_map(|message| Event::WelcomeFailed { message }),
        (0u64..6, "[a-z ]{1,30}", proptest::option::of(0u64..400)).prop_map(
            |(submission, c, t)| Event::ReplyReceived {
                submission,
                reply: reply(c, t),
            }
        ),
        (0u64..6, "[a-z ]{1,30}")
            .prop_map(|(submission, message)| Event::ReplyFailed { submission, message }),
    ]
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Invariant 1: rejected submissions never mutate state
    #[test]
    fn prop_rejection_leaves_state_unchanged(
        config in arb_config(),
        events in proptest::collection::vec(arb_event(), 0..30)
    ) {
        let mut state = mounted(&config);

        for event in events {
            let before = state.clone();
            match transition(&state, &config, event) {
                Ok(result) => state = result.new_state,
                Err(_) => prop_assert_eq!(&state, &before),
            }
        }
    }

    // Invariant 2: at most one request is in flight, and only while busy
    #[test]
    fn prop_single_request_in_flight(
        config in arb_config(),
        events in proptest::collection::vec(arb_event(), 0..30)
    ) {
        let mut state = mounted(&config);

        for event in events {
            let was_busy = state.is_busy();
            if let Ok(result) = transition(&state, &config, event) {
                let requests = requests_in_flight(&result.effects);
                prop_assert!(requests <= 1);
                if requests == 1 {
                    prop_assert!(result.new_state.is_busy());
                    prop_assert!(!was_busy, "request issued while another was in flight");
                }
                state = result.new_state;
            }
        }
    }

    // Invariant 3: transcript is append-only
    #[test]
    fn prop_messages_append_only(
        config in arb_config(),
        events in proptest::collection::vec(arb_event(), 0..30)
    ) {
        let mut state = mounted(&config);

        for event in events {
            if let Ok(result) = transition(&state, &config, event) {
                let new_messages = &result.new_state.messages;
                prop_assert!(new_messages.len() >= state.messages.len());
                prop_assert_eq!(&new_messages[..state.messages.len()], &state.messages[..]);
                state = result.new_state;
            }
        }
    }

    // Invariant 4: valid length submits; invalid length is rejected
    #[test]
    fn prop_length_validation(draft in arb_draft()) {
        let config = idle_config();
        let mut state = ChatState::new(&config);
        state.draft = draft.clone();

        let length = ChatConfig::length_of(&draft);
        let result = transition(&state, &config, Event::Submit);
        if (config.min_length..=config.max_length).contains(&length) {
            let new_state = result.unwrap().new_state;
            prop_assert_eq!(new_state.messages, vec![Message::user(draft)]);
        } else {
            prop_assert!(result.is_err());
        }
    }

    // Invariant 5: a successful round trip adds exactly two messages
    #[test]
    fn prop_round_trip_adds_two(
        draft in "[a-zA-Z ?]{10,200}",
        answer in "[a-zA-Z ]{1,80}",
        tokens in proptest::option::of(0u64..400)
    ) {
        let config = idle_config();
        let mut state = ChatState::new(&config);
        state.draft = draft;

        let waiting = transition(&state, &config, Event::Submit).unwrap().new_state;
        let Phase::AwaitingReply { submission, .. } = waiting.phase else {
            unreachable!("submit must take the lock");
        };
        let done = transition(
            &waiting,
            &config,
            Event::ReplyReceived { submission, reply: reply(answer, tokens) },
        )
        .unwrap()
        .new_state;

        prop_assert_eq!(done.messages.len(), state.messages.len() + 2);
        prop_assert_eq!(done.messages[1].role, Role::Assistant);
        prop_assert!(!done.is_busy());
    }

    // Invariant 6: timer events carrying a stale id are no-ops
    #[test]
    fn prop_stale_timers_are_noops(
        keystrokes in proptest::collection::vec(any::<char>(), 1..10),
        stale in 0u64..1000
    ) {
        let config = idle_config();
        let mut state = ChatState::new(&config);
        for c in keystrokes {
            state = transition(&state, &config, Event::Key(Key::Char(c))).unwrap().new_state;
        }
        prop_assume!(stale != state.typing_generation);

        let result = transition(&state, &config, Event::TypingElapsed { generation: stale }).unwrap();
        prop_assert_eq!(&result.new_state, &state);
        prop_assert!(result.effects.is_empty());

        let result =
            transition(&state, &config, Event::ProcessingDelayElapsed { submission: stale }).unwrap();
        prop_assert_eq!(&result.new_state, &state);
    }

    // Invariant 7: nothing mutates state after unmount
    #[test]
    fn prop_unmounted_is_frozen(
        config in arb_config(),
        events in proptest::collection::vec(arb_event(), 0..20)
    ) {
        let state = ChatState::new(&config);
        let closed = transition(&state, &config, Event::Unmount).unwrap().new_state;

        for event in events {
            if let Ok(result) = transition(&closed, &config, event) {
                prop_assert_eq!(&result.new_state, &closed);
                prop_assert!(result.effects.is_empty());
            }
        }
    }
}
