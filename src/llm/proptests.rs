//! Property-based tests for the completion API translation layer
//!
//! These tests verify that translation between our internal types and the
//! wire format preserves key invariants:
//! - The persona instruction always leads the request
//! - Message order and content are preserved
//! - Normalized replies are always assistant messages
//! - HTTP statuses classify consistently

use super::openai::{
    OpenAIChoice, OpenAIMessage, OpenAIResponse, OpenAIService, OpenAIUsage, DEFAULT_MODEL,
};
use super::types::{LlmRequest, Message, Role};
use super::{LlmError, LlmErrorKind};
use proptest::prelude::*;
use std::time::Duration;

// ============================================================================
// Strategies
// ============================================================================

fn arb_message() -> impl Strategy<Value = Message> {
    (any::<bool>(), "[a-zA-Z0-9 _.!?,]{1,100}").prop_map(|(from_user, content)| {
        if from_user {
            Message::user(content)
        } else {
            Message::assistant(content)
        }
    })
}

fn arb_request() -> impl Strategy<Value = LlmRequest> {
    (
        proptest::option::of("[a-zA-Z .]{1,200}"),
        proptest::collection::vec(arb_message(), 0..12),
        proptest::option::of(1u32..4096),
    )
        .prop_map(|(system, messages, max_tokens)| LlmRequest {
            system,
            messages,
            max_tokens,
        })
}

fn arb_role() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("assistant".to_string()),
        Just("user".to_string()),
        Just("system".to_string()),
        "[a-z]{1,10}",
    ]
}

fn arb_response() -> impl Strategy<Value = OpenAIResponse> {
    (
        proptest::collection::vec(
            (arb_role(), proptest::option::of("[a-zA-Z0-9 ]{0,80}")),
            0..3,
        ),
        proptest::option::of((0u64..2000, 0u64..2000)),
    )
        .prop_map(|(choices, usage)| OpenAIResponse {
            choices: choices
                .into_iter()
                .map(|(role, content)| OpenAIChoice {
                    message: OpenAIMessage { role, content },
                })
                .collect(),
            usage: usage.map(|(prompt, completion)| OpenAIUsage {
                prompt_tokens: prompt,
                completion_tokens: completion,
                total_tokens: prompt + completion,
            }),
        })
}

fn service() -> OpenAIService {
    OpenAIService::new(
        "test-key".to_string(),
        DEFAULT_MODEL,
        "https://example.com/v1",
        Duration::from_secs(5),
    )
    .unwrap()
}

// ============================================================================
// Request translation
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_translate_puts_system_first_and_preserves_order(request in arb_request()) {
        let translated = service().translate_request(&request);
        let offset = usize::from(request.system.is_some());

        prop_assert_eq!(translated.messages.len(), request.messages.len() + offset);
        if let Some(system) = &request.system {
            prop_assert_eq!(translated.messages[0].role.as_str(), "system");
            prop_assert_eq!(translated.messages[0].content.as_ref(), Some(system));
        }
        for (wire, original) in translated.messages[offset..].iter().zip(&request.messages) {
            prop_assert_eq!(wire.role.as_str(), original.role.as_str());
            prop_assert_eq!(wire.content.as_deref(), Some(original.content.as_str()));
        }
        prop_assert_eq!(translated.max_tokens, request.max_tokens);
    }

    #[test]
    fn prop_translated_request_serializes(request in arb_request()) {
        let translated = service().translate_request(&request);
        let json = serde_json::to_value(&translated).unwrap();

        prop_assert_eq!(json["model"].as_str(), Some(DEFAULT_MODEL));
        prop_assert_eq!(json.get("max_tokens").is_some(), request.max_tokens.is_some());
        prop_assert!(json["messages"]
            .as_array()
            .unwrap()
            .iter()
            .all(|m| m["content"].is_string()));
    }
}

// ============================================================================
// Response normalization
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_normalize_ok_iff_choice_present(response in arb_response()) {
        let had_choice = !response.choices.is_empty();
        let expected_usage = response.usage.as_ref().map(|u| u.total_tokens);
        let first_content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        match OpenAIService::normalize_response(response) {
            Ok(normalized) => {
                prop_assert!(had_choice);
                prop_assert_eq!(&normalized.message.role, &Role::Assistant);
                prop_assert_eq!(&normalized.message.content, &first_content);
                prop_assert_eq!(normalized.total_tokens(), expected_usage);
            }
            Err(e) => {
                prop_assert!(!had_choice);
                prop_assert_eq!(e.kind, LlmErrorKind::Unknown);
            }
        }
    }

    #[test]
    fn prop_status_classification(status in 100u16..600, message in "[a-z ]{0,30}") {
        let error = LlmError::from_status(status, &message);
        let expected = match status {
            401 | 403 => LlmErrorKind::Auth,
            429 => LlmErrorKind::RateLimit,
            400 => LlmErrorKind::InvalidRequest,
            500..=599 => LlmErrorKind::ServerError,
            _ => LlmErrorKind::Unknown,
        };
        prop_assert_eq!(error.kind, expected);
        prop_assert!(error.message.contains(&message));
    }
}
