//! Broker topics published and consumed by the coordinator
//!
//! Topic names are dot-separated words. Subscription patterns follow the
//! usual broker convention: `*` matches exactly one word and `#` matches zero
//! or more words.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A context was created through the registry
pub const CONTEXT_CREATED: &str = "display.displayContext.created";

/// The active context changed
pub const CONTEXT_CHANGED: &str = "display.displayContext.changed";

/// A context was closed on every worker
pub const CONTEXT_CLOSED: &str = "display.displayContext.closed";

/// A worker announced its orderly removal
pub const DISPLAY_REMOVED: &str = "display.removed";

/// Payload of [`CONTEXT_CREATED`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextCreated {
    pub display_context: String,
}

/// Payload of [`CONTEXT_CHANGED`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextChanged {
    pub display_context: String,
    pub last_display_context: Option<String>,
}

/// Payload of [`CONTEXT_CLOSED`]: one entry per worker reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextClosed {
    pub display_context: String,
    pub details: Vec<Value>,
}

/// Worker identity carried by a [`DISPLAY_REMOVED`] message.
///
/// Workers send either the bare display name or `{"displayName": ...}`.
pub fn removed_display(payload: &Value) -> Option<&str> {
    let name = match payload {
        Value::String(name) => Some(name.as_str()),
        Value::Object(map) => map.get("displayName").and_then(Value::as_str),
        _ => None,
    };
    name.filter(|name| !name.is_empty())
}

/// Check whether `topic` matches a subscription `pattern`
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let topic: Vec<&str> = topic.split('.').collect();
    matches_words(&pattern, &topic)
}

fn matches_words(pattern: &[&str], topic: &[&str]) -> bool {
    match pattern.split_first() {
        None => topic.is_empty(),
        Some((&"#", rest)) => (0..=topic.len()).any(|skip| matches_words(rest, &topic[skip..])),
        Some((word, rest)) => match topic.split_first() {
            Some((first, remaining)) => {
                (*word == "*" || word == first) && matches_words(rest, remaining)
            }
            None => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_exact_topic_match() {
        assert!(topic_matches(DISPLAY_REMOVED, "display.removed"));
        assert!(!topic_matches(DISPLAY_REMOVED, "display.removed.extra"));
    }

    #[test]
    fn test_wildcards() {
        assert!(topic_matches("display.*", "display.removed"));
        assert!(!topic_matches("display.*", CONTEXT_CHANGED));
        assert!(topic_matches("display.#", CONTEXT_CHANGED));
        assert!(topic_matches("#", "anything.at.all"));
        assert!(topic_matches("display.displayContext.*", CONTEXT_CLOSED));
    }

    #[test]
    fn test_changed_payload_shape() {
        let value = serde_json::to_value(ContextChanged {
            display_context: "beta".to_string(),
            last_display_context: Some("alpha".to_string()),
        })
        .unwrap();
        assert_eq!(
            value,
            json!({ "displayContext": "beta", "lastDisplayContext": "alpha" })
        );
    }

    #[test]
    fn test_removed_display_payloads() {
        assert_eq!(removed_display(&json!("left")), Some("left"));
        assert_eq!(
            removed_display(&json!({ "displayName": "right" })),
            Some("right")
        );
        assert_eq!(removed_display(&json!("")), None);
        assert_eq!(removed_display(&json!(42)), None);
    }
}
