use crate::data_structures::{Message, Role};
use serde_json::Value;

/// Heuristic for messages that used browsing/search or a tool.
pub fn is_advanced_message(message: &Message) -> bool {
    if message.role() == Role::Tool {
        return true;
    }

    let metadata = message.metadata();
    let hinted_search = match metadata.get("system_hints") {
        Some(Value::String(hint)) => hint == "search",
        Some(Value::Array(hints)) => hints.iter().any(|hint| hint.as_str() == Some("search")),
        _ => false,
    };

    hinted_search
        || metadata.get("command").and_then(Value::as_str) == Some("search")
        || message.text().contains("search(")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(role: Role, text: &str, metadata: Value) -> Message {
        Message::new("c", "m", None, role, 0.0, text).with_metadata(metadata)
    }

    #[test]
    fn test_plain_message_is_not_advanced() {
        assert!(!is_advanced_message(&message(Role::User, "hello", json!({}))));
        assert!(!is_advanced_message(&message(Role::User, "hello", Value::Null)));
    }

    #[test]
    fn test_system_hints() {
        let hinted = message(Role::User, "", json!({"system_hints": ["picture_v2", "search"]}));
        assert!(is_advanced_message(&hinted));

        let single = message(Role::User, "", json!({"system_hints": "search"}));
        assert!(is_advanced_message(&single));

        let other = message(Role::User, "", json!({"system_hints": ["reason"]}));
        assert!(!is_advanced_message(&other));
    }

    #[test]
    fn test_command_text_and_tool_role() {
        assert!(is_advanced_message(&message(Role::Assistant, "", json!({"command": "search"}))));
        assert!(is_advanced_message(&message(Role::Assistant, "search(\"rust\")", json!({}))));
        assert!(is_advanced_message(&message(Role::Tool, "", json!({}))));
    }
}
