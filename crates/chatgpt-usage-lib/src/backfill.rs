use crate::data_structures::{Message, Role};
use std::collections::HashMap;
use tracing::debug;

/// Attributes each assistant's model to the prompt it answered.
///
/// The export only stamps `model_slug` on assistant turns, so a user message
/// learns its model from the assistant whose parent it is. The lookup is
/// built completely before any message is changed; when several assistants
/// answered the same prompt the last one in export order wins.
pub fn assign_user_models(messages: &mut [Message]) {
    let mut answered_by: HashMap<(String, String), String> = HashMap::new();

    for message in messages.iter() {
        if message.role() != Role::Assistant {
            continue;
        }
        if let (Some(parent_id), Some(model)) = (message.parent_id(), message.model()) {
            answered_by.insert(
                (message.conversation_id().to_string(), parent_id.to_string()),
                model.to_string(),
            );
        }
    }

    let mut assigned = 0usize;
    for message in messages.iter_mut() {
        if message.role() != Role::User || message.model().is_some_and(|m| !m.is_empty()) {
            continue;
        }
        let key = (
            message.conversation_id().to_string(),
            message.message_id().to_string(),
        );
        if let Some(model) = answered_by.get(&key) {
            message.set_model(model.clone());
            assigned += 1;
        }
    }

    debug!(assigned, "backfilled user message models");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_inherits_answering_model() {
        let mut messages = vec![
            Message::new("c", "u1", None, Role::User, 1.0, "question"),
            Message::new("c", "a1", Some("u1".to_string()), Role::Assistant, 2.0, "answer")
                .with_model("gpt-4o"),
        ];

        assign_user_models(&mut messages);
        assert_eq!(messages[0].model(), Some("gpt-4o"));
    }

    #[test]
    fn test_order_independent() {
        let mut messages = vec![
            Message::new("c", "a1", Some("u1".to_string()), Role::Assistant, 2.0, "answer")
                .with_model("o3"),
            Message::new("c", "u1", None, Role::User, 1.0, "question"),
        ];

        assign_user_models(&mut messages);
        assert_eq!(messages[1].model(), Some("o3"));
    }

    #[test]
    fn test_existing_model_is_kept() {
        let mut messages = vec![
            Message::new("c", "u1", None, Role::User, 1.0, "question").with_model("gpt-4"),
            Message::new("c", "a1", Some("u1".to_string()), Role::Assistant, 2.0, "answer")
                .with_model("gpt-4o"),
        ];

        assign_user_models(&mut messages);
        assert_eq!(messages[0].model(), Some("gpt-4"));
    }

    #[test]
    fn test_unanswered_user_and_other_conversations() {
        let mut messages = vec![
            Message::new("c1", "u1", None, Role::User, 1.0, "question"),
            Message::new("c2", "a1", Some("u1".to_string()), Role::Assistant, 2.0, "answer")
                .with_model("gpt-4o"),
            Message::new("c1", "s1", None, Role::System, 0.5, "system"),
        ];

        assign_user_models(&mut messages);
        assert_eq!(messages[0].model(), None);
        assert_eq!(messages[2].model(), None);
    }
}
