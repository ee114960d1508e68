//! Tree-aware input/output token attribution.
//!
//! Every assistant turn is billed for the whole transcript that precedes it,
//! and in an export with edited prompts or regenerated answers that
//! transcript is the path from the tree root, not the chronological order of
//! messages. Each conversation is walked root to leaves with an explicit
//! stack so deep conversations cannot overflow the call stack.

use crate::data_structures::{Message, MessageKey, Role, TokenAttribution};
use std::collections::HashMap;
use tracing::debug;

pub struct ConversationAccountant;

impl ConversationAccountant {
    pub fn new() -> Self {
        Self
    }

    /// Sets `context_token_count` on every reachable message and returns the
    /// input/output attribution for each of them.
    ///
    /// Messages must already carry a `token_count`; a missing count is
    /// treated as zero. Parent references that do not resolve inside the
    /// conversation make the message a root. Child ids that do not resolve
    /// are skipped. A message is visited at most once per walk.
    pub fn account(&self, messages: &mut [Message]) -> HashMap<MessageKey, TokenAttribution> {
        let contexts = self.context_tokens(messages);
        let mut attributions = HashMap::with_capacity(messages.len());

        for (message, context) in messages.iter_mut().zip(contexts) {
            let Some(context) = context else {
                continue;
            };
            message.set_context_token_count(context);
            attributions.insert(message.key(), attribute(message, context));
        }

        attributions
    }

    /// Context size per message, by index. `None` marks messages no walk reached.
    fn context_tokens(&self, messages: &[Message]) -> Vec<Option<u64>> {
        let mut contexts: Vec<Option<u64>> = vec![None; messages.len()];

        for (conversation_id, indices) in partition_by_conversation(messages) {
            let lookup: HashMap<&str, usize> = indices
                .iter()
                .map(|&index| (messages[index].message_id(), index))
                .collect();

            let roots: Vec<usize> = indices
                .iter()
                .copied()
                .filter(|&index| {
                    messages[index]
                        .parent_id()
                        .map_or(true, |parent| !lookup.contains_key(parent))
                })
                .collect();

            // (message index, context inherited from ancestors)
            let mut stack: Vec<(usize, u64)> = roots.iter().rev().map(|&root| (root, 0)).collect();
            let mut visited = 0usize;

            while let Some((index, context)) = stack.pop() {
                if contexts[index].is_some() {
                    continue;
                }
                contexts[index] = Some(context);
                visited += 1;

                let message = &messages[index];
                let next_context = context + message.token_count().unwrap_or(0);

                for child_id in message.children_ids().iter().rev() {
                    match lookup.get(child_id.as_str()) {
                        Some(&child) if contexts[child].is_none() => {
                            stack.push((child, next_context))
                        }
                        Some(_) => {}
                        None => debug!(
                            conversation = %conversation_id,
                            child = %child_id,
                            "skipping dangling child reference"
                        ),
                    }
                }
            }

            debug!(
                conversation = %conversation_id,
                roots = roots.len(),
                visited,
                messages = indices.len(),
                "accounted conversation"
            );
        }

        contexts
    }
}

impl Default for ConversationAccountant {
    fn default() -> Self {
        Self::new()
    }
}

fn partition_by_conversation(messages: &[Message]) -> HashMap<&str, Vec<usize>> {
    let mut conversations: HashMap<&str, Vec<usize>> = HashMap::new();
    for (index, message) in messages.iter().enumerate() {
        conversations
            .entry(message.conversation_id())
            .or_default()
            .push(index);
    }
    conversations
}

/// Only assistant turns are billed: input is everything before them, output
/// is their own text.
fn attribute(message: &Message, context: u64) -> TokenAttribution {
    match message.role() {
        Role::Assistant => {
            TokenAttribution::new(context, message.token_count().unwrap_or(0), context)
        }
        Role::User | Role::System | Role::Tool | Role::Other => {
            TokenAttribution::new(0, 0, context)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: &str, parent: Option<&str>, role: Role, tokens: u64, children: &[&str]) -> Message {
        let mut message = Message::new("conv", id, parent.map(str::to_string), role, 0.0, "")
            .with_children(children.iter().copied());
        message.set_token_count(tokens);
        message
    }

    fn find<'a>(messages: &'a [Message], id: &str) -> &'a Message {
        messages.iter().find(|m| m.message_id() == id).unwrap()
    }

    fn key(id: &str) -> MessageKey {
        MessageKey::new("conv", id)
    }

    #[test]
    fn test_branching_conversation() {
        let mut messages = vec![
            message("A", None, Role::User, 0, &["B"]),
            message("B", Some("A"), Role::Assistant, 10, &["C1", "C2"]),
            message("C1", Some("B"), Role::User, 5, &[]),
            message("C2", Some("B"), Role::User, 7, &[]),
        ];

        let result = ConversationAccountant::new().account(&mut messages);

        assert_eq!(result.len(), 4);
        assert_eq!(result[&key("B")].input_tokens(), 0);
        assert_eq!(result[&key("B")].output_tokens(), 10);
        assert_eq!(find(&messages, "A").context_token_count(), Some(0));
        assert_eq!(find(&messages, "C1").context_token_count(), Some(10));
        assert_eq!(find(&messages, "C2").context_token_count(), Some(10));
        assert_eq!(result[&key("C1")], TokenAttribution::new(0, 0, 10));
    }

    #[test]
    fn test_context_accumulates_along_path_not_chronology() {
        // root user(4) -> assistant(6) -> edited prompts u2a(3) / u2b(8), each answered
        let mut messages = vec![
            message("u1", None, Role::User, 4, &["a1"]),
            message("a1", Some("u1"), Role::Assistant, 6, &["u2a", "u2b"]),
            message("u2a", Some("a1"), Role::User, 3, &["a2a"]),
            message("u2b", Some("a1"), Role::User, 8, &["a2b"]),
            message("a2a", Some("u2a"), Role::Assistant, 5, &[]),
            message("a2b", Some("u2b"), Role::Assistant, 9, &[]),
        ];

        let result = ConversationAccountant::new().account(&mut messages);

        assert_eq!(result[&key("a1")], TokenAttribution::new(4, 6, 4));
        assert_eq!(result[&key("a2a")], TokenAttribution::new(13, 5, 13));
        assert_eq!(result[&key("a2b")], TokenAttribution::new(18, 9, 18));
    }

    #[test]
    fn test_context_equals_ancestor_sum() {
        let mut messages = vec![
            message("r", None, Role::System, 2, &["u"]),
            message("u", Some("r"), Role::User, 3, &["a"]),
            message("a", Some("u"), Role::Assistant, 5, &["t"]),
            message("t", Some("a"), Role::Tool, 7, &["a2"]),
            message("a2", Some("t"), Role::Assistant, 11, &[]),
        ];

        ConversationAccountant::new().account(&mut messages);

        let by_id: HashMap<&str, &Message> =
            messages.iter().map(|m| (m.message_id(), m)).collect();
        for m in &messages {
            let mut expected = 0;
            let mut parent = m.parent_id();
            while let Some(id) = parent {
                let ancestor = by_id[id];
                expected += ancestor.token_count().unwrap();
                parent = ancestor.parent_id();
            }
            assert_eq!(m.context_token_count(), Some(expected), "message {}", m.message_id());
        }
    }

    #[test]
    fn test_non_assistant_messages_are_not_billed() {
        let mut messages = vec![
            message("s", None, Role::System, 20, &["u"]),
            message("u", Some("s"), Role::User, 30, &["t"]),
            message("t", Some("u"), Role::Tool, 40, &["o"]),
            message("o", Some("t"), Role::Other, 50, &[]),
        ];

        let result = ConversationAccountant::new().account(&mut messages);
        for id in ["s", "u", "t", "o"] {
            assert_eq!(result[&key(id)].input_tokens(), 0);
            assert_eq!(result[&key(id)].output_tokens(), 0);
        }
    }

    #[test]
    fn test_orphan_becomes_root() {
        let mut messages = vec![
            message("a", Some("missing"), Role::Assistant, 10, &["u"]),
            message("u", Some("a"), Role::User, 3, &[]),
        ];

        let result = ConversationAccountant::new().account(&mut messages);
        assert_eq!(result[&key("a")], TokenAttribution::new(0, 10, 0));
        assert_eq!(find(&messages, "u").context_token_count(), Some(10));
    }

    #[test]
    fn test_dangling_child_is_skipped() {
        let mut messages = vec![
            message("u", None, Role::User, 3, &["ghost", "a"]),
            message("a", Some("u"), Role::Assistant, 4, &["ghost2"]),
        ];

        let result = ConversationAccountant::new().account(&mut messages);
        assert_eq!(result.len(), 2);
        assert_eq!(result[&key("a")].input_tokens(), 3);
    }

    #[test]
    fn test_each_message_visited_once_with_wide_branching() {
        let children: Vec<String> = (0..50).map(|i| format!("a{i}")).collect();
        let child_refs: Vec<&str> = children.iter().map(String::as_str).collect();
        let mut messages = vec![message("u", None, Role::User, 1, &child_refs)];
        for id in &children {
            messages.push(message(id, Some("u"), Role::Assistant, 2, &[]));
        }

        let result = ConversationAccountant::new().account(&mut messages);
        assert_eq!(result.len(), messages.len());
        assert!(messages.iter().all(|m| m.context_token_count().is_some()));
    }

    #[test]
    fn test_cycle_in_children_terminates() {
        let mut messages = vec![
            message("a", None, Role::User, 1, &["b"]),
            message("b", Some("a"), Role::Assistant, 2, &["a", "b"]),
        ];

        let result = ConversationAccountant::new().account(&mut messages);
        assert_eq!(result.len(), 2);
        assert_eq!(find(&messages, "a").context_token_count(), Some(0));
    }

    #[test]
    fn test_parent_cycle_without_root_yields_nothing() {
        let mut messages = vec![
            message("a", Some("b"), Role::User, 1, &["b"]),
            message("b", Some("a"), Role::Assistant, 2, &["a"]),
        ];

        let result = ConversationAccountant::new().account(&mut messages);
        assert!(result.is_empty());
        assert!(messages.iter().all(|m| m.context_token_count().is_none()));
    }

    #[test]
    fn test_deep_conversation_does_not_overflow() {
        let depth = 100_000;
        let mut messages = Vec::with_capacity(depth);
        for i in 0..depth {
            let id = format!("m{i}");
            let parent = (i > 0).then(|| format!("m{}", i - 1));
            let next = format!("m{}", i + 1);
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            let mut m = Message::new("conv", id, parent, role, 0.0, "").with_children([next]);
            m.set_token_count(1);
            messages.push(m);
        }

        let result = ConversationAccountant::new().account(&mut messages);
        assert_eq!(result.len(), depth);
        assert_eq!(messages[depth - 1].context_token_count(), Some(depth as u64 - 1));
    }

    #[test]
    fn test_conversations_are_independent() {
        let mut first = Message::new("c1", "x", None, Role::User, 0.0, "").with_children(["y"]);
        first.set_token_count(5);
        let mut second = Message::new("c2", "y", Some("x".to_string()), Role::Assistant, 0.0, "");
        second.set_token_count(3);
        let mut messages = vec![first, second];

        let result = ConversationAccountant::new().account(&mut messages);
        assert_eq!(result[&MessageKey::new("c2", "y")], TokenAttribution::new(0, 3, 0));
        assert_eq!(result[&MessageKey::new("c1", "x")].context_tokens(), 0);
    }
}
