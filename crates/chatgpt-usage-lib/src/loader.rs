use crate::data_structures::{Message, Role};
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name of the conversation dump inside an export folder.
pub const CONVERSATIONS_FILE: &str = "conversations.json";

pub struct DataLoader;

impl DataLoader {
    pub fn new() -> Self {
        Self
    }

    /// Accepts either the export folder or the `conversations.json` file itself.
    pub fn resolve_export_path<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        let path = path.as_ref();
        if path.is_dir() {
            path.join(CONVERSATIONS_FILE)
        } else {
            path.to_path_buf()
        }
    }

    pub fn load_conversations<P: AsRef<Path>>(&self, path: P) -> Result<Vec<Value>> {
        let file_path = self.resolve_export_path(path);
        let file = File::open(&file_path)
            .with_context(|| format!("Failed to open file: {}", file_path.display()))?;

        let json: Value = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse export: {}", file_path.display()))?;

        match json {
            Value::Array(conversations) => {
                info!(
                    path = %file_path.display(),
                    conversations = conversations.len(),
                    "loaded export"
                );
                Ok(conversations)
            }
            other => {
                warn!(
                    path = %file_path.display(),
                    kind = json_kind(&other),
                    "export is not a list of conversations"
                );
                Ok(Vec::new())
            }
        }
    }

    pub fn load_messages<P: AsRef<Path>>(&self, path: P) -> Result<Vec<Message>> {
        let conversations = self.load_conversations(path)?;
        Ok(self.extract_messages(&conversations))
    }

    /// Flattens every conversation's node mapping into messages. Nodes
    /// without a message payload or a creation time are skipped.
    pub fn extract_messages(&self, conversations: &[Value]) -> Vec<Message> {
        let mut messages = Vec::new();
        let mut skipped = 0usize;

        for (index, conversation) in conversations.iter().enumerate() {
            let conversation_id = conversation_id(conversation, index);

            let Some(mapping) = conversation.get("mapping").and_then(Value::as_object) else {
                debug!(conversation = %conversation_id, "conversation has no node mapping");
                continue;
            };

            for (node_id, node) in mapping {
                match self.parse_node(&conversation_id, node_id, node) {
                    Some(message) => messages.push(message),
                    None => skipped += 1,
                }
            }
        }

        info!(
            conversations = conversations.len(),
            messages = messages.len(),
            skipped_nodes = skipped,
            "extracted messages"
        );

        messages
    }

    fn parse_node(&self, conversation_id: &str, node_id: &str, node: &Value) -> Option<Message> {
        let message = node
            .get("message")
            .and_then(Value::as_object)
            .filter(|message| !message.is_empty())?;

        let Some(created_at) = message.get("create_time").and_then(Value::as_f64) else {
            debug!(conversation = %conversation_id, node = %node_id, "node has no create_time");
            return None;
        };

        let role = message
            .get("author")
            .and_then(|author| author.get("role"))
            .and_then(Value::as_str)
            .map(Role::parse)
            .unwrap_or(Role::Other);

        let parent_id = node
            .get("parent")
            .and_then(Value::as_str)
            .map(str::to_string);

        let children: Vec<&str> = node
            .get("children")
            .and_then(Value::as_array)
            .map(|children| children.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let (text, content_type) = match message.get("content").and_then(Value::as_object) {
            Some(content) => extract_text(content),
            None => (String::new(), "text".to_string()),
        };

        let metadata = message.get("metadata").cloned().unwrap_or(Value::Null);

        let mut parsed = Message::new(conversation_id, node_id, parent_id, role, created_at, text)
            .with_children(children)
            .with_content_type(content_type);

        if let Some(model) = metadata
            .get("model_slug")
            .and_then(Value::as_str)
            .filter(|model| !model.is_empty())
        {
            parsed = parsed.with_model(model);
        }

        Some(parsed.with_metadata(metadata))
    }
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn conversation_id(conversation: &Value, index: usize) -> String {
    match conversation.get("conversation_id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Null) | None => index.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Returns `(text, content_type)`. Only string parts count as text; image
/// references and other structured parts are dropped.
fn extract_text(content: &Map<String, Value>) -> (String, String) {
    let content_type = content
        .get("content_type")
        .and_then(Value::as_str)
        .unwrap_or("text")
        .to_string();

    let parts = content.get("parts").and_then(Value::as_array);
    let joined_parts = || {
        parts
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default()
    };

    let text = if content_type == "text" && parts.is_some() {
        joined_parts()
    } else {
        match content.get("text").and_then(Value::as_str) {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => joined_parts(),
        }
    };

    (text, content_type)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample_export() -> Value {
        json!([
            {
                "conversation_id": "conv-1",
                "mapping": {
                    "root": {"message": null, "parent": null, "children": ["u1"]},
                    "u1": {
                        "message": {
                            "author": {"role": "user"},
                            "create_time": 1704103200.25,
                            "content": {"content_type": "text", "parts": ["Hello", {"asset_pointer": "file-1"}, "world"]},
                            "metadata": {}
                        },
                        "parent": "root",
                        "children": ["a1"]
                    },
                    "a1": {
                        "message": {
                            "author": {"role": "assistant"},
                            "create_time": 1704103205,
                            "content": {"content_type": "text", "parts": ["Hi there"]},
                            "metadata": {"model_slug": "gpt-4o"}
                        },
                        "parent": "u1",
                        "children": []
                    }
                }
            }
        ])
    }

    #[test]
    fn test_extract_messages() {
        let loader = DataLoader::new();
        let export = sample_export();
        let messages = loader.extract_messages(export.as_array().unwrap());

        assert_eq!(messages.len(), 2);
        let user = messages.iter().find(|m| m.message_id() == "u1").unwrap();
        assert_eq!(user.conversation_id(), "conv-1");
        assert_eq!(user.role(), Role::User);
        assert_eq!(user.text(), "Hello\nworld");
        assert_eq!(user.parent_id(), Some("root"));
        assert_eq!(user.children_ids(), ["a1".to_string()]);
        assert_eq!(user.model(), None);

        let assistant = messages.iter().find(|m| m.message_id() == "a1").unwrap();
        assert_eq!(assistant.model(), Some("gpt-4o"));
        assert_eq!(assistant.created_at(), 1704103205.0);
    }

    #[test]
    fn test_skips_nodes_without_message_or_timestamp() {
        let loader = DataLoader::new();
        let export = json!([{
            "mapping": {
                "a": {"message": null, "parent": null, "children": []},
                "b": {"message": {}, "parent": null, "children": []},
                "c": {"message": {"author": {"role": "user"}, "create_time": null}, "parent": null},
                "d": {"message": {"author": {"role": "user"}, "create_time": 5}, "parent": null}
            }
        }]);

        let messages = loader.extract_messages(export.as_array().unwrap());
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message_id(), "d");
        assert!(messages[0].children_ids().is_empty());
    }

    #[test]
    fn test_conversation_id_falls_back_to_position() {
        let loader = DataLoader::new();
        let node = json!({"message": {"author": {"role": "user"}, "create_time": 1}, "parent": null});
        let export = json!([
            {"conversation_id": "named", "mapping": {"x": node.clone()}},
            {"mapping": {"y": node.clone()}},
            {"conversation_id": null, "mapping": {"z": node}}
        ]);

        let messages = loader.extract_messages(export.as_array().unwrap());
        let ids: Vec<&str> = messages.iter().map(|m| m.conversation_id()).collect();
        assert_eq!(ids, ["named", "1", "2"]);
    }

    #[test]
    fn test_non_text_content_uses_text_field() {
        let content = json!({"content_type": "code", "text": "print(1)", "parts": ["ignored"]});
        let (text, content_type) = extract_text(content.as_object().unwrap());
        assert_eq!(text, "print(1)");
        assert_eq!(content_type, "code");

        let content = json!({"content_type": "multimodal_text", "parts": ["caption", {"image": 1}, "more"]});
        let (text, _) = extract_text(content.as_object().unwrap());
        assert_eq!(text, "caption\nmore");

        let content = json!({"content_type": "tether_browsing_display"});
        let (text, _) = extract_text(content.as_object().unwrap());
        assert_eq!(text, "");
    }

    #[test]
    fn test_unknown_role_and_missing_author() {
        let loader = DataLoader::new();
        let export = json!([{
            "conversation_id": "c",
            "mapping": {
                "x": {"message": {"author": {"role": "critic"}, "create_time": 1}, "parent": null},
                "y": {"message": {"create_time": 2}, "parent": "x"}
            }
        }]);

        let messages = loader.extract_messages(export.as_array().unwrap());
        assert!(messages.iter().all(|m| m.role() == Role::Other));
    }

    #[test]
    fn test_load_from_file_and_folder() {
        let loader = DataLoader::new();
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(sample_export().to_string().as_bytes())
            .unwrap();

        let messages = loader.load_messages(temp_file.path()).unwrap();
        assert_eq!(messages.len(), 2);

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONVERSATIONS_FILE), sample_export().to_string()).unwrap();
        let messages = loader.load_messages(dir.path()).unwrap();
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let loader = DataLoader::new();
        let dir = tempfile::tempdir().unwrap();
        assert!(loader.load_conversations(dir.path()).is_err());
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let loader = DataLoader::new();
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(br#"[{"mapping": "#).unwrap();

        assert!(loader.load_conversations(temp_file.path()).is_err());
    }

    #[test]
    fn test_non_array_export_yields_nothing() {
        let loader = DataLoader::new();
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(br#"{"mapping": {}}"#).unwrap();

        assert!(loader.load_conversations(temp_file.path()).unwrap().is_empty());
    }
}
