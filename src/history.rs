//! Conversation history persisted as a JSON array of chat messages.
//!
//! `rag generate --history FILE` loads the prior exchange, sends it ahead
//! of the new prompt, then appends the prompt and the reply and saves.

use anyhow::{Context, Result};
use std::path::Path;

use repo_rag_core::generation::ChatMessage;

#[derive(Debug, Clone, Default)]
pub struct ChatHistory {
    pub messages: Vec<ChatMessage>,
}

impl ChatHistory {
    /// Load `path`, or start empty when it does not exist yet.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read history file: {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let messages: Vec<ChatMessage> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse history file: {}", path.display()))?;
        Ok(Self { messages })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.messages)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write history file: {}", path.display()))?;
        Ok(())
    }

    pub fn push_exchange(&mut self, prompt: &str, reply: &str) {
        self.messages.push(ChatMessage::user(prompt));
        self.messages.push(ChatMessage::assistant(reply));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repo_rag_core::generation::Role;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let history = ChatHistory::load(&tmp.path().join("none.json")).unwrap();
        assert!(history.messages.is_empty());
    }

    #[test]
    fn test_save_and_reload() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("chats/session.json");

        let mut history = ChatHistory::default();
        history.push_exchange("write tests for add", "def test_add(): ...");
        history.save(&path).unwrap();

        let loaded = ChatHistory::load(&path).unwrap();
        assert_eq!(loaded.messages.len(), 2);
        assert_eq!(loaded.messages[0].role, Role::User);
        assert_eq!(loaded.messages[1].content, "def test_add(): ...");

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"role\": \"assistant\""));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(ChatHistory::load(&path).is_err());
    }
}
