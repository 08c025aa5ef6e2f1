//! # Memory Document
//!
//! The agent's durable memory: conversation history, the command log, the
//! function-call log and the last-state pointer. One document per state
//! file; the whole document is rewritten on every save.

use crate::provider::{ChatMessage, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level keys of the persisted document, in schema order
pub const DOCUMENT_KEYS: [&str; 4] = [
    "conversation_history",
    "command_results",
    "function_calls",
    "last_state",
];

/// One turn of the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ConversationEntry {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Some(Utc::now()),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

impl From<&ConversationEntry> for ChatMessage {
    fn from(entry: &ConversationEntry) -> Self {
        ChatMessage::new(entry.role, entry.content.clone())
    }
}

/// A shell command the agent ran (or refused to run) and what it produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub id: u64,
    pub command: String,
    pub output: String,
    pub timestamp: DateTime<Utc>,
}

/// A capability invocation requested by the model, with its raw arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallRecord {
    pub id: u64,
    pub name: String,
    pub arguments: String,
    pub timestamp: DateTime<Utc>,
}

/// Output of the most recent turn; seeds the next request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LastState {
    /// Name of the function invoked last turn, empty for free-text turns
    #[serde(default)]
    pub last_function: String,
    #[serde(default)]
    pub last_output: String,
}

/// The aggregate persisted by the state store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryDocument {
    pub conversation_history: Vec<ConversationEntry>,
    pub command_results: Vec<CommandRecord>,
    pub function_calls: Vec<FunctionCallRecord>,
    pub last_state: LastState,
}

impl MemoryDocument {
    /// Fresh document holding only the system seed entry
    pub fn new(seed_prompt: impl Into<String>) -> Self {
        Self {
            conversation_history: vec![ConversationEntry::system(seed_prompt)],
            command_results: Vec::new(),
            function_calls: Vec::new(),
            last_state: LastState::default(),
        }
    }

    /// Restore the leading system entry if the history lost it.
    ///
    /// Returns true when the document was modified.
    pub fn ensure_seed(&mut self, seed_prompt: &str) -> bool {
        match self.conversation_history.first() {
            Some(entry) if entry.role == Role::System => false,
            _ => {
                self.conversation_history
                    .insert(0, ConversationEntry::system(seed_prompt));
                true
            }
        }
    }

    pub fn push_entry(&mut self, entry: ConversationEntry) {
        self.conversation_history.push(entry);
    }

    /// Append a command record under the next free id and return that id
    pub fn record_command(&mut self, command: impl Into<String>, output: impl Into<String>) -> u64 {
        let id = self.command_results.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        self.command_results.push(CommandRecord {
            id,
            command: command.into(),
            output: output.into(),
            timestamp: Utc::now(),
        });
        id
    }

    /// Append a function-call record under the next free id and return that id
    pub fn record_function_call(&mut self, name: impl Into<String>, arguments: impl Into<String>) -> u64 {
        let id = self.function_calls.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        self.function_calls.push(FunctionCallRecord {
            id,
            name: name.into(),
            arguments: arguments.into(),
            timestamp: Utc::now(),
        });
        id
    }

    pub fn set_last_state(&mut self, last_function: impl Into<String>, last_output: impl Into<String>) {
        self.last_state = LastState {
            last_function: last_function.into(),
            last_output: last_output.into(),
        };
    }

    /// Up to `window` trailing non-system entries, oldest first
    pub fn recent_entries(&self, window: usize) -> Vec<&ConversationEntry> {
        let mut recent: Vec<_> = self
            .conversation_history
            .iter()
            .rev()
            .filter(|e| e.role != Role::System)
            .take(window)
            .collect();
        recent.reverse();
        recent
    }

    /// Up to `limit` most recent command records, oldest first
    pub fn recent_commands(&self, limit: usize) -> &[CommandRecord] {
        let len = self.command_results.len();
        &self.command_results[len.saturating_sub(limit)..]
    }
}
