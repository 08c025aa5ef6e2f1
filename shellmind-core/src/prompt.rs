//! System prompt and the single capability offered to the model.

use crate::error::{self, Result};
use crate::provider::ToolDefinition;
use std::path::Path;

/// User content of the first request, before any output exists
pub const START_SENTINEL: &str = "Start autonomous operation";

/// Name of the only capability the model may invoke
pub const EXECUTE_COMMAND: &str = "execute_command";

const DEFAULT_PROMPT: &str = "You are an autonomous operator working in a Unix shell. \
Each turn you receive the output of your previous action. Decide what to do next and, \
when a shell command is needed, call execute_command with the exact command line. \
Prefer small, observable steps and explain briefly what you are doing.";

/// The instruction text sent at the head of every request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemPrompt(String);

impl SystemPrompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Read a prompt file. Surrounding whitespace is dropped; an empty or
    /// unreadable file is a configuration error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            error::config_invalid("prompt_file", format!("cannot read {}: {}", path.display(), e))
                .with_operation("prompt::load")
                .set_source(e)
        })?;

        let text = content.trim();
        if text.is_empty() {
            return Err(error::config_invalid(
                "prompt_file",
                format!("{} is empty", path.display()),
            )
            .with_operation("prompt::load"));
        }
        Ok(Self(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SystemPrompt {
    fn default() -> Self {
        Self(DEFAULT_PROMPT.to_string())
    }
}

impl std::fmt::Display for SystemPrompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// `execute_command(command: string)`, the capability declared on every request
pub fn execute_command_tool() -> ToolDefinition {
    ToolDefinition::new(EXECUTE_COMMAND, "Execute a terminal command").with_parameters(
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The terminal command to execute"
                }
            },
            "required": ["command"]
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_load_trims_whitespace() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prompt.txt");
        std::fs::write(&path, "\n  Keep the disk tidy.  \n\n").unwrap();

        let prompt = SystemPrompt::load(&path).unwrap();
        assert_eq!(prompt.as_str(), "Keep the disk tidy.");
    }

    #[test]
    fn test_empty_or_missing_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("empty.txt");
        std::fs::write(&empty, "   \n").unwrap();

        let err = SystemPrompt::load(&empty).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);

        let err = SystemPrompt::load(dir.path().join("absent.txt")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert_eq!(err.operation(), "prompt::load");
    }

    #[test]
    fn test_default_prompt_mentions_capability() {
        assert!(SystemPrompt::default().as_str().contains(EXECUTE_COMMAND));
    }

    #[test]
    fn test_tool_requires_command_string() {
        let tool = execute_command_tool();
        assert_eq!(tool.name, "execute_command");
        assert_eq!(tool.parameters["required"][0], "command");
        assert_eq!(tool.parameters["properties"]["command"]["type"], "string");
    }
}
