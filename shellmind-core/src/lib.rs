//! # shellmind core
//!
//! Building blocks of an autonomous shell agent.
//!
//! ## Core Concepts
//! - **Memory document**: conversation history, command log, function-call log
//!   and the last turn's output, persisted as one JSON file
//! - **State store**: crash-safe load/save of that document
//! - **Provider**: trait-based chat-completion access (OpenAI-compatible, scripted)
//! - **Executor**: runs a shell command under a timeout
//! - **Prompt**: the system prompt and the `execute_command` capability

pub mod error;
pub mod executor;
pub mod memory;
pub mod prompt;
pub mod provider;
pub mod store;

pub use error::{Error, ErrorKind, ErrorStatus, Result};
pub use executor::{CommandExecutor, CommandOutcome, ExecutorConfig, DEFAULT_COMMAND_TIMEOUT_SECS};
pub use memory::{
    CommandRecord, ConversationEntry, FunctionCallRecord, LastState, MemoryDocument,
};
pub use prompt::{execute_command_tool, SystemPrompt, EXECUTE_COMMAND, START_SENTINEL};
pub use provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider,
    OpenAIProvider, ProviderConfig, ProviderError, Role, ScriptedProvider, ToolCall,
    ToolChoice, ToolDefinition, Usage, UsageTracker,
};
pub use store::{StateStore, DEFAULT_STATE_FILE};
