//! Agent implementation - one model/shell turn per trigger

use crate::channel::{DisplayMessage, MessageChannel};
use serde::Deserialize;
use shellmind_core::{
    execute_command_tool, ChatMessage, CommandExecutor, CommandOutcome, CompletionRequest,
    CompletionResponse, ConversationEntry, ExecutorConfig, LlmProvider, MemoryDocument,
    StateStore, ToolCall, ToolChoice, UsageTracker, EXECUTE_COMMAND, START_SENTINEL,
};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default number of history entries sent with each request
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

/// Largest accepted history window
pub const MAX_HISTORY_WINDOW: usize = 50;

pub const INVALID_JSON_OUTPUT: &str = "Error: Invalid JSON in function arguments";
pub const NO_COMMAND_OUTPUT: &str = "Error: No command provided in function arguments";

/// Configuration for the agent
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Sent as the first message of every request
    pub system_prompt: String,
    /// Model id; the provider's default when unset
    pub model: Option<String>,
    /// Trailing non-system history entries included per request
    pub history_window: usize,
    pub executor: ExecutorConfig,
}

impl AgentConfig {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            model: None,
            history_window: DEFAULT_HISTORY_WINDOW,
            executor: ExecutorConfig::default(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the history window, clamped to `1..=MAX_HISTORY_WINDOW`
    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window.clamp(1, MAX_HISTORY_WINDOW);
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.executor.timeout = timeout;
        self
    }

    pub fn with_reject_metacharacters(mut self, reject: bool) -> Self {
        self.executor.reject_metacharacters = reject;
        self
    }
}

/// What a turn turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnKind {
    /// The model answered in free text
    Response,
    /// `execute_command` ran (or was refused by the executor)
    Command {
        command: String,
        record_id: u64,
        outcome: CommandOutcome,
    },
    /// `execute_command` arguments were not valid JSON
    InvalidArguments,
    /// `execute_command` arguments had no string `command`
    MissingCommand,
    /// The model invoked a capability that does not exist
    UnknownFunction { name: String },
    /// The remote call failed
    ProviderFailed,
}

/// Result of one call to [`Agent::step`]
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub kind: TurnKind,
    /// Becomes `last_output` and the next request's user content
    pub output: String,
    /// False when the state file could not be written this turn
    pub persisted: bool,
}

impl TurnOutcome {
    pub fn is_error(&self) -> bool {
        match &self.kind {
            TurnKind::Response => false,
            TurnKind::Command { outcome, .. } => outcome.is_error(),
            _ => true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExecuteCommandArgs {
    command: String,
}

/// Everything a turn decided before it is written down
struct Turn {
    kind: TurnKind,
    function: String,
    output: String,
    assistant_content: String,
}

impl Turn {
    fn text(kind: TurnKind, function: impl Into<String>, output: String) -> Self {
        Self {
            kind,
            function: function.into(),
            assistant_content: output.clone(),
            output,
        }
    }
}

/// The interaction loop: owns the memory document and drives the provider
pub struct Agent<P: LlmProvider> {
    provider: P,
    store: StateStore,
    document: MemoryDocument,
    executor: CommandExecutor,
    config: AgentConfig,
    channel: MessageChannel,
    usage: UsageTracker,
    turns: usize,
}

impl<P: LlmProvider> Agent<P> {
    /// Create an agent, loading (or initializing) the document from `store`
    pub fn new(provider: P, store: StateStore, config: AgentConfig) -> Self {
        let document = store.load();
        info!(
            provider = provider.name(),
            path = %store.path().display(),
            entries = document.conversation_history.len(),
            commands = document.command_results.len(),
            "agent ready"
        );
        Self {
            provider,
            store,
            document,
            executor: CommandExecutor::new(config.executor.clone()),
            config,
            channel: MessageChannel::new(),
            usage: UsageTracker::new(),
            turns: 0,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn document(&self) -> &MemoryDocument {
        &self.document
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    /// Turns completed since this agent was created
    pub fn turns(&self) -> usize {
        self.turns
    }

    /// Drain display messages published by previous turns
    pub fn receive_messages(&mut self) -> Vec<DisplayMessage> {
        self.channel.receive_messages()
    }

    fn model(&self) -> String {
        self.config
            .model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    /// User content of the next request: the last output, or the start
    /// sentinel while there is none
    pub fn next_user_content(&self) -> String {
        let last_output = &self.document.last_state.last_output;
        if last_output.is_empty() {
            START_SENTINEL.to_string()
        } else {
            last_output.clone()
        }
    }

    /// Assemble `[system, ..last K entries, user]` with the command capability
    pub fn build_request(&self) -> CompletionRequest {
        let mut messages = vec![ChatMessage::system(&self.config.system_prompt)];
        messages.extend(
            self.document
                .recent_entries(self.config.history_window)
                .into_iter()
                .map(ChatMessage::from),
        );
        messages.push(ChatMessage::user(self.next_user_content()));

        debug!(messages = messages.len(), window = self.config.history_window, "request assembled");

        CompletionRequest::new(messages)
            .with_model(self.model())
            .with_tools(vec![execute_command_tool()])
            .with_tool_choice(ToolChoice::Auto)
    }

    /// Run one full turn: call the model, act on its answer, persist and
    /// publish the result. Failures are folded into the outcome.
    pub async fn step(&mut self) -> TurnOutcome {
        let user_content = self.next_user_content();
        let request = self.build_request();
        let model = request.model.clone().unwrap_or_default();

        info!(turn = self.turns + 1, model = %model, "requesting completion");
        let turn = match self.provider.complete(request).await {
            Ok(response) => {
                let model = if response.model.is_empty() { &model } else { &response.model };
                self.usage.track(model, &response.usage);
                self.handle_response(response).await
            }
            Err(e) => {
                warn!(error = %e, kind = %e.kind(), "completion failed");
                Turn::text(TurnKind::ProviderFailed, "", format!("Error: {}", e))
            }
        };

        self.turns += 1;
        let persisted = self.persist(user_content, &turn);
        self.publish(&turn);

        TurnOutcome {
            kind: turn.kind,
            output: turn.output,
            persisted,
        }
    }

    async fn handle_response(&mut self, response: CompletionResponse) -> Turn {
        match response.tool_calls.into_iter().next() {
            Some(call) => self.handle_tool_call(call).await,
            None => {
                let content = response.content.unwrap_or_default();
                info!(len = content.len(), "model replied in text");
                Turn::text(TurnKind::Response, "", content)
            }
        }
    }

    async fn handle_tool_call(&mut self, call: ToolCall) -> Turn {
        let call_id = self.document.record_function_call(&call.name, &call.arguments);
        debug!(call_id, name = %call.name, arguments = %call.arguments, "function call recorded");

        if call.name != EXECUTE_COMMAND {
            warn!(name = %call.name, "model called an unknown function");
            let output = format!("Error: Unknown function '{}'", call.name);
            return Turn::text(TurnKind::UnknownFunction { name: call.name.clone() }, call.name, output);
        }

        let value: serde_json::Value = match call.parse_arguments() {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "function arguments are not valid JSON");
                return Turn::text(TurnKind::InvalidArguments, EXECUTE_COMMAND, INVALID_JSON_OUTPUT.to_string());
            }
        };
        let command = match serde_json::from_value::<ExecuteCommandArgs>(value) {
            Ok(args) => args.command,
            Err(e) => {
                warn!(error = %e, "function arguments carry no command");
                return Turn::text(TurnKind::MissingCommand, EXECUTE_COMMAND, NO_COMMAND_OUTPUT.to_string());
            }
        };

        let outcome = self.executor.run(&command).await;
        let output = outcome.output(self.executor.config().timeout);
        let record_id = self.document.record_command(&command, &output);
        info!(record_id, command = %command, error = outcome.is_error(), "command recorded");

        Turn {
            assistant_content: format!("Executed command: {}\nOutput:\n{}", command, output),
            kind: TurnKind::Command {
                command,
                record_id,
                outcome,
            },
            function: EXECUTE_COMMAND.to_string(),
            output,
        }
    }

    fn persist(&mut self, user_content: String, turn: &Turn) -> bool {
        self.document.push_entry(ConversationEntry::user(user_content));
        self.document
            .push_entry(ConversationEntry::assistant(turn.assistant_content.clone()));
        self.document.set_last_state(turn.function.clone(), turn.output.clone());

        match self.store.save(&self.document) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to save state, continuing in memory");
                false
            }
        }
    }

    fn publish(&mut self, turn: &Turn) {
        let message = match &turn.kind {
            TurnKind::Response => DisplayMessage::response(&turn.output),
            TurnKind::Command { outcome, .. } if !outcome.is_error() => {
                DisplayMessage::command_output(&turn.output)
            }
            _ => DisplayMessage::error(&turn.output),
        };
        self.channel.send_message(message);
    }
}
