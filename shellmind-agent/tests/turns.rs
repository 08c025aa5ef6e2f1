//! End-to-end turns against a scripted provider and a temporary state file.

use shellmind_agent::{
    Agent, AgentConfig, DisplayMessage, MessageKind, TurnKind, INVALID_JSON_OUTPUT,
    NO_COMMAND_OUTPUT,
};
use shellmind_core::{
    CommandOutcome, ProviderError, Role, ScriptedProvider, StateStore, START_SENTINEL,
};
use tempfile::TempDir;

const PROMPT: &str = "You are an operator";

fn store(dir: &TempDir) -> StateStore {
    StateStore::new(dir.path().join("bot_memory.json"), PROMPT)
}

fn agent(dir: &TempDir, provider: ScriptedProvider) -> Agent<ScriptedProvider> {
    Agent::new(provider, store(dir), AgentConfig::new(PROMPT))
}

fn history(agent: &Agent<ScriptedProvider>) -> Vec<(Role, String)> {
    agent
        .document()
        .conversation_history
        .iter()
        .map(|e| (e.role, e.content.clone()))
        .collect()
}

#[tokio::test]
async fn free_text_turn_is_persisted() {
    let dir = TempDir::new().unwrap();
    let mut agent = agent(&dir, ScriptedProvider::new().with_text("hello"));

    let outcome = agent.step().await;
    assert_eq!(outcome.kind, TurnKind::Response);
    assert_eq!(outcome.output, "hello");
    assert!(outcome.persisted);

    assert_eq!(
        history(&agent),
        vec![
            (Role::System, PROMPT.to_string()),
            (Role::User, START_SENTINEL.to_string()),
            (Role::Assistant, "hello".to_string()),
        ]
    );
    assert_eq!(agent.document().last_state.last_output, "hello");
    assert_eq!(agent.document().last_state.last_function, "");

    // What is on disk matches what is in memory
    assert_eq!(&store(&dir).load(), agent.document());
    assert_eq!(agent.receive_messages(), vec![DisplayMessage::response("hello")]);
}

#[cfg(unix)]
#[tokio::test]
async fn echo_command_is_executed_and_logged() {
    let dir = TempDir::new().unwrap();
    let provider = ScriptedProvider::new().with_tool_call("execute_command", r#"{"command": "echo hi"}"#);
    let mut agent = agent(&dir, provider);

    let outcome = agent.step().await;
    assert_eq!(outcome.output, "hi\n");
    match &outcome.kind {
        TurnKind::Command { command, record_id, outcome } => {
            assert_eq!(command, "echo hi");
            assert_eq!(*record_id, 1);
            assert!(matches!(outcome, CommandOutcome::Completed { exit_code: Some(0), .. }));
        }
        other => panic!("unexpected turn kind: {:?}", other),
    }

    let doc = store(&dir).load();
    assert_eq!(doc.command_results.len(), 1);
    assert_eq!(doc.command_results[0].command, "echo hi");
    assert_eq!(doc.command_results[0].output, "hi\n");
    assert_eq!(doc.function_calls.len(), 1);
    assert_eq!(doc.last_state.last_output, "hi\n");
    assert_eq!(doc.last_state.last_function, "execute_command");

    let last = doc.conversation_history.last().unwrap();
    assert_eq!(last.role, Role::Assistant);
    assert_eq!(last.content, "Executed command: echo hi\nOutput:\nhi\n");

    let messages = agent.receive_messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].kind, MessageKind::CommandOutput);
}

#[tokio::test]
async fn invalid_json_executes_nothing() {
    let dir = TempDir::new().unwrap();
    let provider = ScriptedProvider::new().with_tool_call("execute_command", r#"{"command": "#);
    let mut agent = agent(&dir, provider);

    let outcome = agent.step().await;
    assert_eq!(outcome.kind, TurnKind::InvalidArguments);
    assert_eq!(outcome.output, INVALID_JSON_OUTPUT);

    let doc = agent.document();
    assert!(doc.command_results.is_empty());
    assert_eq!(doc.function_calls.len(), 1);
    assert_eq!(doc.function_calls[0].arguments, r#"{"command": "#);
    assert_eq!(doc.last_state.last_output, INVALID_JSON_OUTPUT);
    assert_eq!(agent.receive_messages()[0].kind, MessageKind::Error);
}

#[tokio::test]
async fn missing_or_non_string_command_is_reported() {
    let dir = TempDir::new().unwrap();
    let provider = ScriptedProvider::new()
        .with_tool_call("execute_command", r#"{"cmd": "ls"}"#)
        .with_tool_call("execute_command", r#"{"command": 42}"#);
    let mut agent = agent(&dir, provider);

    for _ in 0..2 {
        let outcome = agent.step().await;
        assert_eq!(outcome.kind, TurnKind::MissingCommand);
        assert_eq!(outcome.output, NO_COMMAND_OUTPUT);
    }
    assert!(agent.document().command_results.is_empty());
    assert_eq!(agent.document().function_calls.len(), 2);
}

#[tokio::test]
async fn provider_error_becomes_a_turn_and_loop_continues() {
    let dir = TempDir::new().unwrap();
    let provider = ScriptedProvider::new()
        .with_error(ProviderError::Network("connection refused".into()))
        .with_text("recovered");
    let mut agent = agent(&dir, provider);

    let failed = agent.step().await;
    assert_eq!(failed.kind, TurnKind::ProviderFailed);
    assert_eq!(failed.output, "Error: Network error: connection refused");
    assert!(failed.persisted);

    let doc = store(&dir).load();
    assert_eq!(doc.conversation_history.len(), 3);
    assert_eq!(doc.conversation_history[2].content, failed.output);

    let next = agent.step().await;
    assert_eq!(next.output, "recovered");

    // The failure text was fed back as the next user message
    let requests = agent.provider().requests();
    assert_eq!(requests[1].messages.last().unwrap().text(), failed.output);
    assert_eq!(agent.turns(), 2);
}

#[tokio::test]
async fn request_window_is_bounded() {
    let dir = TempDir::new().unwrap();
    let mut provider = ScriptedProvider::new();
    for i in 0..8 {
        provider = provider.with_text(format!("reply {}", i));
    }
    let config = AgentConfig::new(PROMPT).with_history_window(4);
    let mut agent = Agent::new(provider, store(&dir), config);

    for _ in 0..8 {
        agent.step().await;
    }

    for request in agent.provider().requests() {
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[0].text(), PROMPT);
        // system + at most 4 history entries + the new user message
        assert!(request.messages.len() <= 6);
    }
    let last = agent.provider().requests().pop().unwrap();
    assert_eq!(last.messages.len(), 6);
    assert_eq!(last.messages[5].text(), "reply 6");
}

#[cfg(unix)]
#[tokio::test]
async fn repeated_commands_get_distinct_records() {
    let dir = TempDir::new().unwrap();
    let provider = ScriptedProvider::new()
        .with_tool_call("execute_command", r#"{"command": "echo again"}"#)
        .with_tool_call("execute_command", r#"{"command": "echo again"}"#);
    let mut agent = agent(&dir, provider);

    agent.step().await;
    agent.step().await;

    let ids: Vec<u64> = store(&dir).load().command_results.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn denylist_rejects_without_running() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("marker");
    let args = serde_json::json!({ "command": format!("touch {}; echo done", marker.display()) });
    let provider = ScriptedProvider::new().with_tool_call("execute_command", args.to_string());
    let config = AgentConfig::new(PROMPT).with_reject_metacharacters(true);
    let mut agent = Agent::new(provider, store(&dir), config);

    let outcome = agent.step().await;
    assert!(matches!(
        outcome.kind,
        TurnKind::Command { outcome: CommandOutcome::Rejected, .. }
    ));
    assert_eq!(outcome.output, "Error: Command contains disallowed shell metacharacters");
    assert!(!marker.exists());
    assert_eq!(agent.document().command_results.len(), 1);
}

#[tokio::test]
async fn history_survives_restart() {
    let dir = TempDir::new().unwrap();
    {
        let mut first = agent(&dir, ScriptedProvider::new().with_text("one"));
        first.step().await;
    }

    let mut second = agent(&dir, ScriptedProvider::new().with_text("two"));
    assert_eq!(second.next_user_content(), "one");
    second.step().await;

    let requests = second.provider().requests();
    let texts: Vec<&str> = requests[0].messages.iter().map(|m| m.text()).collect();
    assert_eq!(texts, vec![PROMPT, START_SENTINEL, "one", "one"]);
    assert_eq!(second.document().conversation_history.len(), 5);
}
