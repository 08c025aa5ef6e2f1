//! # shellmind agent
//!
//! The agent runs the model <-> shell loop, one turn per trigger:
//! 1. Assemble the request from the system prompt, recent history and the
//!    last output
//! 2. Ask the model, offering the single `execute_command` capability
//! 3. Run the command it nominates (or keep its text reply)
//! 4. Persist the turn and publish it for display
//!
//! Every failure inside a turn becomes that turn's output; the loop itself
//! never stops on an error.

mod agent;
mod channel;

pub use agent::{
    Agent, AgentConfig, TurnKind, TurnOutcome, DEFAULT_HISTORY_WINDOW, INVALID_JSON_OUTPUT,
    MAX_HISTORY_WINDOW, NO_COMMAND_OUTPUT,
};
pub use channel::{DisplayMessage, MessageChannel, MessageKind};
