//! # shellmind CLI
//!
//! Command-line front end for the shellmind agent.
//!
//! Usage:
//!   shellmind                      run the loop, one turn per Enter
//!   shellmind run --delay 5        run a turn every 5 seconds
//!   shellmind history --limit 20   show the tail of the conversation
//!   shellmind commands             show the command log
//!   shellmind reset                start over with a fresh state file
//!
//! The API key is read from `--api-key` or `OPENAI_API_KEY` (a `.env` file in
//! the working directory is honored).

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use shellmind_agent::{
    Agent, AgentConfig, DisplayMessage, MessageKind, TurnOutcome, DEFAULT_HISTORY_WINDOW,
    MAX_HISTORY_WINDOW,
};
use shellmind_core::provider::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
use shellmind_core::{
    LlmProvider, OpenAIProvider, ProviderConfig, Role, StateStore, SystemPrompt,
    DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_STATE_FILE,
};
use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "shellmind")]
#[command(author, version, about = "shellmind - an autonomous shell operator")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// JSON file holding the agent's memory
    #[arg(long, global = true, default_value = DEFAULT_STATE_FILE)]
    state_file: PathBuf,

    /// File with the system prompt (built-in prompt when omitted)
    #[arg(long, global = true)]
    prompt_file: Option<PathBuf>,

    /// Model identifier
    #[arg(long, global = true, default_value = DEFAULT_MODEL)]
    model: String,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, global = true, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// API key
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Seconds to wait for one completion
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS)]
    request_timeout: u64,

    /// Log at debug level (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interaction loop (default)
    Run(RunArgs),
    /// Show the most recent conversation entries
    History {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Show the command log
    Commands {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Overwrite the state file with a fresh document
    Reset,
}

#[derive(Args, Clone)]
struct RunArgs {
    /// History entries sent with each request (1-50)
    #[arg(long, default_value_t = DEFAULT_HISTORY_WINDOW, value_parser = parse_window)]
    history_window: usize,

    /// Seconds before a running command is killed (at least 1)
    #[arg(
        long,
        default_value_t = DEFAULT_COMMAND_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    command_timeout: u64,

    /// Run a turn every N seconds instead of waiting for Enter
    #[arg(long)]
    delay: Option<u64>,

    /// Stop after this many turns
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Refuse commands containing ; | & or a backtick (not a sandbox)
    #[arg(long)]
    reject_metacharacters: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            history_window: DEFAULT_HISTORY_WINDOW,
            command_timeout: DEFAULT_COMMAND_TIMEOUT_SECS,
            delay: None,
            max_iterations: None,
            reject_metacharacters: false,
            no_color: false,
        }
    }
}

fn parse_window(s: &str) -> Result<usize, String> {
    let window: usize = s.parse().map_err(|e| format!("{}", e))?;
    if (1..=MAX_HISTORY_WINDOW).contains(&window) {
        Ok(window)
    } else {
        Err(format!("must be between 1 and {}", MAX_HISTORY_WINDOW))
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_prompt(cli: &Cli) -> SystemPrompt {
    match &cli.prompt_file {
        Some(path) => match SystemPrompt::load(path) {
            Ok(prompt) => {
                info!(path = %path.display(), "loaded system prompt");
                prompt
            }
            Err(e) => {
                warn!(error = %e, "falling back to built-in prompt");
                eprintln!("{} {}", "Error loading system prompt:".red(), e);
                SystemPrompt::default()
            }
        },
        None => SystemPrompt::default(),
    }
}

fn print_banner(prompt: &SystemPrompt) {
    println!("\n{}\n", "=== shellmind initialized ===".bold());
    println!("System Prompt:");
    println!("=============");
    println!("{}", prompt);
    println!("=============\n");
}

fn print_message(message: &DisplayMessage) {
    let header = match message.kind {
        MessageKind::Response => "Bot Response:".green().bold(),
        MessageKind::CommandOutput => "Command Output:".cyan().bold(),
        MessageKind::Error => "Error:".red().bold(),
    };
    println!("{}", header);
    println!("============");
    println!("{}", message.text.trim_end());
    println!("============");
}

fn print_history(store: &StateStore, limit: usize) {
    let doc = store.load();
    let history = &doc.conversation_history;
    let start = history.len().saturating_sub(limit);
    for entry in &history[start..] {
        let role = match entry.role {
            Role::System => entry.role.as_str().magenta(),
            Role::User => entry.role.as_str().blue(),
            _ => entry.role.as_str().green(),
        };
        let when = entry
            .timestamp
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        println!("{} {}", role.bold(), when.dimmed());
        println!("{}\n", entry.content);
    }
}

fn print_commands(store: &StateStore, limit: usize, json: bool) {
    let doc = store.load();
    if json {
        match serde_json::to_string_pretty(doc.recent_commands(limit)) {
            Ok(out) => println!("{}", out),
            Err(e) => eprintln!("{} {}", "error:".red().bold(), e),
        }
        return;
    }
    if doc.command_results.is_empty() {
        println!("No commands recorded.");
        return;
    }
    for record in doc.recent_commands(limit) {
        println!(
            "{} {} {}",
            format!("#{}", record.id).yellow(),
            record.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
            record.command.bold()
        );
        println!("{}\n", record.output.trim_end());
    }
}

/// Stdin lines, read on a plain thread that is never joined so Ctrl-C can
/// exit while a read is pending.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(1);
    let spawned = std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to read trigger");
                        break;
                    }
                }
            }
        });
    if let Err(e) = spawned {
        warn!(error = %e, "cannot start stdin reader");
    }
    rx
}

/// Wait for the next turn. Returns false when input is exhausted.
async fn wait_for_trigger(
    input: &mut mpsc::Receiver<String>,
    delay: Option<u64>,
    first: bool,
) -> bool {
    match delay {
        Some(_) if first => true,
        Some(secs) => {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            true
        }
        None => {
            println!("\nPress Enter to continue (Ctrl+C to exit): ");
            input.recv().await.is_some()
        }
    }
}

async fn run_loop<P: LlmProvider>(agent: &mut Agent<P>, args: &RunArgs) {
    // delay mode never reads stdin
    let mut input = match args.delay {
        None => spawn_stdin_reader(),
        Some(_) => mpsc::channel(1).1,
    };
    let mut last_output: Option<String> = None;

    loop {
        if let Some(max) = args.max_iterations {
            if agent.turns() >= max {
                info!(max, "iteration limit reached");
                break;
            }
        }

        let first = agent.turns() == 0;
        let proceed = tokio::select! {
            _ = tokio::signal::ctrl_c() => false,
            proceed = wait_for_trigger(&mut input, args.delay, first) => proceed,
        };
        if !proceed {
            break;
        }

        if let Some(previous) = &last_output {
            println!("\nPrevious Output:\n{}\n", previous.trim_end());
        }
        println!("Processing...\n");

        let outcome: Option<TurnOutcome> = tokio::select! {
            _ = tokio::signal::ctrl_c() => None,
            outcome = agent.step() => Some(outcome),
        };
        let Some(outcome) = outcome else {
            debug!("turn cancelled");
            break;
        };

        for message in agent.receive_messages() {
            print_message(&message);
        }
        if !outcome.persisted {
            eprintln!("{}", "warning: state could not be saved this turn".yellow());
        }
        last_output = Some(outcome.output);
    }

    println!("\nExiting bot system...");
}

async fn run(cli: &Cli, args: &RunArgs) -> ExitCode {
    if args.no_color {
        colored::control::set_override(false);
    }

    let Some(api_key) = cli.api_key.clone().filter(|key| !key.trim().is_empty()) else {
        let err = shellmind_core::Error::credential_missing("OPENAI_API_KEY");
        eprintln!("{} {}", "error:".red().bold(), err.message());
        return ExitCode::FAILURE;
    };

    let prompt = load_prompt(cli);
    print_banner(&prompt);

    let provider_config = ProviderConfig::openai(api_key)
        .with_base_url(&cli.base_url)
        .with_model(&cli.model)
        .with_timeout(cli.request_timeout);
    let provider = match OpenAIProvider::new(provider_config) {
        Ok(provider) => provider,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    let config = AgentConfig::new(prompt.as_str())
        .with_model(&cli.model)
        .with_history_window(args.history_window)
        .with_command_timeout(Duration::from_secs(args.command_timeout))
        .with_reject_metacharacters(args.reject_metacharacters);
    let store = StateStore::new(&cli.state_file, prompt.as_str());
    let mut agent = Agent::new(provider, store, config);

    run_loop(&mut agent, args).await;

    let usage = agent.usage();
    println!(
        "{} turns, {} calls, {} tokens ({} prompt, {} completion)",
        agent.turns(),
        usage.total_calls,
        usage.total_tokens(),
        usage.total_prompt_tokens,
        usage.total_completion_tokens
    );
    ExitCode::SUCCESS
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        None => run(&cli, &RunArgs::default()).await,
        Some(Commands::Run(args)) => run(&cli, args).await,
        Some(Commands::History { limit }) => {
            let prompt = load_prompt(&cli);
            print_history(&StateStore::new(&cli.state_file, prompt.as_str()), *limit);
            ExitCode::SUCCESS
        }
        Some(Commands::Commands { limit, json }) => {
            let prompt = load_prompt(&cli);
            print_commands(&StateStore::new(&cli.state_file, prompt.as_str()), *limit, *json);
            ExitCode::SUCCESS
        }
        Some(Commands::Reset) => {
            let prompt = load_prompt(&cli);
            let store = StateStore::new(&cli.state_file, prompt.as_str());
            match store.reset() {
                Ok(_) => {
                    println!("Reset {}", store.path().display());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("{} {}", "error:".red().bold(), e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_defaults_and_flags() {
        let cli = Cli::try_parse_from([
            "shellmind",
            "run",
            "--history-window",
            "5",
            "--delay",
            "2",
            "--reject-metacharacters",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Run(args)) => {
                assert_eq!(args.history_window, 5);
                assert_eq!(args.delay, Some(2));
                assert_eq!(args.command_timeout, DEFAULT_COMMAND_TIMEOUT_SECS);
                assert!(args.reject_metacharacters);
            }
            _ => panic!("expected run"),
        }
        assert_eq!(cli.state_file, PathBuf::from(DEFAULT_STATE_FILE));
        assert_eq!(cli.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_history_window_range_enforced() {
        assert!(Cli::try_parse_from(["shellmind", "run", "--history-window", "0"]).is_err());
        assert!(Cli::try_parse_from(["shellmind", "run", "--history-window", "51"]).is_err());
        assert_eq!(parse_window("50"), Ok(50));
    }

    #[test]
    fn test_zero_command_timeout_rejected() {
        assert!(Cli::try_parse_from(["shellmind", "run", "--command-timeout", "0"]).is_err());
        let cli = Cli::try_parse_from(["shellmind", "run", "--command-timeout", "1"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Run(RunArgs { command_timeout: 1, .. }))
        ));
    }

    #[tokio::test]
    async fn test_keypress_trigger_follows_input_lines() {
        let (tx, mut rx) = mpsc::channel(1);
        tx.send(String::new()).await.unwrap();
        assert!(wait_for_trigger(&mut rx, None, true).await);

        tx.send("anything".to_string()).await.unwrap();
        assert!(wait_for_trigger(&mut rx, None, false).await);

        drop(tx);
        assert!(!wait_for_trigger(&mut rx, None, false).await);
    }

    #[tokio::test]
    async fn test_delay_trigger_ignores_input() {
        let (tx, mut rx) = mpsc::channel::<String>(1);
        drop(tx);
        assert!(wait_for_trigger(&mut rx, Some(0), true).await);
        assert!(wait_for_trigger(&mut rx, Some(0), false).await);
    }

    #[tokio::test]
    async fn test_missing_or_blank_api_key_fails() {
        let mut cli = Cli::try_parse_from(["shellmind"]).unwrap();
        cli.api_key = None;
        let code = run(&cli, &RunArgs::default()).await;
        assert_eq!(format!("{:?}", code), format!("{:?}", ExitCode::FAILURE));

        cli.api_key = Some("  \t ".to_string());
        let code = run(&cli, &RunArgs::default()).await;
        assert_eq!(format!("{:?}", code), format!("{:?}", ExitCode::FAILURE));
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "shellmind",
            "history",
            "--limit",
            "3",
            "--state-file",
            "/tmp/state.json",
        ])
        .unwrap();
        assert!(matches!(cli.command, Some(Commands::History { limit: 3 })));
        assert_eq!(cli.state_file, PathBuf::from("/tmp/state.json"));

        let cli = Cli::try_parse_from(["shellmind", "commands", "--json"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Commands { limit: 20, json: true })));
    }
}
