//! CLI (Command Line Interface) mode
//!
//! Provides an interactive REPL over a chat session, plus non-interactive
//! execute and file modes for one-shot questions.

use std::path::Path;

use nu_ansi_term::{Color, Style};
use ragchat_core::{ChatClient, Mode, Role, SessionState, Submitted};
use reedline::{
    ColumnarMenu, Completer, DefaultHinter, EditCommand, Emacs, KeyCode, KeyModifiers,
    Keybindings, MenuBuilder, Prompt, Reedline, ReedlineEvent, ReedlineMenu, Signal, Suggestion,
};
use tokio::sync::watch;
use tracing::info;

use crate::transcript::{self, Transcript};

/// Available commands for autocomplete display
const COMMANDS: &[(&str, &str)] = &[
    ("/help", "Show help"),
    ("/rag", "Answer with retrieval-augmented generation"),
    ("/plain", "Answer from the model alone"),
    ("/mode", "Show the current mode"),
    ("/history", "Show the conversation"),
    ("/context", "Show retrieved context of the last reply (/context <n> for turn n)"),
    ("/new", "Start a new conversation"),
    ("/exit", "Quit"),
    ("/quit", "Quit"),
];

/// Completes slash commands and the turn numbers `/context` accepts
pub struct CommandCompleter {
    session: watch::Receiver<SessionState>,
}

impl CommandCompleter {
    pub fn new(session: watch::Receiver<SessionState>) -> Self {
        Self { session }
    }

    fn commands(&self, typed: &str, pos: usize) -> Vec<Suggestion> {
        COMMANDS
            .iter()
            .filter(|(cmd, _)| cmd.starts_with(typed))
            .map(|(cmd, desc)| suggestion(cmd.to_string(), desc.to_string(), 0, pos))
            .collect()
    }

    /// Numbers of assistant turns, newest first
    fn turn_numbers(&self, prefix: &str, start: usize, pos: usize) -> Vec<Suggestion> {
        let state = self.session.borrow();
        state
            .history
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, turn)| turn.role() == Role::Assistant)
            .map(|(i, turn)| (i + 1, turn))
            .filter(|(n, _)| n.to_string().starts_with(prefix))
            .map(|(n, turn)| {
                let items = turn.context().map_or(0, |items| items.len());
                let desc = if turn.used_rag() {
                    format!("[RAG] {} retrieved items", items)
                } else {
                    "plain reply".to_string()
                };
                suggestion(n.to_string(), desc, start, pos)
            })
            .collect()
    }
}

fn suggestion(value: String, description: String, start: usize, end: usize) -> Suggestion {
    Suggestion {
        value,
        description: Some(description),
        extra: None,
        span: reedline::Span::new(start, end),
        append_whitespace: true,
        style: None,
    }
}

impl Completer for CommandCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        let typed = line.get(..pos).unwrap_or(line);
        if !typed.starts_with('/') {
            return Vec::new();
        }

        match typed.split_once(char::is_whitespace) {
            None => self.commands(typed, pos),
            Some((command, rest)) if command.eq_ignore_ascii_case("/context") => {
                let argument = rest.trim_start();
                if argument.contains(char::is_whitespace) {
                    return Vec::new();
                }
                self.turn_numbers(argument, pos - argument.len(), pos)
            }
            Some(_) => Vec::new(),
        }
    }
}

/// Prompt showing the current mode
struct ModePrompt {
    mode: Mode,
}

impl Prompt for ModePrompt {
    fn render_prompt_left(&self) -> std::borrow::Cow<'_, str> {
        let tag = match self.mode {
            Mode::PlainOnly => Color::Cyan.bold().paint("[plain]"),
            Mode::Rag => Color::Yellow.bold().paint("[rag]"),
        };
        std::borrow::Cow::Owned(format!("{} {}", tag, Color::Cyan.bold().paint("> ")))
    }

    fn render_prompt_right(&self) -> std::borrow::Cow<'_, str> {
        std::borrow::Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _prompt_mode: reedline::PromptEditMode) -> std::borrow::Cow<'_, str> {
        std::borrow::Cow::Borrowed("")
    }

    fn render_prompt_multiline_indicator(&self) -> std::borrow::Cow<'_, str> {
        std::borrow::Cow::Borrowed("")
    }

    fn render_prompt_history_search_indicator(
        &self,
        _history_search: reedline::PromptHistorySearch,
    ) -> std::borrow::Cow<'_, str> {
        std::borrow::Cow::Borrowed("")
    }
}

/// What the REPL should do after a slash command
#[derive(Debug, PartialEq)]
enum CommandAction {
    /// Not a command; send the input as a query
    Query,
    /// Command handled, read the next line
    Handled,
    /// Start a fresh session
    NewSession,
    Exit,
}

/// Run CLI interactive mode
pub async fn run_cli(client: ChatClient) -> anyhow::Result<()> {
    info!("Starting interactive mode (mode={})", client.snapshot().mode);

    print_welcome();

    let menu = Box::new(
        ColumnarMenu::default()
            .with_name("command_menu")
            .with_columns(1)
            .with_column_width(Some(60))
            .with_only_buffer_difference(false),
    );

    let hinter = DefaultHinter::default().with_style(Style::new().dimmed());

    let mut line_editor = Reedline::create()
        .with_completer(Box::new(CommandCompleter::new(client.store().subscribe())))
        .with_menu(ReedlineMenu::EngineCompleter(menu))
        .with_hinter(Box::new(hinter))
        .with_edit_mode(Box::new(Emacs::new(keybindings())));

    let mut transcript = Transcript::new(client.store().subscribe());

    loop {
        let prompt = ModePrompt {
            mode: client.store().mode(),
        };

        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(line)) => {
                let input = line.trim();

                if input.is_empty() {
                    continue;
                }

                match handle_command(input, &client) {
                    CommandAction::Query => {}
                    CommandAction::Handled => continue,
                    CommandAction::NewSession => {
                        client.reset();
                        transcript.refresh();
                        println!("\n✅ Started a new conversation.\n");
                        continue;
                    }
                    CommandAction::Exit => {
                        println!("\n👋 Bye!\n");
                        break;
                    }
                }

                let outcome = submit_with_transcript(&client, &mut transcript, input).await;

                // Keep the failed query in the buffer so it can be resent
                if !matches!(outcome, Ok(submitted) if submitted.clears_input()) {
                    line_editor.run_edit_commands(&[EditCommand::InsertString(input.to_string())]);
                }
            }
            Ok(Signal::CtrlC) => {
                println!("^C");
                continue;
            }
            Ok(Signal::CtrlD) => {
                println!("\n👋 Bye!\n");
                break;
            }
            Err(err) => {
                eprintln!("\n❌ Error: {}\n", err);
                break;
            }
        }
    }

    Ok(())
}

/// Submit a query and render session changes while it is in flight
async fn submit_with_transcript(
    client: &ChatClient,
    transcript: &mut Transcript,
    input: &str,
) -> ragchat_core::Result<Submitted> {
    let submit = client.submit(input);
    tokio::pin!(submit);

    let outcome = loop {
        tokio::select! {
            outcome = &mut submit => break outcome,
            true = transcript.changed() => transcript.refresh(),
        }
    };

    transcript.refresh();
    outcome
}

/// Emacs bindings; Tab and '/' open the completion menu
fn keybindings() -> Keybindings {
    let bindings = [
        (KeyModifiers::NONE, KeyCode::Tab, ReedlineEvent::Edit(vec![EditCommand::Complete])),
        (
            KeyModifiers::NONE,
            KeyCode::Char('/'),
            ReedlineEvent::Edit(vec![EditCommand::InsertChar('/'), EditCommand::Complete]),
        ),
        (KeyModifiers::NONE, KeyCode::Enter, ReedlineEvent::Submit),
        (KeyModifiers::NONE, KeyCode::Esc, ReedlineEvent::Esc),
        (KeyModifiers::NONE, KeyCode::Up, ReedlineEvent::Up),
        (KeyModifiers::NONE, KeyCode::Down, ReedlineEvent::Down),
        (KeyModifiers::CONTROL, KeyCode::Char('c'), ReedlineEvent::CtrlC),
        (KeyModifiers::CONTROL, KeyCode::Char('d'), ReedlineEvent::CtrlD),
        (KeyModifiers::CONTROL, KeyCode::Char('l'), ReedlineEvent::ClearScreen),
    ];

    let mut keybindings = Keybindings::new();
    for (modifiers, code, event) in bindings {
        keybindings.add_binding(modifiers, code, event);
    }
    keybindings
}

/// Handle slash commands
fn handle_command(input: &str, client: &ChatClient) -> CommandAction {
    let mut parts = input.split_whitespace();
    let command = parts.next().unwrap_or_default().to_lowercase();
    let argument = parts.next();

    match command.as_str() {
        "/exit" | "/quit" | "/q" => CommandAction::Exit,
        "/rag" => {
            client.set_mode(Mode::Rag);
            println!("\n✅ RAG mode: replies use retrieved context.\n");
            CommandAction::Handled
        }
        "/plain" => {
            client.set_mode(Mode::PlainOnly);
            println!("\n✅ Plain mode: replies come from the model alone.\n");
            CommandAction::Handled
        }
        "/mode" => {
            println!("\nCurrent mode: {}\n", client.snapshot().mode);
            CommandAction::Handled
        }
        "/history" => {
            println!("{}", transcript::render_history(&client.snapshot()));
            CommandAction::Handled
        }
        "/context" => {
            println!("\n{}\n", context_report(&client.snapshot(), argument));
            CommandAction::Handled
        }
        "/new" | "/clear" => CommandAction::NewSession,
        "/help" | "/?" => {
            print_help();
            CommandAction::Handled
        }
        _ if command.starts_with('/') => {
            eprintln!("\n❓ Unknown command: {}. Type /help for the list of commands.\n", input);
            CommandAction::Handled
        }
        _ => CommandAction::Query,
    }
}

/// Describe the retrieved context of the last reply, or of history entry `n`
fn context_report(state: &SessionState, argument: Option<&str>) -> String {
    let turn = match argument {
        None => match state.last_assistant_turn() {
            Some(turn) => turn,
            None => return "No replies yet.".to_string(),
        },
        Some(raw) => {
            let Ok(n) = raw.parse::<usize>() else {
                return format!("Not a turn number: {}", raw);
            };
            match n.checked_sub(1).and_then(|i| state.history.get(i)) {
                Some(turn) if turn.role() == Role::Assistant => turn,
                Some(_) => return format!("Turn {} is a user message.", n),
                None => return format!("No turn {} (history has {}).", n, state.history.len()),
            }
        }
    };

    transcript::render_context(turn)
}

/// Print welcome message
fn print_welcome() {
    println!();
    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║          🤖 ragchat - interactive mode                     ║");
    println!("╠════════════════════════════════════════════════════════════╣");
    println!("║  Type a question and press Enter                           ║");
    println!("║  /rag and /plain switch how replies are generated          ║");
    println!("║  Commands: /help, /history, /context, /new, /exit          ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();
}

/// Print help message
fn print_help() {
    println!();
    println!("📖 Commands:");
    for (cmd, desc) in COMMANDS {
        println!("  {} - {}", cmd, desc);
    }
    println!();
    println!("💡 Type / to see command suggestions");
    println!("💡 A failed question stays in the input line so you can resend it");
    println!();
}

// ============================================================================
// Non-interactive mode
// ============================================================================

/// Send one query, print the reply and exit
///
/// # Example
/// ```bash
/// ragchat --execute "What is X?"
/// ragchat --rag -e "What is X?" --show-context
/// ```
pub async fn run_execute(client: ChatClient, query: &str, show_context: bool) -> anyhow::Result<()> {
    let query = query.trim();
    if query.is_empty() {
        anyhow::bail!("query is empty");
    }

    info!("Executing one query (mode={})", client.snapshot().mode);

    client.submit(query).await?;

    let state = client.snapshot();
    let reply = state
        .last_assistant_turn()
        .ok_or_else(|| anyhow::anyhow!("no reply recorded"))?;

    println!("{}", reply.text());
    if show_context && reply.context().is_some() {
        println!();
        println!("{}", transcript::render_context(reply));
    }

    Ok(())
}

/// Send the contents of a file as one query
///
/// # Example
/// ```bash
/// ragchat --file question.txt
/// ```
pub async fn run_file(client: ChatClient, path: &Path, show_context: bool) -> anyhow::Result<()> {
    let query = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;

    if query.trim().is_empty() {
        anyhow::bail!("file is empty: {}", path.display());
    }

    info!("Executing query from file: {}", path.display());

    run_execute(client, &query, show_context).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragchat_core::{SessionStore, Turn};
    use serde_json::json;

    fn client() -> ChatClient {
        ChatClient::new(&ragchat_core::Config::default()).unwrap()
    }

    fn values(completer: &mut CommandCompleter, line: &str) -> Vec<String> {
        completer
            .complete(line, line.len())
            .into_iter()
            .map(|s| s.value)
            .collect()
    }

    #[test]
    fn test_completer_filters_by_prefix() {
        let store = SessionStore::default();
        let mut completer = CommandCompleter::new(store.subscribe());

        assert_eq!(values(&mut completer, "/c"), vec!["/context"]);
        assert_eq!(values(&mut completer, "/").len(), COMMANDS.len());
        assert!(values(&mut completer, "hello").is_empty());
    }

    #[test]
    fn test_completer_offers_assistant_turns_for_context() {
        let store = SessionStore::default();
        let mut completer = CommandCompleter::new(store.subscribe());
        assert!(values(&mut completer, "/context ").is_empty());

        for i in 0..6 {
            store.append_user_turn(&format!("q{}", i));
            store
                .append_assistant_turn(format!("a{}", i), i == 0, Some(vec![json!({"doc": i})]))
                .unwrap();
        }

        assert_eq!(values(&mut completer, "/context "), vec![
            "12", "10", "8", "6", "4", "2"
        ]);
        assert_eq!(values(&mut completer, "/context 1"), vec!["12", "10"]);
        assert!(values(&mut completer, "/history ").is_empty());
        assert!(values(&mut completer, "/context 2 x").is_empty());

        let suggestions = completer.complete("/context 2", 10);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].span, reedline::Span::new(9, 10));
        assert_eq!(
            suggestions[0].description.as_deref(),
            Some("[RAG] 1 retrieved items")
        );
    }

    #[test]
    fn test_completer_sees_reset_session() {
        let store = SessionStore::default();
        let mut completer = CommandCompleter::new(store.subscribe());
        store.append_user_turn("q");
        store.append_assistant_turn("a", false, None).unwrap();
        assert_eq!(values(&mut completer, "/context "), vec!["2"]);

        store.reset();
        assert!(values(&mut completer, "/context ").is_empty());
    }

    #[test]
    fn test_keybindings() {
        let keybindings = keybindings();
        assert_eq!(
            keybindings.find_binding(KeyModifiers::NONE, KeyCode::Char('/')),
            Some(ReedlineEvent::Edit(vec![
                EditCommand::InsertChar('/'),
                EditCommand::Complete
            ]))
        );
        assert_eq!(
            keybindings.find_binding(KeyModifiers::CONTROL, KeyCode::Char('d')),
            Some(ReedlineEvent::CtrlD)
        );
    }

    #[test]
    fn test_mode_commands() {
        let client = client();

        assert_eq!(handle_command("/rag", &client), CommandAction::Handled);
        assert_eq!(client.snapshot().mode, Mode::Rag);

        assert_eq!(handle_command("/PLAIN", &client), CommandAction::Handled);
        assert_eq!(client.snapshot().mode, Mode::PlainOnly);
    }

    #[test]
    fn test_command_actions() {
        let client = client();
        assert_eq!(handle_command("What is X?", &client), CommandAction::Query);
        assert_eq!(handle_command("/new", &client), CommandAction::NewSession);
        assert_eq!(handle_command("/quit", &client), CommandAction::Exit);
        assert_eq!(handle_command("/nope", &client), CommandAction::Handled);
    }

    #[test]
    fn test_context_report() {
        let mut state = SessionState::default();
        assert_eq!(context_report(&state, None), "No replies yet.");

        state.history.push(Turn::user("What is X?"));
        state
            .history
            .push(Turn::assistant("X is...", true, Some(vec![json!({"doc": "a"})])));

        assert!(context_report(&state, None).contains("\"doc\""));
        assert!(context_report(&state, Some("2")).contains("\"doc\""));
        assert_eq!(context_report(&state, Some("1")), "Turn 1 is a user message.");
        assert_eq!(context_report(&state, Some("9")), "No turn 9 (history has 2).");
        assert_eq!(context_report(&state, Some("x")), "Not a turn number: x");
    }
}
