//! Terminal renderer for a chat session
//!
//! Subscribes to the session store and prints whatever changed since the
//! last refresh: new assistant turns, the pending indicator and errors.

use nu_ansi_term::{Color, Style};
use ragchat_core::{Role, SessionState, Status, Turn};
use tokio::sync::watch;

/// Longest preview line in `/history`
const PREVIEW_CHARS: usize = 100;

pub struct Transcript {
    rx: watch::Receiver<SessionState>,
    /// Number of history entries already rendered
    shown: usize,
    status: Status,
}

impl Transcript {
    pub fn new(rx: watch::Receiver<SessionState>) -> Self {
        let (shown, status) = {
            let state = rx.borrow();
            (state.history.len(), state.status)
        };
        Self { rx, shown, status }
    }

    /// Wait until the session changes; false once the store is gone
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Print the changes since the previous refresh
    pub fn refresh(&mut self) {
        let state = self.rx.borrow_and_update().clone();
        print!("{}", self.render_changes(&state));
    }

    fn render_changes(&mut self, state: &SessionState) -> String {
        let mut out = String::new();

        // History only shrinks when the session is reset
        if state.history.len() < self.shown {
            self.shown = 0;
        }

        // User turns are already on screen as typed input
        for turn in state.history.iter().skip(self.shown) {
            if turn.role() == Role::Assistant {
                out.push_str(&render_turn(turn));
            }
        }
        self.shown = state.history.len();

        if state.status != self.status {
            match state.status {
                Status::Pending => {
                    out.push_str(&format!("{}\n", Style::new().dimmed().paint("⏳ Sending...")));
                }
                Status::Errored => {
                    if let Some(error) = &state.last_error {
                        out.push_str(&format!(
                            "\n{} {}\n\n",
                            Color::Red.bold().paint(format!("❌ {}:", error.kind)),
                            error.message
                        ));
                    }
                }
                Status::Idle => {}
            }
            self.status = state.status;
        }

        out
    }
}

/// Render one assistant reply with its RAG tag
pub fn render_turn(turn: &Turn) -> String {
    let mut header = Color::Green.bold().paint("🤖 Assistant").to_string();
    if turn.used_rag() {
        header.push(' ');
        header.push_str(&Color::Yellow.bold().paint("[RAG]").to_string());
    }
    let context_note = match turn.context() {
        Some(items) if !items.is_empty() => format!(
            "\n{}",
            Style::new()
                .dimmed()
                .paint(format!("({} retrieved items, /context to show)", items.len()))
        ),
        _ => String::new(),
    };
    format!("\n{}\n{}{}\n\n", header, turn.text(), context_note)
}

/// Render the whole history as one-line previews
pub fn render_history(state: &SessionState) -> String {
    let mut out = format!("\n📜 History ({} turns):\n{}\n", state.history.len(), "─".repeat(50));

    for (i, turn) in state.history.iter().enumerate() {
        let role = match turn.role() {
            Role::User => "👤 You",
            Role::Assistant if turn.used_rag() => "🤖 Assistant [RAG]",
            Role::Assistant => "🤖 Assistant",
        };
        out.push_str(&format!(
            "{}. {} ({}): {}\n",
            i + 1,
            role,
            turn.created_at().format("%H:%M:%S"),
            preview(turn.text())
        ));
    }

    out.push_str(&format!("{}\n", "─".repeat(50)));
    out
}

/// Pretty-print the retrieved context of an assistant turn
pub fn render_context(turn: &Turn) -> String {
    match turn.context() {
        Some(items) if !items.is_empty() => {
            serde_json::to_string_pretty(items).unwrap_or_else(|e| format!("<unprintable: {}>", e))
        }
        _ if turn.used_rag() => "(RAG was used but no context was returned)".to_string(),
        _ => "(no retrieved context for this reply)".to_string(),
    }
}

fn preview(text: &str) -> String {
    let flat = text.replace('\n', " ");
    match flat.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &flat[..idx]),
        None => flat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragchat_core::{Mode, SessionStore};
    use serde_json::json;

    #[test]
    fn test_refresh_renders_only_new_assistant_turns() {
        let store = SessionStore::new(Mode::Rag);
        let mut transcript = Transcript::new(store.subscribe());

        store.append_user_turn("What is X?");
        let pending = transcript.render_changes(&store.snapshot());
        assert!(pending.contains("Sending"));
        assert!(!pending.contains("What is X?"));

        store
            .append_assistant_turn("X is...", true, Some(vec![json!({"doc": "a"})]))
            .unwrap();
        let reply = transcript.render_changes(&store.snapshot());
        assert!(reply.contains("X is..."));
        assert!(reply.contains("[RAG]"));
        assert!(reply.contains("1 retrieved items"));

        assert!(transcript.render_changes(&store.snapshot()).is_empty());
    }

    #[test]
    fn test_refresh_renders_error_once() {
        let store = SessionStore::default();
        let mut transcript = Transcript::new(store.subscribe());

        store.append_user_turn("hi");
        transcript.render_changes(&store.snapshot());
        store
            .record_error(ragchat_core::SessionError {
                kind: ragchat_core::ErrorKind::Server,
                message: "Server error (500): boom".to_string(),
            })
            .unwrap();

        let out = transcript.render_changes(&store.snapshot());
        assert!(out.contains("server error"));
        assert!(out.contains("boom"));
        assert!(transcript.render_changes(&store.snapshot()).is_empty());
    }

    #[test]
    fn test_refresh_follows_reset_session() {
        let store = SessionStore::default();
        let mut transcript = Transcript::new(store.subscribe());
        store.append_user_turn("one");
        store.append_assistant_turn("first reply", false, None).unwrap();
        transcript.render_changes(&store.snapshot());

        store.reset();
        assert!(transcript.render_changes(&store.snapshot()).is_empty());
        store.append_user_turn("two");
        store.append_assistant_turn("second reply", false, None).unwrap();

        let out = transcript.render_changes(&store.snapshot());
        assert!(out.contains("second reply"));
        assert!(!out.contains("first reply"));
    }

    #[test]
    fn test_render_history() {
        let mut state = SessionState::default();
        state.history.push(Turn::user("line one\nline two"));
        state.history.push(Turn::assistant("answer", true, None));

        let out = render_history(&state);
        assert!(out.contains("History (2 turns)"));
        assert!(out.contains("line one line two"));
        assert!(out.contains("🤖 Assistant [RAG]"));
    }

    #[test]
    fn test_render_context() {
        let with_context = Turn::assistant("a", true, Some(vec![json!({"doc": "a"})]));
        assert!(render_context(&with_context).contains("\"doc\": \"a\""));

        let rag_without = Turn::assistant("a", true, None);
        assert!(render_context(&rag_without).contains("no context was returned"));

        let plain = Turn::assistant("a", false, None);
        assert!(render_context(&plain).contains("no retrieved context"));
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "é".repeat(150);
        let out = preview(&long);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), PREVIEW_CHARS + 3);
    }
}
