//! Session types

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Generation mode used for the next submitted query
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Parametric-only generation
    #[default]
    #[serde(rename = "plain", alias = "plain_only")]
    PlainOnly,
    /// Retrieval-augmented generation
    Rag,
}

impl Mode {
    /// Whether requests in this mode ask the backend for retrieval
    pub fn uses_rag(self) -> bool {
        matches!(self, Self::Rag)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlainOnly => f.write_str("plain"),
            Self::Rag => f.write_str("rag"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "plain" | "plain_only" | "plainonly" | "none" => Ok(Self::PlainOnly),
            "rag" => Ok(Self::Rag),
            other => Err(format!("unknown mode '{}' (expected 'plain' or 'rag')", other)),
        }
    }
}

/// Request lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Idle,
    /// A request is in flight; new submissions are refused
    Pending,
    /// The last exchange failed; see `SessionState::last_error`
    Errored,
}

/// Category of a failed exchange
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transport,
    Server,
    MalformedResponse,
    Timeout,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Transport => "transport error",
            Self::Server => "server error",
            Self::MalformedResponse => "malformed response",
            Self::Timeout => "timeout",
        };
        f.write_str(label)
    }
}

/// Error attached to the session after a failed exchange
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionError {
    pub kind: ErrorKind,
    /// Human-readable description for display
    pub message: String,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// One message in the conversation
///
/// Turns are immutable once created; the RAG fields of an assistant turn
/// describe what the backend reported for that reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Turn {
    User {
        text: String,
        created_at: DateTime<Utc>,
    },
    Assistant {
        text: String,
        used_rag: bool,
        /// Retrieved items, only ever present when `used_rag` is true
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<Vec<JsonValue>>,
        created_at: DateTime<Utc>,
    },
}

/// Turn role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Turn {
    /// Create a user turn
    pub fn user(text: impl Into<String>) -> Self {
        Self::User {
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    /// Create an assistant turn
    ///
    /// `context` is dropped when `used_rag` is false.
    pub fn assistant(
        text: impl Into<String>,
        used_rag: bool,
        context: Option<Vec<JsonValue>>,
    ) -> Self {
        Self::Assistant {
            text: text.into(),
            used_rag,
            context: context.filter(|_| used_rag),
            created_at: Utc::now(),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Self::User { .. } => Role::User,
            Self::Assistant { .. } => Role::Assistant,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::User { text, .. } | Self::Assistant { text, .. } => text,
        }
    }

    /// Whether retrieval was applied; always false for user turns
    pub fn used_rag(&self) -> bool {
        matches!(self, Self::Assistant { used_rag: true, .. })
    }

    pub fn context(&self) -> Option<&[JsonValue]> {
        match self {
            Self::Assistant { context, .. } => context.as_deref(),
            Self::User { .. } => None,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::User { created_at, .. } | Self::Assistant { created_at, .. } => *created_at,
        }
    }
}

/// State of one conversation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionState {
    /// Conversation turns in submission order
    pub history: Vec<Turn>,
    pub mode: Mode,
    pub status: Status,
    pub last_error: Option<SessionError>,
}

impl SessionState {
    /// Create an empty session starting in the given mode
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == Status::Pending
    }

    /// Most recent assistant turn, if any
    pub fn last_assistant_turn(&self) -> Option<&Turn> {
        self.history
            .iter()
            .rev()
            .find(|turn| turn.role() == Role::Assistant)
    }

    /// Get turn count
    pub fn turn_count(&self) -> usize {
        self.history.len()
    }
}
