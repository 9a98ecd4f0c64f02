//! ragchat-core: conversation core for the ragchat client
//!
//! Keeps the state of one conversation with a chat backend that can answer
//! from the model alone or with retrieval-augmented generation (RAG), and
//! drives the request lifecycle against that backend.

pub mod chat;
pub mod config;
pub mod error;
pub mod session;

pub use chat::{ChatBackend, ChatClient, ChatRequest, ChatResponse, HttpBackend, SkipReason, Submitted};
pub use config::{BackendConfig, ChatConfig, Config};
pub use error::{Error, Result};
pub use session::{
    Admission, ErrorKind, Mode, Role, SessionError, SessionState, SessionStore, Status, Turn,
};
