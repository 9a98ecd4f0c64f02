//! Session state and its store
//!
//! Holds the conversation history, the generation mode and the request
//! lifecycle status of one conversation.

mod store;
mod types;

pub use store::{Admission, SessionStore};
pub use types::{ErrorKind, Mode, Role, SessionError, SessionState, Status, Turn};
