//! Chat backend client and conversation controller

mod backend;
mod client;
mod types;

pub use backend::{ChatBackend, HttpBackend};
pub use client::{ChatClient, SkipReason, Submitted};
pub use types::{ChatRequest, ChatResponse, error_detail};
