//! Conversation controller
//!
//! Turns one user submission into exactly one backend exchange and feeds the
//! outcome back into the [`SessionStore`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::session::{Admission, ErrorKind, Mode, SessionError, SessionState, SessionStore};

use super::backend::{ChatBackend, HttpBackend};
use super::types::ChatRequest;

/// Why a submission did not start a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Query was empty after trimming
    Empty,
    /// A request is already in flight
    Busy,
}

/// Result of a submission that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submitted {
    /// The reply was appended to the history
    Replied,
    /// Nothing happened
    Skipped(SkipReason),
}

impl Submitted {
    /// Whether the caller should clear its input buffer
    pub fn clears_input(&self) -> bool {
        matches!(self, Self::Replied)
    }
}

/// Chat client bound to one session
#[derive(Clone)]
pub struct ChatClient {
    store: Arc<SessionStore>,
    backend: Arc<dyn ChatBackend>,
    timeout: Duration,
}

impl ChatClient {
    /// Create a client with the HTTP backend described by `config`
    pub fn new(config: &Config) -> Result<Self> {
        let backend = HttpBackend::new(config)?;
        let store = SessionStore::new(config.chat.default_mode);
        Ok(Self::with_backend(Arc::new(store), Arc::new(backend), config.timeout()))
    }

    /// Create a client over an existing store and backend
    pub fn with_backend(
        store: Arc<SessionStore>,
        backend: Arc<dyn ChatBackend>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            backend,
            timeout,
        }
    }

    /// Session store this client writes to
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn snapshot(&self) -> SessionState {
        self.store.snapshot()
    }

    pub fn set_mode(&self, mode: Mode) {
        self.store.set_mode(mode);
    }

    /// Start a new conversation on the same backend
    pub fn reset(&self) {
        self.store.reset();
        info!("Started a new session (mode={})", self.store.mode());
    }

    /// Submit a user query
    ///
    /// Failures are recorded in the session and also returned; the reply
    /// is only in the history when this returns `Ok(Submitted::Replied)`.
    pub async fn submit(&self, raw_query: &str) -> Result<Submitted> {
        let query = raw_query.trim();
        if query.is_empty() {
            return Ok(Submitted::Skipped(SkipReason::Empty));
        }

        // Latched before the turn is appended so a later toggle cannot leak in
        let mode = self.store.mode();

        match self.store.append_user_turn(query) {
            Admission::Accepted => {}
            Admission::Empty => return Ok(Submitted::Skipped(SkipReason::Empty)),
            Admission::Busy => {
                debug!("Submission ignored, a request is already pending");
                return Ok(Submitted::Skipped(SkipReason::Busy));
            }
        }

        let request = ChatRequest::new(query, mode);
        info!("Submitting query (mode={})", mode);

        let outcome = match tokio::time::timeout(self.timeout, self.backend.chat(&request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(self.timeout)),
        };

        match outcome {
            Ok(response) => {
                if response.used_rag != request.use_rag {
                    debug!(
                        "Backend reported usedRag={} for useRag={}",
                        response.used_rag, request.use_rag
                    );
                }
                if let Err(e) = self.store.append_assistant_turn(
                    response.reply,
                    response.used_rag,
                    response.context,
                ) {
                    warn!("Dropping reply that arrived outside a pending request: {}", e);
                    return Err(e);
                }
                Ok(Submitted::Replied)
            }
            Err(e) => {
                warn!("Chat request failed: {}", e);
                self.fail(&e);
                Err(e)
            }
        }
    }

    fn fail(&self, error: &Error) {
        // Anything the backend raises must still release the pending state
        let kind = error.kind().unwrap_or(ErrorKind::Transport);
        let session_error = SessionError {
            kind,
            message: error.to_string(),
        };
        if let Err(e) = self.store.record_error(session_error) {
            warn!("Dropping failure that arrived outside a pending request: {}", e);
        }
    }
}
