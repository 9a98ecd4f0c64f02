//! Observable session store
//!
//! The store is the only writer of [`SessionState`]. Every transition is
//! guarded by the current [`Status`]; observers get the new state through a
//! `watch` channel whenever a transition actually changes something.

use serde_json::Value as JsonValue;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::session::{Mode, SessionError, SessionState, Status, Turn};
use crate::{Error, Result};

/// Outcome of [`SessionStore::append_user_turn`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The turn was appended and the session is now pending
    Accepted,
    /// The text was empty after trimming
    Empty,
    /// Another request is still in flight
    Busy,
}

/// Owner of one conversation's state
pub struct SessionStore {
    state: watch::Sender<SessionState>,
}

impl SessionStore {
    /// Create a store for a new conversation
    pub fn new(mode: Mode) -> Self {
        let (state, _) = watch::channel(SessionState::new(mode));
        Self { state }
    }

    /// Append a user turn and enter `Pending`
    ///
    /// Refused without any state change when the text is blank or a request
    /// is already pending.
    pub fn append_user_turn(&self, text: &str) -> Admission {
        let text = text.trim();
        let mut admission = Admission::Accepted;

        self.state.send_if_modified(|state| {
            if text.is_empty() {
                admission = Admission::Empty;
                return false;
            }
            if state.is_pending() {
                admission = Admission::Busy;
                return false;
            }

            state.history.push(Turn::user(text));
            state.last_error = None;
            state.status = Status::Pending;
            true
        });

        debug!("append_user_turn: {:?}", admission);
        admission
    }

    /// Append the assistant reply for the pending request and return to `Idle`
    pub fn append_assistant_turn(
        &self,
        text: impl Into<String>,
        used_rag: bool,
        context: Option<Vec<JsonValue>>,
    ) -> Result<()> {
        let text = text.into();
        self.transition("append assistant turn", |state| {
            state.history.push(Turn::assistant(text, used_rag, context));
            state.status = Status::Idle;
        })
    }

    /// Record the failure of the pending request
    ///
    /// The unanswered user turn stays in the history.
    pub fn record_error(&self, error: SessionError) -> Result<()> {
        self.transition("record error", |state| {
            state.last_error = Some(error);
            state.status = Status::Errored;
        })
    }

    /// Change the mode used for the next submission
    pub fn set_mode(&self, mode: Mode) {
        self.state.send_if_modified(|state| {
            if state.mode == mode {
                return false;
            }
            state.mode = mode;
            true
        });
    }

    /// Discard the conversation and start over in the current mode
    ///
    /// Subscribers stay attached. A reply still in flight is rejected when it
    /// lands because the session is no longer pending.
    pub fn reset(&self) {
        self.state
            .send_modify(|state| *state = SessionState::new(state.mode));
        debug!("reset");
    }

    pub fn mode(&self) -> Mode {
        self.state.borrow().mode
    }

    pub fn status(&self) -> Status {
        self.state.borrow().status
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every change to the state
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Apply a completion transition, which is only valid while pending
    fn transition(
        &self,
        operation: &'static str,
        apply: impl FnOnce(&mut SessionState),
    ) -> Result<()> {
        let mut rejected = None;

        self.state.send_if_modified(|state| {
            if !state.is_pending() {
                rejected = Some(state.status);
                return false;
            }
            apply(state);
            true
        });

        match rejected {
            Some(status) => {
                warn!("Rejected '{}' while session is {:?}", operation, status);
                Err(Error::InvalidTransition { operation, status })
            }
            None => Ok(()),
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Mode::default())
    }
}
