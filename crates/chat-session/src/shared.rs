use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chat_backend::BackendRegistry;

use crate::error::Result;
use crate::session::ChatSession;
use crate::types::{PrefillInput, SessionState, StopReason};

/// A cloneable, thread-safe handle to one [`ChatSession`].
///
/// Every call takes the session lock for its whole duration, so at most one
/// operation is in flight. A panic while the lock was held does not poison
/// later calls.
#[derive(Clone, Debug)]
pub struct SharedSession {
    inner: Arc<Mutex<ChatSession>>,
}

impl SharedSession {
    pub fn new(registry: BackendRegistry) -> Self {
        Self::from(ChatSession::new(registry))
    }

    /// Lock the session for a sequence of calls.
    pub fn lock(&self) -> MutexGuard<'_, ChatSession> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn reload(&self, model_id: &str, model_path: impl AsRef<Path>) -> Result<()> {
        self.lock().reload(model_id, model_path)
    }

    pub fn unload(&self) {
        self.lock().unload()
    }

    pub fn reset_chat(&self) -> Result<()> {
        self.lock().reset_chat()
    }

    pub fn prefill(&self, input: impl Into<PrefillInput>) -> Result<()> {
        self.lock().prefill(input)
    }

    pub fn decode(&self) -> Result<()> {
        self.lock().decode()
    }

    /// Snapshot of the reply so far.
    pub fn get_message(&self) -> String {
        self.lock().get_message().to_string()
    }

    pub fn stopped(&self) -> bool {
        self.lock().stopped()
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.lock().stop_reason()
    }

    pub fn state(&self) -> SessionState {
        self.lock().state()
    }

    pub fn runtime_stats_text(&self) -> String {
        self.lock().runtime_stats_text()
    }

    pub fn evaluate(&self) -> Result<String> {
        self.lock().evaluate()
    }
}

impl From<ChatSession> for SharedSession {
    fn from(session: ChatSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }
}
