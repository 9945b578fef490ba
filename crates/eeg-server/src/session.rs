//! The recording session that newly formed blocks are tagged with

use eeg_core::{SessionId, SessionRecord};
use parking_lot::RwLock;

/// At most one session is active; starting another replaces it
#[derive(Debug, Default)]
pub struct ActiveSession {
    current: RwLock<Option<SessionRecord>>,
}

impl ActiveSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `record` the active session, returning the one it replaces
    pub fn start(&self, record: SessionRecord) -> Option<SessionRecord> {
        self.current.write().replace(record)
    }

    pub fn stop(&self) -> Option<SessionRecord> {
        self.current.write().take()
    }

    pub fn current(&self) -> Option<SessionRecord> {
        self.current.read().clone()
    }

    pub fn current_id(&self) -> Option<SessionId> {
        self.current.read().as_ref().map(|session| session.id)
    }
}
