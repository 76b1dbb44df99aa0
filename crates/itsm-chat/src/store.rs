//! Owner of all chat sessions and the current-session pointer.
//!
//! Invariant: the store always holds at least one session, and `current`
//! always names one of them.

use std::collections::BTreeMap;

use itsm_core::config::ChatConfig;
use itsm_core::types::{MessageId, SessionId};

use crate::error::ChatError;
use crate::session::Session;
use crate::transcript::NewMessage;

pub struct SessionStore {
    sessions: BTreeMap<SessionId, Session>,
    current: SessionId,
    next_id: u64,
    session_name_prefix: String,
    session_greeting: String,
}

impl SessionStore {
    /// Create a store holding the default session, which becomes current.
    pub fn new(config: &ChatConfig) -> Self {
        let first = SessionId(1);
        let mut session = Session::new(first, config.default_session_name.clone());
        session
            .transcript_mut()
            .append(NewMessage::assistant(config.initial_greeting.clone()));

        let mut sessions = BTreeMap::new();
        sessions.insert(first, session);
        tracing::info!(session_id = %first, "Default session created");

        Self {
            sessions,
            current: first,
            next_id: first.0 + 1,
            session_name_prefix: config.session_name_prefix.clone(),
            session_greeting: config.session_greeting.clone(),
        }
    }

    /// Allocate a new session with a welcome message and make it current.
    pub fn create_session(&mut self) -> SessionId {
        let id = SessionId(self.next_id);
        self.next_id += 1;

        let name = format!("{} {}", self.session_name_prefix, self.sessions.len() + 1);
        let mut session = Session::new(id, name);
        session
            .transcript_mut()
            .append(NewMessage::assistant(self.session_greeting.clone()));

        self.sessions.insert(id, session);
        self.current = id;
        tracing::info!(session_id = %id, "Session created");
        id
    }

    /// Remove a session. The last remaining session cannot be deleted.
    ///
    /// When the deleted session was current, the session with the lowest id
    /// becomes current.
    pub fn delete_session(&mut self, id: SessionId) -> Result<(), ChatError> {
        if !self.sessions.contains_key(&id) {
            return Err(ChatError::SessionNotFound(id));
        }
        if self.sessions.len() == 1 {
            tracing::warn!(session_id = %id, "Refused to delete the last session");
            return Err(ChatError::LastSession(id));
        }

        self.sessions.remove(&id);
        if self.current == id {
            if let Some(first) = self.sessions.keys().next() {
                self.current = *first;
            }
        }
        tracing::info!(session_id = %id, current = %self.current, "Session deleted");
        Ok(())
    }

    /// Rename a session. Blank names are ignored.
    ///
    /// Returns whether the name changed.
    pub fn rename(&mut self, id: SessionId, new_name: &str) -> Result<bool, ChatError> {
        let session = self.get_mut(id)?;
        let trimmed = new_name.trim();
        if trimmed.is_empty() || trimmed == session.display_name() {
            return Ok(false);
        }
        session.set_display_name(trimmed.to_string());
        tracing::info!(session_id = %id, name = %trimmed, "Session renamed");
        Ok(true)
    }

    pub fn set_current(&mut self, id: SessionId) -> Result<(), ChatError> {
        if !self.sessions.contains_key(&id) {
            return Err(ChatError::SessionNotFound(id));
        }
        self.current = id;
        Ok(())
    }

    pub fn current(&self) -> SessionId {
        self.current
    }

    /// Append a message to a session's transcript and bump its activity time.
    pub fn append_message(
        &mut self,
        id: SessionId,
        message: NewMessage,
    ) -> Result<MessageId, ChatError> {
        let session = self.get_mut(id)?;
        let message_id = session.transcript_mut().append(message);
        session.touch();
        Ok(message_id)
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: SessionId) -> Result<&mut Session, ChatError> {
        self.sessions
            .get_mut(&id)
            .ok_or(ChatError::SessionNotFound(id))
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Sessions in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
