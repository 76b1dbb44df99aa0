use serde::{Deserialize, Serialize};

use crate::types::{Author, MessageId, SessionId};

/// Change notifications published by the chat controller.
///
/// Views subscribe to these to know when to re-read session state. Events
/// carry identifiers only; the state itself is read back from the controller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ChatEvent {
    // =========================================================================
    // Session lifecycle
    // =========================================================================
    /// A session was created (at startup or on operator request).
    SessionCreated { session_id: SessionId },

    /// A session was deleted.
    SessionDeleted { session_id: SessionId },

    /// A session's display name changed.
    SessionRenamed {
        session_id: SessionId,
        display_name: String,
    },

    /// The current-session pointer moved.
    CurrentChanged { session_id: SessionId },

    // =========================================================================
    // Conversation
    // =========================================================================
    /// A message was appended to a session's transcript.
    MessageAppended {
        session_id: SessionId,
        message_id: MessageId,
        author: Author,
    },

    /// A session started or finished waiting on the backend.
    BusyChanged { session_id: SessionId, busy: bool },

    /// Selected files were refused by attachment validation.
    AttachmentsRejected {
        session_id: SessionId,
        file_names: Vec<String>,
    },

    /// A session's draft input or selected files changed.
    DraftChanged { session_id: SessionId },

    /// A session entered or left the awaiting-confirmation state.
    ConfirmationChanged {
        session_id: SessionId,
        awaiting: bool,
    },
}

impl ChatEvent {
    /// Session the event refers to.
    pub fn session_id(&self) -> SessionId {
        match self {
            ChatEvent::SessionCreated { session_id }
            | ChatEvent::SessionDeleted { session_id }
            | ChatEvent::SessionRenamed { session_id, .. }
            | ChatEvent::CurrentChanged { session_id }
            | ChatEvent::MessageAppended { session_id, .. }
            | ChatEvent::BusyChanged { session_id, .. }
            | ChatEvent::AttachmentsRejected { session_id, .. }
            | ChatEvent::DraftChanged { session_id }
            | ChatEvent::ConfirmationChanged { session_id, .. } => *session_id,
        }
    }

    /// Returns a short event name for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            ChatEvent::SessionCreated { .. } => "session_created",
            ChatEvent::SessionDeleted { .. } => "session_deleted",
            ChatEvent::SessionRenamed { .. } => "session_renamed",
            ChatEvent::CurrentChanged { .. } => "current_changed",
            ChatEvent::MessageAppended { .. } => "message_appended",
            ChatEvent::BusyChanged { .. } => "busy_changed",
            ChatEvent::AttachmentsRejected { .. } => "attachments_rejected",
            ChatEvent::DraftChanged { .. } => "draft_changed",
            ChatEvent::ConfirmationChanged { .. } => "confirmation_changed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_session_id() {
        let event = ChatEvent::MessageAppended {
            session_id: SessionId(4),
            message_id: MessageId(2),
            author: Author::Operator,
        };
        assert_eq!(event.session_id(), SessionId(4));

        let event = ChatEvent::AttachmentsRejected {
            session_id: SessionId(9),
            file_names: vec!["empty.log".into()],
        };
        assert_eq!(event.session_id(), SessionId(9));
    }

    #[test]
    fn test_event_name() {
        let event = ChatEvent::ConfirmationChanged {
            session_id: SessionId(1),
            awaiting: true,
        };
        assert_eq!(event.event_name(), "confirmation_changed");
        assert_eq!(
            ChatEvent::BusyChanged {
                session_id: SessionId(1),
                busy: false
            }
            .event_name(),
            "busy_changed"
        );
    }

    #[test]
    fn test_event_serialization() {
        let event = ChatEvent::SessionRenamed {
            session_id: SessionId(2),
            display_name: "Outage triage".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("SessionRenamed"));
        assert!(json.contains("Outage triage"));

        let back: ChatEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
