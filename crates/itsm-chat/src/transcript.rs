//! Per-session message log.
//!
//! The transcript is append-only: messages receive their id and timestamp on
//! append and are only ever handed out by shared reference afterwards.

use itsm_core::types::{Author, MessageId, Timestamp};

use crate::attachment::AttachmentRef;

// =============================================================================
// Proposals
// =============================================================================

/// Field values proposed by the backend, in the order the backend sent them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProposedFields(Vec<(String, String)>);

impl ProposedFields {
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Self(fields)
    }

    /// Convert a JSON object, keeping key order. Non-string values are
    /// rendered as their JSON text.
    pub fn from_json_object(object: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(
            object
                .into_iter()
                .map(|(key, value)| {
                    let text = match value {
                        serde_json::Value::String(s) => s,
                        serde_json::Value::Null => String::new(),
                        other => other.to_string(),
                    };
                    (key, text)
                })
                .collect(),
        )
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A backend-proposed action, stored on the assistant message that carried it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposalPayload {
    pub fields: ProposedFields,
    /// The backend's flag as received. Whether the proposal is still
    /// pending is the session's confirmation state, not this field.
    pub awaiting_confirmation: bool,
}

// =============================================================================
// Messages
// =============================================================================

/// A message as it sits in a transcript.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub author: Author,
    pub body: String,
    pub attachments: Vec<AttachmentRef>,
    pub timestamp: Timestamp,
    pub proposal: Option<ProposalPayload>,
}

/// Content of a message about to be appended.
#[derive(Clone, Debug, PartialEq)]
pub struct NewMessage {
    pub author: Author,
    pub body: String,
    pub attachments: Vec<AttachmentRef>,
    pub proposal: Option<ProposalPayload>,
}

impl NewMessage {
    pub fn operator(body: impl Into<String>, attachments: Vec<AttachmentRef>) -> Self {
        Self {
            author: Author::Operator,
            body: body.into(),
            attachments,
            proposal: None,
        }
    }

    pub fn assistant(body: impl Into<String>) -> Self {
        Self {
            author: Author::Assistant,
            body: body.into(),
            attachments: Vec::new(),
            proposal: None,
        }
    }

    pub fn with_proposal(mut self, proposal: Option<ProposalPayload>) -> Self {
        self.proposal = proposal;
        self
    }
}

// =============================================================================
// ChatTranscript
// =============================================================================

/// Ordered, append-only log of a session's messages.
#[derive(Clone, Debug)]
pub struct ChatTranscript {
    messages: Vec<Message>,
    next_id: u64,
}

impl Default for ChatTranscript {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatTranscript {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            next_id: 1,
        }
    }

    /// Append a message, assigning the next id and the current time.
    pub fn append(&mut self, message: NewMessage) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id = id.0 + 1;
        self.messages.push(Message {
            id,
            author: message.author,
            body: message.body,
            attachments: message.attachments,
            timestamp: Timestamp::now(),
            proposal: message.proposal,
        });
        id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
