//! Conversational front-end for the ITSM assistant.
//!
//! Keeps chat sessions and their transcripts, validates attachments, talks
//! to the backend over multipart HTTP, and tracks proposals that wait for
//! operator confirmation.

pub mod attachment;
pub mod confirmation;
pub mod controller;
pub mod error;
pub mod gateway;
#[cfg(any(test, feature = "test-util"))]
pub mod scripted;
pub mod session;
pub mod store;
pub mod transcript;

pub use attachment::{
    AttachmentRef, AttachmentValidator, RawFile, RejectReason, RejectedFile, ValidationReport,
};
pub use confirmation::{ClearReason, ConfirmationState, ConfirmationWorkflow, Transition};
pub use controller::{ChatController, QuickAction, SessionSummary, SubmitOutcome, SubmitReport};
pub use error::ChatError;
pub use gateway::{ChatBackend, ChatResponse, GatewayError, HttpGateway};
#[cfg(any(test, feature = "test-util"))]
pub use scripted::{RecordedRequest, ScriptedBackend};
pub use session::{Draft, Session};
pub use store::SessionStore;
pub use transcript::{ChatTranscript, Message, NewMessage, ProposalPayload, ProposedFields};
