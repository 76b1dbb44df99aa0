//! Error types for the chat controller.

use itsm_core::types::SessionId;

/// Errors from the chat controller and session store.
///
/// None of these are fatal: callers recover locally (fall back to another
/// session, ignore the request, or show the message to the operator).
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),
    #[error("cannot delete session {0}: it is the last remaining session")]
    LastSession(SessionId),
    #[error("session {0} is still waiting for a reply")]
    SessionBusy(SessionId),
    #[error("session {0} has no proposal awaiting confirmation")]
    NoPendingProposal(SessionId),
    #[error("no selected file at index {index}")]
    AttachmentIndex { index: usize },
    #[error("state lock poisoned: {0}")]
    StatePoisoned(String),
}
