//! Chat session state.

use itsm_core::types::{MessageId, SessionId, Timestamp};

use crate::attachment::RawFile;
use crate::confirmation::ConfirmationWorkflow;
use crate::error::ChatError;
use crate::transcript::ChatTranscript;

/// Text and files the operator is preparing for the next message.
///
/// Files in a draft have already passed attachment validation.
#[derive(Clone, Debug, Default)]
pub struct Draft {
    pub input: String,
    files: Vec<RawFile>,
}

impl Draft {
    pub fn files(&self) -> &[RawFile] {
        &self.files
    }

    pub(crate) fn add_files(&mut self, files: Vec<RawFile>) {
        self.files.extend(files);
    }

    pub(crate) fn remove_file(&mut self, index: usize) -> Result<RawFile, ChatError> {
        if index >= self.files.len() {
            return Err(ChatError::AttachmentIndex { index });
        }
        Ok(self.files.remove(index))
    }

    pub fn is_empty(&self) -> bool {
        self.input.trim().is_empty() && self.files.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.input.clear();
        self.files.clear();
    }
}

/// One conversation with the assistant backend.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    display_name: String,
    transcript: ChatTranscript,
    last_activity: Timestamp,
    workflow_path: Vec<String>,
    busy: bool,
    confirmation: ConfirmationWorkflow,
    draft: Draft,
}

impl Session {
    pub(crate) fn new(id: SessionId, display_name: String) -> Self {
        Self {
            id,
            display_name,
            transcript: ChatTranscript::new(),
            last_activity: Timestamp::now(),
            workflow_path: Vec::new(),
            busy: false,
            confirmation: ConfirmationWorkflow::new(),
            draft: Draft::default(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn transcript(&self) -> &ChatTranscript {
        &self.transcript
    }

    pub fn last_activity(&self) -> Timestamp {
        self.last_activity
    }

    /// Execution path reported with the most recent backend reply.
    pub fn workflow_path(&self) -> &[String] {
        &self.workflow_path
    }

    /// Workflow path joined for display, e.g. `"classify → create"`.
    pub fn workflow_path_label(&self) -> String {
        self.workflow_path.join(" \u{2192} ")
    }

    /// Whether a chat request for this session is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn confirmation(&self) -> &ConfirmationWorkflow {
        &self.confirmation
    }

    /// Whether `message_id` carries the proposal awaiting confirmation.
    /// Older proposals in the transcript are stale.
    pub fn is_active_proposal(&self, message_id: MessageId) -> bool {
        self.confirmation
            .active_proposal()
            .is_some_and(|(active, _)| active == message_id)
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub(crate) fn set_display_name(&mut self, name: String) {
        self.display_name = name;
    }

    pub(crate) fn transcript_mut(&mut self) -> &mut ChatTranscript {
        &mut self.transcript
    }

    pub(crate) fn touch(&mut self) {
        self.last_activity = Timestamp::now();
    }

    pub(crate) fn replace_workflow_path(&mut self, path: Vec<String>) {
        self.workflow_path = path;
    }

    pub(crate) fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    pub(crate) fn confirmation_mut(&mut self) -> &mut ConfirmationWorkflow {
        &mut self.confirmation
    }

    pub(crate) fn draft_mut(&mut self) -> &mut Draft {
        &mut self.draft
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::{ProposalPayload, ProposedFields};

    #[test]
    fn test_new_session_is_idle_and_empty() {
        let session = Session::new(SessionId(1), "ITSM Assistant".to_string());
        assert_eq!(session.id(), SessionId(1));
        assert_eq!(session.display_name(), "ITSM Assistant");
        assert!(session.transcript().is_empty());
        assert!(session.workflow_path().is_empty());
        assert!(!session.is_busy());
        assert!(!session.confirmation().is_awaiting());
        assert!(session.draft().is_empty());
    }

    #[test]
    fn test_only_latest_proposal_is_active() {
        let mut session = Session::new(SessionId(1), "s".to_string());
        let proposal = ProposalPayload {
            fields: ProposedFields::new(vec![("priority".into(), "High".into())]),
            awaiting_confirmation: true,
        };
        session
            .confirmation_mut()
            .on_assistant_reply(MessageId(3), Some(&proposal));
        assert!(session.is_active_proposal(MessageId(3)));

        session
            .confirmation_mut()
            .on_assistant_reply(MessageId(5), Some(&proposal));
        assert!(!session.is_active_proposal(MessageId(3)));
        assert!(session.is_active_proposal(MessageId(5)));

        session.confirmation_mut().dismiss();
        assert!(!session.is_active_proposal(MessageId(5)));
    }

    #[test]
    fn test_workflow_path_label() {
        let mut session = Session::new(SessionId(1), "s".to_string());
        assert_eq!(session.workflow_path_label(), "");
        session.replace_workflow_path(vec!["classify".into(), "create_incident".into()]);
        assert_eq!(session.workflow_path_label(), "classify \u{2192} create_incident");
        session.replace_workflow_path(vec!["lookup".into()]);
        assert_eq!(session.workflow_path(), &["lookup".to_string()]);
    }

    #[test]
    fn test_draft_files_and_clear() {
        let mut draft = Draft::default();
        draft.input = "  ".to_string();
        assert!(draft.is_empty());

        draft.add_files(vec![
            RawFile::new("a.log", b"a".to_vec()),
            RawFile::new("b.log", b"b".to_vec()),
        ]);
        assert!(!draft.is_empty());

        let removed = draft.remove_file(0).unwrap();
        assert_eq!(removed.name(), "a.log");
        assert_eq!(draft.files().len(), 1);
        assert!(matches!(
            draft.remove_file(5),
            Err(ChatError::AttachmentIndex { index: 5 })
        ));

        draft.clear();
        assert!(draft.is_empty());
        assert!(draft.input.is_empty());
    }
}
