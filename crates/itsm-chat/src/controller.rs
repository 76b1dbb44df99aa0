//! Chat controller: turns operator intents into store mutations and backend
//! exchanges.
//!
//! All state lives in one [`SessionStore`] behind a mutex that is only held
//! for synchronous sections, never across a backend call. A session is
//! marked busy while its request is in flight; other sessions stay usable.
//! A reply is always applied to the session that sent the request, whatever
//! the current session is by then.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use itsm_core::config::ChatConfig;
use itsm_core::events::ChatEvent;
use itsm_core::types::{Author, MessageId, SessionId, Timestamp};

use crate::attachment::{AttachmentValidator, RawFile, RejectedFile};
use crate::confirmation::{ConfirmationState, Transition};
use crate::error::ChatError;
use crate::gateway::{ChatBackend, ChatResponse};
use crate::session::Session;
use crate::store::SessionStore;
use crate::transcript::{Message, NewMessage, ProposalPayload};

/// Capacity of the change-notification channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// Outcomes and views
// =============================================================================

/// Result of a submit call.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Nothing to send: no text and no acceptable file.
    Ignored { rejected: Vec<RejectedFile> },
    /// The exchange ran to completion, successfully or not.
    Completed(SubmitReport),
}

impl SubmitOutcome {
    pub fn rejected(&self) -> &[RejectedFile] {
        match self {
            SubmitOutcome::Ignored { rejected } => rejected,
            SubmitOutcome::Completed(report) => &report.rejected,
        }
    }
}

/// Details of a completed exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitReport {
    pub session_id: SessionId,
    pub operator_message: MessageId,
    /// `None` when the session was deleted before the reply arrived.
    pub reply_message: Option<MessageId>,
    /// Files refused by validation; never attached or transmitted.
    pub rejected: Vec<RejectedFile>,
    /// Description of the gateway failure, when the reply is synthetic.
    pub gateway_error: Option<String>,
    pub transition: Transition,
}

/// What an outgoing exchange stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Message,
    /// Consumes the active proposal.
    Approval,
}

/// Canned drafts offered as one-click shortcuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickAction {
    NewIncident,
    GetResolution,
}

/// Read-only overview of one session, for session lists.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub id: SessionId,
    pub display_name: String,
    pub message_count: usize,
    pub last_activity: Timestamp,
    pub workflow_path: Vec<String>,
    pub busy: bool,
    pub awaiting_confirmation: bool,
    pub current: bool,
}

// =============================================================================
// ChatController
// =============================================================================

/// Orchestrates sessions, attachment validation, the backend gateway and the
/// confirmation workflow.
pub struct ChatController {
    store: Mutex<SessionStore>,
    backend: Arc<dyn ChatBackend>,
    validator: AttachmentValidator,
    config: ChatConfig,
    event_tx: broadcast::Sender<ChatEvent>,
}

impl ChatController {
    /// Create a controller with the default session in place.
    pub fn new(config: ChatConfig, backend: Arc<dyn ChatBackend>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store: Mutex::new(SessionStore::new(&config)),
            backend,
            validator: AttachmentValidator,
            config,
            event_tx,
        }
    }

    /// Receive change notifications from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.event_tx.subscribe()
    }

    fn publish(&self, event: ChatEvent) {
        tracing::trace!(event = event.event_name(), session_id = %event.session_id(), "Chat event");
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }

    fn with_store<R>(
        &self,
        f: impl FnOnce(&mut SessionStore) -> Result<R, ChatError>,
    ) -> Result<R, ChatError> {
        let mut store = self
            .store
            .lock()
            .map_err(|e| ChatError::StatePoisoned(e.to_string()))?;
        f(&mut store)
    }

    /// Run `f` against an idle session; busy sessions refuse edits.
    fn with_idle_session<R>(
        &self,
        session_id: SessionId,
        f: impl FnOnce(&mut Session) -> Result<R, ChatError>,
    ) -> Result<R, ChatError> {
        self.with_store(|store| {
            let session = store.get_mut(session_id)?;
            if session.is_busy() {
                return Err(ChatError::SessionBusy(session_id));
            }
            f(session)
        })
    }

    // =========================================================================
    // Session lifecycle
    // =========================================================================

    pub fn create_session(&self) -> Result<SessionId, ChatError> {
        let id = self.with_store(|store| Ok(store.create_session()))?;
        self.publish(ChatEvent::SessionCreated { session_id: id });
        self.publish(ChatEvent::CurrentChanged { session_id: id });
        Ok(id)
    }

    /// Delete a session. Refused for the last remaining one.
    pub fn delete_session(&self, session_id: SessionId) -> Result<(), ChatError> {
        let (before, after) = self.with_store(|store| {
            let before = store.current();
            store.delete_session(session_id)?;
            Ok((before, store.current()))
        })?;
        self.publish(ChatEvent::SessionDeleted { session_id });
        if before != after {
            self.publish(ChatEvent::CurrentChanged { session_id: after });
        }
        Ok(())
    }

    /// Rename a session. Blank names leave it unchanged.
    pub fn rename_session(&self, session_id: SessionId, name: &str) -> Result<bool, ChatError> {
        let changed = self.with_store(|store| store.rename(session_id, name))?;
        if changed {
            self.publish(ChatEvent::SessionRenamed {
                session_id,
                display_name: name.trim().to_string(),
            });
        }
        Ok(changed)
    }

    pub fn select_session(&self, session_id: SessionId) -> Result<(), ChatError> {
        self.with_store(|store| store.set_current(session_id))?;
        self.publish(ChatEvent::CurrentChanged { session_id });
        Ok(())
    }

    pub fn current_session(&self) -> Result<SessionId, ChatError> {
        self.with_store(|store| Ok(store.current()))
    }

    /// Summaries of all sessions in ascending id order.
    pub fn sessions(&self) -> Result<Vec<SessionSummary>, ChatError> {
        self.with_store(|store| {
            let current = store.current();
            Ok(store
                .iter()
                .map(|s| SessionSummary {
                    id: s.id(),
                    display_name: s.display_name().to_string(),
                    message_count: s.transcript().len(),
                    last_activity: s.last_activity(),
                    workflow_path: s.workflow_path().to_vec(),
                    busy: s.is_busy(),
                    awaiting_confirmation: s.confirmation().is_awaiting(),
                    current: s.id() == current,
                })
                .collect())
        })
    }

    /// Read a session without copying it out.
    pub fn with_session<R>(
        &self,
        session_id: SessionId,
        f: impl FnOnce(&Session) -> R,
    ) -> Result<R, ChatError> {
        self.with_store(|store| {
            store
                .get(session_id)
                .map(f)
                .ok_or(ChatError::SessionNotFound(session_id))
        })
    }

    /// Copy of a session's transcript.
    pub fn transcript(&self, session_id: SessionId) -> Result<Vec<Message>, ChatError> {
        self.with_session(session_id, |s| s.transcript().messages().to_vec())
    }

    pub fn is_busy(&self, session_id: SessionId) -> Result<bool, ChatError> {
        self.with_session(session_id, |s| s.is_busy())
    }

    pub fn confirmation_state(
        &self,
        session_id: SessionId,
    ) -> Result<ConfirmationState, ChatError> {
        self.with_session(session_id, |s| s.confirmation().state().clone())
    }

    // =========================================================================
    // Draft editing
    // =========================================================================

    pub fn set_input(&self, session_id: SessionId, text: &str) -> Result<(), ChatError> {
        self.with_idle_session(session_id, |session| {
            session.draft_mut().input = text.to_string();
            Ok(())
        })?;
        self.publish(ChatEvent::DraftChanged { session_id });
        Ok(())
    }

    /// Validate files and add the accepted ones to the draft.
    ///
    /// Returns the rejected files so the view can tell the operator.
    pub fn select_files(
        &self,
        session_id: SessionId,
        files: Vec<RawFile>,
    ) -> Result<Vec<RejectedFile>, ChatError> {
        let report = self.validator.validate(files);
        let accepted = report.accepted;
        self.with_idle_session(session_id, |session| {
            session.draft_mut().add_files(accepted);
            Ok(())
        })?;
        self.report_rejections(session_id, &report.rejected);
        self.publish(ChatEvent::DraftChanged { session_id });
        Ok(report.rejected)
    }

    pub fn remove_file(&self, session_id: SessionId, index: usize) -> Result<RawFile, ChatError> {
        let removed =
            self.with_idle_session(session_id, |session| session.draft_mut().remove_file(index))?;
        self.publish(ChatEvent::DraftChanged { session_id });
        Ok(removed)
    }

    pub fn apply_quick_action(
        &self,
        session_id: SessionId,
        action: QuickAction,
    ) -> Result<(), ChatError> {
        let prompt = match action {
            QuickAction::NewIncident => &self.config.incident_prompt,
            QuickAction::GetResolution => &self.config.resolution_prompt,
        };
        self.set_input(session_id, prompt)
    }

    fn report_rejections(&self, session_id: SessionId, rejected: &[RejectedFile]) {
        if rejected.is_empty() {
            return;
        }
        self.publish(ChatEvent::AttachmentsRejected {
            session_id,
            file_names: rejected.iter().map(|r| r.name.clone()).collect(),
        });
    }

    // =========================================================================
    // Exchanges
    // =========================================================================

    /// Send the session's draft.
    pub async fn send_draft(&self, session_id: SessionId) -> Result<SubmitOutcome, ChatError> {
        let (text, files) = self.with_idle_session(session_id, |session| {
            let draft = session.draft();
            Ok((draft.input.clone(), draft.files().to_vec()))
        })?;
        self.submit(session_id, &text, files).await
    }

    /// Send one operator message and apply the backend's reply.
    ///
    /// The operator message is appended before the request goes out, so it
    /// survives a failed exchange. Only the first accepted file is
    /// transmitted; all accepted files are listed on the message. A failed
    /// exchange appends a "Connection error" reply and leaves the
    /// confirmation state alone. The session's draft is cleared once the
    /// reply is in.
    pub async fn submit(
        &self,
        session_id: SessionId,
        text: &str,
        files: Vec<RawFile>,
    ) -> Result<SubmitOutcome, ChatError> {
        self.exchange(session_id, text, files, Intent::Message).await
    }

    async fn exchange(
        &self,
        session_id: SessionId,
        text: &str,
        files: Vec<RawFile>,
        intent: Intent,
    ) -> Result<SubmitOutcome, ChatError> {
        if text.trim().is_empty() && files.is_empty() {
            return Ok(SubmitOutcome::Ignored {
                rejected: Vec::new(),
            });
        }

        let report = self.validator.validate(files);
        let rejected = report.rejected;
        let accepted = report.accepted;

        if text.trim().is_empty() && accepted.is_empty() {
            self.with_session(session_id, |_| ())?;
            self.report_rejections(session_id, &rejected);
            return Ok(SubmitOutcome::Ignored { rejected });
        }

        let descriptors: Vec<_> = accepted.iter().filter_map(RawFile::descriptor).collect();
        let (operator_message, approved) = self.with_store(|store| {
            let session = store.get_mut(session_id)?;
            if session.is_busy() {
                return Err(ChatError::SessionBusy(session_id));
            }
            let approved = match intent {
                Intent::Message => false,
                Intent::Approval => {
                    session
                        .confirmation_mut()
                        .approve()
                        .ok_or(ChatError::NoPendingProposal(session_id))?;
                    true
                }
            };
            let id = store.append_message(session_id, NewMessage::operator(text, descriptors))?;
            store.get_mut(session_id)?.set_busy(true);
            Ok((id, approved))
        })?;
        self.report_rejections(session_id, &rejected);
        self.publish(ChatEvent::MessageAppended {
            session_id,
            message_id: operator_message,
            author: Author::Operator,
        });
        if approved {
            self.publish(ChatEvent::ConfirmationChanged {
                session_id,
                awaiting: false,
            });
        }
        self.publish(ChatEvent::BusyChanged {
            session_id,
            busy: true,
        });

        if accepted.len() > 1 {
            tracing::debug!(
                session_id = %session_id,
                selected = accepted.len(),
                "Only the first attachment is transmitted"
            );
        }

        let (reply, gateway_error) = match self
            .backend
            .send(session_id, text, accepted.first())
            .await
        {
            Ok(reply) => (reply, None),
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Chat request failed");
                (ChatResponse::connection_error(&e), Some(e.to_string()))
            }
        };

        let delivered = gateway_error.is_none();
        let applied =
            self.with_store(|store| Self::apply_reply(store, session_id, reply, delivered))?;

        let (reply_message, transition) = match applied {
            Some((reply_id, transition)) => {
                self.publish(ChatEvent::MessageAppended {
                    session_id,
                    message_id: reply_id,
                    author: Author::Assistant,
                });
                if transition.toggles_awaiting() {
                    self.publish(ChatEvent::ConfirmationChanged {
                        session_id,
                        awaiting: matches!(transition, Transition::Entered { .. }),
                    });
                }
                self.publish(ChatEvent::BusyChanged {
                    session_id,
                    busy: false,
                });
                self.publish(ChatEvent::DraftChanged { session_id });
                (Some(reply_id), transition)
            }
            None => (None, Transition::Unchanged),
        };

        Ok(SubmitOutcome::Completed(SubmitReport {
            session_id,
            operator_message,
            reply_message,
            rejected,
            gateway_error,
            transition,
        }))
    }

    /// Append the reply to the originating session and settle its state.
    ///
    /// Returns `None` if the session no longer exists.
    fn apply_reply(
        store: &mut SessionStore,
        session_id: SessionId,
        reply: ChatResponse,
        delivered: bool,
    ) -> Result<Option<(MessageId, Transition)>, ChatError> {
        if !store.contains(session_id) {
            tracing::warn!(session_id = %session_id, "Session deleted before its reply arrived");
            return Ok(None);
        }

        let proposal = if delivered { reply.proposal() } else { None };
        let message = NewMessage::assistant(reply.text).with_proposal(proposal.clone());
        let reply_id = store.append_message(session_id, message)?;

        let session = store.get_mut(session_id)?;
        session.replace_workflow_path(reply.workflow_path);
        let transition = if delivered {
            session
                .confirmation_mut()
                .on_assistant_reply(reply_id, proposal.as_ref())
        } else {
            Transition::Unchanged
        };
        session.set_busy(false);
        session.draft_mut().clear();
        Ok(Some((reply_id, transition)))
    }

    // =========================================================================
    // Confirmation intents
    // =========================================================================

    /// Approve the active proposal by sending the approval phrase.
    ///
    /// The proposal is cleared when the request goes out, so a failed
    /// exchange leaves the session idle with the proposal consumed.
    pub async fn approve(&self, session_id: SessionId) -> Result<SubmitOutcome, ChatError> {
        let phrase = self.config.approval_phrase.clone();
        self.exchange(session_id, &phrase, Vec::new(), Intent::Approval).await
    }

    /// Drop the active proposal locally and seed the draft with an editing
    /// prompt. The backend is not contacted.
    pub fn modify(&self, session_id: SessionId) -> Result<ProposalPayload, ChatError> {
        let prompt = self.config.modify_prompt.clone();
        let proposal = self.with_idle_session(session_id, |session| {
            let proposal = session
                .confirmation_mut()
                .modify()
                .ok_or(ChatError::NoPendingProposal(session_id))?;
            session.draft_mut().input = prompt;
            Ok(proposal)
        })?;
        self.publish(ChatEvent::ConfirmationChanged {
            session_id,
            awaiting: false,
        });
        self.publish(ChatEvent::DraftChanged { session_id });
        Ok(proposal)
    }

    /// Discard the active proposal locally.
    pub fn dismiss(&self, session_id: SessionId) -> Result<ProposalPayload, ChatError> {
        let proposal = self.with_idle_session(session_id, |session| {
            session
                .confirmation_mut()
                .dismiss()
                .ok_or(ChatError::NoPendingProposal(session_id))
        })?;
        self.publish(ChatEvent::ConfirmationChanged {
            session_id,
            awaiting: false,
        });
        Ok(proposal)
    }
}
