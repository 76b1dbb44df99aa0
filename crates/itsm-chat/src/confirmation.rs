//! Propose-then-confirm state machine.
//!
//! Each session owns one [`ConfirmationWorkflow`]. The backend proposes a
//! side-effecting action (e.g. a ticket with its fields) and the workflow
//! holds that proposal until the operator approves it over the chat channel,
//! edits it, dismisses it, or the backend moves on by itself.
//!
//! States and transitions:
//! - Idle -> AwaitingConfirmation (reply carries a proposal)
//! - AwaitingConfirmation -> AwaitingConfirmation (newer proposal supersedes)
//! - AwaitingConfirmation -> Idle (reply without proposal, approve, modify,
//!   dismiss)
//!
//! There is no terminal state.

use itsm_core::types::MessageId;

use crate::transcript::ProposalPayload;

/// Where a session's confirmation flow currently stands.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ConfirmationState {
    #[default]
    Idle,
    AwaitingConfirmation {
        /// Assistant message that carried the proposal.
        message_id: MessageId,
        proposal: ProposalPayload,
    },
}

impl ConfirmationState {
    pub fn name(&self) -> &'static str {
        match self {
            ConfirmationState::Idle => "idle",
            ConfirmationState::AwaitingConfirmation { .. } => "awaiting_confirmation",
        }
    }
}

/// Why an active proposal was cleared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClearReason {
    /// A later reply came back without a pending action.
    ResolvedByBackend,
    /// The operator sent the approval phrase.
    Approved,
    /// The operator chose to edit the proposal.
    Modified,
    /// The operator discarded the proposal.
    Dismissed,
}

/// Effect of feeding one event into the workflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// No state change.
    Unchanged,
    /// Idle -> AwaitingConfirmation.
    Entered { message_id: MessageId },
    /// A newer proposal replaced the active one.
    Superseded {
        previous: MessageId,
        message_id: MessageId,
    },
    /// AwaitingConfirmation -> Idle.
    Cleared {
        message_id: MessageId,
        reason: ClearReason,
    },
}

impl Transition {
    /// Whether the awaiting/idle status flipped.
    pub fn toggles_awaiting(&self) -> bool {
        matches!(self, Transition::Entered { .. } | Transition::Cleared { .. })
    }
}

/// Per-session confirmation state machine.
#[derive(Clone, Debug, Default)]
pub struct ConfirmationWorkflow {
    state: ConfirmationState,
}

impl ConfirmationWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ConfirmationState {
        &self.state
    }

    pub fn is_awaiting(&self) -> bool {
        matches!(self.state, ConfirmationState::AwaitingConfirmation { .. })
    }

    /// The active proposal and the message that carried it, if any.
    pub fn active_proposal(&self) -> Option<(MessageId, &ProposalPayload)> {
        match &self.state {
            ConfirmationState::AwaitingConfirmation {
                message_id,
                proposal,
            } => Some((*message_id, proposal)),
            ConfirmationState::Idle => None,
        }
    }

    /// Feed an assistant reply that was appended as `message_id`.
    ///
    /// `proposal` is `Some` only when the reply asked for confirmation and
    /// carried at least one field.
    pub fn on_assistant_reply(
        &mut self,
        message_id: MessageId,
        proposal: Option<&ProposalPayload>,
    ) -> Transition {
        let previous = std::mem::take(&mut self.state);
        let transition = match (previous, proposal) {
            (ConfirmationState::Idle, None) => Transition::Unchanged,
            (ConfirmationState::Idle, Some(p)) => {
                self.state = ConfirmationState::AwaitingConfirmation {
                    message_id,
                    proposal: p.clone(),
                };
                Transition::Entered { message_id }
            }
            (
                ConfirmationState::AwaitingConfirmation {
                    message_id: previous,
                    ..
                },
                Some(p),
            ) => {
                self.state = ConfirmationState::AwaitingConfirmation {
                    message_id,
                    proposal: p.clone(),
                };
                Transition::Superseded {
                    previous,
                    message_id,
                }
            }
            (
                ConfirmationState::AwaitingConfirmation {
                    message_id: previous,
                    ..
                },
                None,
            ) => Transition::Cleared {
                message_id: previous,
                reason: ClearReason::ResolvedByBackend,
            },
        };
        log_transition(&transition);
        transition
    }

    /// Operator approved the proposal; the approval goes out as a message.
    pub fn approve(&mut self) -> Option<ProposalPayload> {
        self.clear(ClearReason::Approved)
    }

    /// Operator wants to change the proposal: drop it locally.
    ///
    /// Returns the cleared proposal, or `None` when idle.
    pub fn modify(&mut self) -> Option<ProposalPayload> {
        self.clear(ClearReason::Modified)
    }

    /// Operator discards the proposal without telling the backend.
    pub fn dismiss(&mut self) -> Option<ProposalPayload> {
        self.clear(ClearReason::Dismissed)
    }

    fn clear(&mut self, reason: ClearReason) -> Option<ProposalPayload> {
        match std::mem::take(&mut self.state) {
            ConfirmationState::AwaitingConfirmation {
                message_id,
                proposal,
            } => {
                log_transition(&Transition::Cleared { message_id, reason });
                Some(proposal)
            }
            ConfirmationState::Idle => None,
        }
    }
}

fn log_transition(transition: &Transition) {
    match transition {
        Transition::Unchanged => {}
        Transition::Entered { message_id } => {
            tracing::info!(message_id = %message_id, "Proposal awaiting confirmation");
        }
        Transition::Superseded {
            previous,
            message_id,
        } => {
            tracing::info!(
                previous = %previous,
                message_id = %message_id,
                "Proposal superseded by newer proposal"
            );
        }
        Transition::Cleared { message_id, reason } => {
            tracing::info!(message_id = %message_id, reason = ?reason, "Proposal cleared");
        }
    }
}
