//! Plain-text rendering of transcripts and session lists.

use itsm_chat::{Message, SessionSummary};
use itsm_core::types::Author;

fn author_label(author: Author) -> &'static str {
    match author {
        Author::Operator => "You",
        Author::Assistant => "Assistant",
    }
}

/// One message with its attachments and any proposed fields.
///
/// `awaiting` asks for the confirmation prompt; only the session's active
/// proposal should get one.
pub fn message(message: &Message, awaiting: bool) -> String {
    let mut out = format!(
        "[{}] {}: {}",
        message.timestamp.clock_label(),
        author_label(message.author),
        message.body
    );
    for attachment in &message.attachments {
        out.push_str(&format!(
            "\n    attached: {} ({})",
            attachment.name(),
            attachment.size_label()
        ));
    }
    if let Some(proposal) = &message.proposal {
        out.push_str("\n    Proposed details:");
        for (name, value) in proposal.fields.iter() {
            out.push_str(&format!("\n      {}: {}", name, value));
        }
        if awaiting {
            out.push_str("\n    /approve, /modify or /dismiss");
        }
    }
    out
}

/// Session list, one line per session, current one starred.
pub fn session_list(sessions: &[SessionSummary]) -> String {
    sessions
        .iter()
        .map(|s| {
            let mut line = format!(
                "{} {:>3}  {}  ({} messages)",
                if s.current { "*" } else { " " },
                s.id.0,
                s.display_name,
                s.message_count
            );
            if s.busy {
                line.push_str("  [waiting]");
            }
            if s.awaiting_confirmation {
                line.push_str("  [confirm]");
            }
            if !s.workflow_path.is_empty() {
                line.push_str(&format!("  {}", s.workflow_path.join(" \u{2192} ")));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use itsm_chat::{AttachmentRef, ProposalPayload, ProposedFields};
    use itsm_core::types::{MessageId, SessionId, Timestamp};

    fn message_at_midnight(author: Author, body: &str) -> Message {
        Message {
            id: MessageId(1),
            author,
            body: body.to_string(),
            attachments: Vec::new(),
            timestamp: Timestamp(0),
            proposal: None,
        }
    }

    #[test]
    fn test_operator_message_with_attachment() {
        let mut msg = message_at_midnight(Author::Operator, "Disk full on db01");
        msg.attachments
            .push(AttachmentRef::new("df.txt", 2048).unwrap());
        assert_eq!(
            message(&msg, false),
            "[00:00:00] You: Disk full on db01\n    attached: df.txt (2.0KB)"
        );
    }

    #[test]
    fn test_proposal_lists_fields_in_order() {
        let mut msg = message_at_midnight(Author::Assistant, "Please confirm.");
        msg.proposal = Some(ProposalPayload {
            fields: ProposedFields::new(vec![
                ("short_description".into(), "Disk full".into()),
                ("priority".into(), "High".into()),
            ]),
            awaiting_confirmation: true,
        });
        let text = message(&msg, true);
        let short = text.find("short_description: Disk full").unwrap();
        let priority = text.find("priority: High").unwrap();
        assert!(short < priority);
        assert!(text.ends_with("/approve, /modify or /dismiss"));
    }

    #[test]
    fn test_superseded_proposal_has_no_prompt() {
        let mut msg = message_at_midnight(Author::Assistant, "Please confirm.");
        msg.proposal = Some(ProposalPayload {
            fields: ProposedFields::new(vec![("priority".into(), "High".into())]),
            awaiting_confirmation: true,
        });
        let text = message(&msg, false);
        assert!(text.ends_with("priority: High"));
        assert!(!text.contains("/approve"));
    }

    #[test]
    fn test_session_list_marks_current_and_flags() {
        let sessions = vec![
            SessionSummary {
                id: SessionId(1),
                display_name: "ITSM Assistant".into(),
                message_count: 3,
                last_activity: Timestamp(0),
                workflow_path: vec!["classify".into(), "create".into()],
                busy: false,
                awaiting_confirmation: true,
                current: false,
            },
            SessionSummary {
                id: SessionId(2),
                display_name: "ITSM Chat 2".into(),
                message_count: 1,
                last_activity: Timestamp(0),
                workflow_path: Vec::new(),
                busy: true,
                awaiting_confirmation: false,
                current: true,
            },
        ];
        let lines: Vec<String> = session_list(&sessions)
            .lines()
            .map(str::to_string)
            .collect();
        assert_eq!(
            lines[0],
            "    1  ITSM Assistant  (3 messages)  [confirm]  classify \u{2192} create"
        );
        assert_eq!(lines[1], "*   2  ITSM Chat 2  (1 messages)  [waiting]");
    }
}
