//! Line-oriented console driving a [`ChatController`].
//!
//! Plain text is appended to the current session's draft and sent. Lines
//! starting with `/` are commands. Sends run as spawned tasks, so the prompt
//! stays usable while a reply is pending; replies are printed from the
//! controller's event stream.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};

use itsm_chat::{ChatController, ChatError, QuickAction, RawFile, SubmitOutcome};
use itsm_core::events::ChatEvent;
use itsm_core::types::{Author, SessionId};

use crate::render;

pub const HELP: &str = "\
Commands:
  <text>               add text to the draft and send it
  /send                send the draft as it is (e.g. attachments only)
  /new                 start a new session
  /list                list sessions
  /switch <id>         make another session current
  /rename <id> <name>  rename a session
  /delete <id>         delete a session
  /attach <path>...    add files to the draft
  /detach <index>      remove a file from the draft
  /approve             approve the proposed details
  /modify              drop the proposal and edit it
  /dismiss             drop the proposal
  /incident            start a new-incident message
  /resolution          start a resolution-steps message
  /show                show the current session
  /help                show this help
  /quit                exit";

// =============================================================================
// Parsing
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Say(String),
    Send,
    New,
    List,
    Switch(SessionId),
    Rename(SessionId, String),
    Delete(SessionId),
    Attach(Vec<PathBuf>),
    Detach(usize),
    Approve,
    Modify,
    Dismiss,
    Incident,
    Resolution,
    Show,
    Help,
    Quit,
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command: /{0} (try /help)")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(Command::Say(line.to_string())));
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    let command = match name {
        "send" => Command::Send,
        "new" => Command::New,
        "list" => Command::List,
        "switch" => Command::Switch(
            args.parse()
                .map_err(|_| CommandError::Usage("/switch <id>"))?,
        ),
        "rename" => {
            let (id, new_name) = args
                .split_once(char::is_whitespace)
                .ok_or(CommandError::Usage("/rename <id> <name>"))?;
            let id = id
                .parse()
                .map_err(|_| CommandError::Usage("/rename <id> <name>"))?;
            Command::Rename(id, new_name.trim().to_string())
        }
        "delete" => Command::Delete(
            args.parse()
                .map_err(|_| CommandError::Usage("/delete <id>"))?,
        ),
        "attach" => {
            let paths: Vec<PathBuf> = args.split_whitespace().map(PathBuf::from).collect();
            if paths.is_empty() {
                return Err(CommandError::Usage("/attach <path>..."));
            }
            Command::Attach(paths)
        }
        "detach" => Command::Detach(
            args.parse()
                .map_err(|_| CommandError::Usage("/detach <index>"))?,
        ),
        "approve" => Command::Approve,
        "modify" => Command::Modify,
        "dismiss" => Command::Dismiss,
        "incident" => Command::Incident,
        "resolution" => Command::Resolution,
        "show" => Command::Show,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

// =============================================================================
// Execution
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Console {
    controller: Arc<ChatController>,
}

impl Console {
    pub fn new(controller: Arc<ChatController>) -> Self {
        Self { controller }
    }

    pub async fn execute(&self, command: Command) -> Result<Flow, ChatError> {
        let current = self.controller.current_session()?;
        match command {
            Command::Say(text) => {
                let input = self
                    .controller
                    .with_session(current, |s| s.draft().input.clone())?;
                self.controller
                    .set_input(current, &format!("{}{}", input, text))?;
                self.spawn_send(current);
            }
            Command::Send => self.spawn_send(current),
            Command::New => {
                let id = self.controller.create_session()?;
                self.show(id)?;
            }
            Command::List => println!("{}", render::session_list(&self.controller.sessions()?)),
            Command::Switch(id) => {
                self.controller.select_session(id)?;
                self.show(id)?;
            }
            Command::Rename(id, name) => {
                if !self.controller.rename_session(id, &name)? {
                    println!("Name unchanged.");
                }
            }
            Command::Delete(id) => {
                self.controller.delete_session(id)?;
                let now = self.controller.current_session()?;
                if now != current {
                    self.show(now)?;
                }
            }
            Command::Attach(paths) => {
                let mut files = Vec::with_capacity(paths.len());
                for path in paths {
                    match RawFile::from_path(&path).await {
                        Ok(file) => files.push(file),
                        Err(e) => println!("! {}: {}", path.display(), e),
                    }
                }
                let offered = files.len();
                let rejected = self.controller.select_files(current, files)?;
                println!("Attached {} file(s).", offered - rejected.len());
            }
            Command::Detach(index) => {
                let removed = self.controller.remove_file(current, index)?;
                println!("Removed {}.", removed.name());
            }
            Command::Approve => self.spawn_approve(current),
            Command::Modify => {
                self.controller.modify(current)?;
                self.print_draft_prompt(current)?;
            }
            Command::Dismiss => {
                self.controller.dismiss(current)?;
                println!("Proposal dismissed.");
            }
            Command::Incident => {
                self.controller
                    .apply_quick_action(current, QuickAction::NewIncident)?;
                self.print_draft_prompt(current)?;
            }
            Command::Resolution => {
                self.controller
                    .apply_quick_action(current, QuickAction::GetResolution)?;
                self.print_draft_prompt(current)?;
            }
            Command::Show => self.show(current)?,
            Command::Help => println!("{}", HELP),
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    /// Print a session's transcript, workflow path and draft.
    pub fn show(&self, session_id: SessionId) -> Result<(), ChatError> {
        println!("{}", self.session_text(session_id)?);
        Ok(())
    }

    fn session_text(&self, session_id: SessionId) -> Result<String, ChatError> {
        self.controller.with_session(session_id, |s| {
            let mut out = format!("== {} ({}) ==", s.display_name(), s.id());
            for message in s.transcript().messages() {
                out.push('\n');
                out.push_str(&render::message(message, s.is_active_proposal(message.id)));
            }
            if !s.workflow_path().is_empty() {
                out.push_str(&format!("\nWorkflow: {}", s.workflow_path_label()));
            }
            let draft = s.draft();
            if !draft.input.is_empty() {
                out.push_str(&format!("\nDraft: {}", draft.input));
            }
            for (i, file) in draft.files().iter().enumerate() {
                out.push_str(&format!("\nDraft file [{}]: {}", i, file.name()));
            }
            if s.is_busy() {
                out.push_str("\n(waiting for the assistant)");
            }
            out
        })
    }

    fn print_draft_prompt(&self, session_id: SessionId) -> Result<(), ChatError> {
        let input = self
            .controller
            .with_session(session_id, |s| s.draft().input.clone())?;
        println!("Draft: \"{}\" (type the rest and press Enter)", input);
        Ok(())
    }

    fn spawn_send(&self, session_id: SessionId) {
        let controller = Arc::clone(&self.controller);
        tokio::spawn(async move {
            report_outcome(controller.send_draft(session_id).await);
        });
    }

    fn spawn_approve(&self, session_id: SessionId) {
        let controller = Arc::clone(&self.controller);
        tokio::spawn(async move {
            report_outcome(controller.approve(session_id).await);
        });
    }
}

fn report_outcome(outcome: Result<SubmitOutcome, ChatError>) {
    match outcome {
        Ok(SubmitOutcome::Ignored { rejected }) if rejected.is_empty() => {
            println!("Nothing to send.")
        }
        Ok(_) => {}
        Err(e) => println!("! {}", e),
    }
}

// =============================================================================
// Event printer
// =============================================================================

/// Print assistant replies and warnings as they are published.
pub async fn print_events(
    controller: Arc<ChatController>,
    mut events: broadcast::Receiver<ChatEvent>,
) {
    loop {
        match events.recv().await {
            Ok(event) => print_event(&controller, &event),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Console fell behind on chat events");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn print_event(controller: &ChatController, event: &ChatEvent) {
    match event {
        ChatEvent::MessageAppended {
            session_id,
            message_id,
            author: Author::Assistant,
        } => {
            let rendered = controller.with_session(*session_id, |s| {
                s.transcript()
                    .get(*message_id)
                    .map(|m| {
                        let text = render::message(m, s.is_active_proposal(m.id));
                        (s.display_name().to_string(), text)
                    })
            });
            if let Ok(Some((name, text))) = rendered {
                if controller.current_session().ok() == Some(*session_id) {
                    println!("{}", text);
                } else {
                    println!("<{}> {}", name, text);
                }
            }
        }
        ChatEvent::AttachmentsRejected { file_names, .. } => {
            for name in file_names {
                println!("! {} is empty (0 bytes) and was not attached", name);
            }
        }
        _ => {}
    }
}
