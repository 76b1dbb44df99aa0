//! Wire protocol to the assistant backend.
//!
//! One endpoint, `POST /chat`, with a multipart body:
//! - `message`: operator text (may be empty when a file is attached)
//! - `session_id`: decimal session id
//! - `file`: at most one attachment
//!
//! A 2xx reply is a JSON object with `response`, and optionally
//! `workflow_path`, `pending_confirmation` and `incident_details`. Anything
//! else becomes a [`GatewayError`], which callers turn into a synthetic
//! "Connection error" reply via [`ChatResponse::connection_error`].

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use itsm_core::config::BackendConfig;
use itsm_core::types::SessionId;

use crate::attachment::RawFile;
use crate::transcript::{ProposalPayload, ProposedFields};

// =============================================================================
// Errors
// =============================================================================

/// Failure of a single backend exchange. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

// =============================================================================
// ChatResponse
// =============================================================================

/// A parsed backend reply.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatResponse {
    pub text: String,
    pub workflow_path: Vec<String>,
    pub pending_confirmation: bool,
    pub proposed_fields: Option<ProposedFields>,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    response: String,
    #[serde(default)]
    workflow_path: Option<Vec<String>>,
    #[serde(default)]
    pending_confirmation: Option<bool>,
    #[serde(default)]
    incident_details: Option<serde_json::Map<String, serde_json::Value>>,
}

impl ChatResponse {
    /// Plain reply with no workflow path and no proposal.
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Synthetic reply standing in for a failed exchange.
    pub fn connection_error(err: &GatewayError) -> Self {
        Self::text_only(format!("Connection error: {}", err))
    }

    /// Parse a 2xx body. Absent optional keys (or `null`) take their empty
    /// values.
    pub fn from_json(body: &[u8]) -> Result<Self, GatewayError> {
        let wire: WireResponse =
            serde_json::from_slice(body).map_err(|e| GatewayError::Decode(e.to_string()))?;
        Ok(Self {
            text: wire.response,
            workflow_path: wire.workflow_path.unwrap_or_default(),
            pending_confirmation: wire.pending_confirmation.unwrap_or(false),
            proposed_fields: wire.incident_details.map(ProposedFields::from_json_object),
        })
    }

    /// The proposal this reply asks the operator to confirm.
    ///
    /// `Some` only when `pending_confirmation` is set and at least one field
    /// was proposed.
    pub fn proposal(&self) -> Option<ProposalPayload> {
        if !self.pending_confirmation {
            return None;
        }
        match &self.proposed_fields {
            Some(fields) if !fields.is_empty() => Some(ProposalPayload {
                fields: fields.clone(),
                awaiting_confirmation: true,
            }),
            _ => None,
        }
    }
}

// =============================================================================
// ChatBackend
// =============================================================================

/// Transport to the assistant backend. One call is one outbound request.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send(
        &self,
        session_id: SessionId,
        text: &str,
        attachment: Option<&RawFile>,
    ) -> Result<ChatResponse, GatewayError>;
}

/// HTTP implementation of [`ChatBackend`] using a multipart `POST`.
pub struct HttpGateway {
    http: reqwest::Client,
    chat_url: String,
}

impl HttpGateway {
    /// Build a gateway for the configured endpoint.
    ///
    /// A timeout is applied only when `timeout_secs` is set.
    pub fn new(config: &BackendConfig) -> Result<Self, GatewayError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build()?;
        Ok(Self {
            http,
            chat_url: config.chat_url(),
        })
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }
}

#[async_trait]
impl ChatBackend for HttpGateway {
    async fn send(
        &self,
        session_id: SessionId,
        text: &str,
        attachment: Option<&RawFile>,
    ) -> Result<ChatResponse, GatewayError> {
        let mut form = reqwest::multipart::Form::new()
            .text("message", text.to_string())
            .text("session_id", session_id.to_string());
        if let Some(file) = attachment {
            tracing::debug!(
                session_id = %session_id,
                file = %file.name(),
                bytes = file.byte_size(),
                "Attaching file"
            );
            let part = reqwest::multipart::Part::bytes(file.content().to_vec())
                .file_name(file.name().to_string());
            form = form.part("file", part);
        }

        tracing::debug!(session_id = %session_id, url = %self.chat_url, "Sending chat request");
        let response = self.http.post(&self.chat_url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await?;
        let parsed = ChatResponse::from_json(&body)?;
        tracing::debug!(
            session_id = %session_id,
            pending_confirmation = parsed.pending_confirmation,
            workflow_steps = parsed.workflow_path.len(),
            "Chat response received"
        );
        Ok(parsed)
    }
}
