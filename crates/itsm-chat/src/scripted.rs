//! In-memory [`ChatBackend`] for exercising the controller without a server.
//!
//! Available to this crate's tests and, with the `test-util` feature, to
//! downstream crates' tests.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use itsm_core::types::SessionId;

use crate::attachment::RawFile;
use crate::gateway::{ChatBackend, ChatResponse, GatewayError};

/// A request captured by [`ScriptedBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub session_id: SessionId,
    pub text: String,
    pub attachment: Option<RawFile>,
}

/// In-memory [`ChatBackend`] that plays back queued results.
///
/// With no queued result it echoes the request text. When held, each request
/// waits for a [`release`](ScriptedBackend::release) before answering, which
/// lets callers observe the in-flight state.
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<ChatResponse, GatewayError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    gate: Option<Semaphore>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose requests block until released.
    pub fn held() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    pub fn push_reply(&self, reply: ChatResponse) {
        self.push_result(Ok(reply));
    }

    pub fn push_error(&self, err: GatewayError) {
        self.push_result(Err(err));
    }

    fn push_result(&self, result: Result<ChatResponse, GatewayError>) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(result);
    }

    /// Let `count` held requests proceed.
    pub fn release(&self, count: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(count);
        }
    }

    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn send(
        &self,
        session_id: SessionId,
        text: &str,
        attachment: Option<&RawFile>,
    ) -> Result<ChatResponse, GatewayError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRequest {
                session_id,
                text: text.to_string(),
                attachment: attachment.cloned(),
            });

        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| GatewayError::Transport(e.to_string()))?;
            permit.forget();
        }

        let next = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        next.unwrap_or_else(|| Ok(ChatResponse::text_only(format!("echo: {}", text))))
    }
}
