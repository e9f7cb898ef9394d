//! End-user conversation panel.
//!
//! Unlike the debug panels this one speaks as a platform end user, so
//! exchanges use the question/answer role pair and no draft is persisted.

use serde_json::json;

use crate::dispatch::PanelMode;
use crate::error::ClientError;
use crate::state::chat::{Attachment, ChatThread, Role};
use crate::transport::{Backend, StreamRequest};

use super::session::{pump_stream, ChatSession, PanelEvent};

pub struct ConversationPanel<B: Backend> {
    backend: B,
    agent_id: String,
    session: ChatSession,
}

impl<B: Backend> ConversationPanel<B> {
    pub fn new(backend: B, agent_id: impl Into<String>) -> Self {
        Self {
            backend,
            agent_id: agent_id.into(),
            session: ChatSession::new(
                PanelMode::Single,
                Role::Answer,
                vec![ChatThread::default()],
            ),
        }
    }

    #[must_use]
    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    /// Resume a conversation picked from the history list.
    pub fn resume(&mut self, conversation_id: impl Into<String>) {
        self.session.set_conversation_id(conversation_id);
    }

    /// The history list needs a refresh when this returns true.
    pub fn take_history_stale(&mut self) -> bool {
        self.session.take_history_stale()
    }

    /// # Errors
    ///
    /// Returns an error when a send is already in flight or the stream fails.
    pub async fn send(
        &mut self,
        message: &str,
        files: Vec<Attachment>,
        notify: &mut dyn FnMut(PanelEvent),
    ) -> Result<(), ClientError> {
        let ticket = self.session.begin(message, files.clone())?;

        let request = StreamRequest {
            path: format!("/api/agents/{}/conversations/chat", self.agent_id),
            body: json!({
                "message": message,
                "conversation_id": self.session.conversation_id(),
                "files": files,
            }),
        };
        let stream = match self.backend.open_stream(&request).await {
            Ok(stream) => stream,
            Err(error) => {
                self.session.fail(ticket, notify);
                return Err(error);
            }
        };

        pump_stream(&mut self.session, ticket, stream, notify).await
    }
}

#[cfg(test)]
#[path = "conversation_test.rs"]
mod tests;
