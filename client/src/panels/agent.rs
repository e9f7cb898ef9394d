//! Single-agent debug chat panel.

use serde::Serialize;
use serde_json::{json, Value};

use crate::dispatch::PanelMode;
use crate::error::ClientError;
use crate::state::chat::{Attachment, ChatThread, Role};
use crate::transport::{Backend, StreamRequest};

use super::session::{pump_stream, ChatSession, PanelEvent};

/// Editable agent configuration persisted before each test run, so the run
/// always executes the config the user sees.
#[derive(Clone, Debug, Serialize)]
pub struct AgentDraft {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_config_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_parameters: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub knowledge_base_ids: Vec<String>,
}

/// Debug chat against one agent's draft configuration.
pub struct AgentChatPanel<B: Backend> {
    backend: B,
    agent_id: String,
    session: ChatSession,
}

impl<B: Backend> AgentChatPanel<B> {
    pub fn new(backend: B, agent_id: impl Into<String>) -> Self {
        Self {
            backend,
            agent_id: agent_id.into(),
            session: ChatSession::new(
                PanelMode::Single,
                Role::Assistant,
                vec![ChatThread::default()],
            ),
        }
    }

    #[must_use]
    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ChatSession {
        &mut self.session
    }

    /// Persist the draft, then run it with the new message and stream the
    /// reply into the session.
    ///
    /// # Errors
    ///
    /// Returns an error when a send is already in flight, when the draft
    /// cannot be saved, or when the stream fails mid-reply. In the latter two
    /// cases the staged reply is marked as a reply exception.
    pub async fn send(
        &mut self,
        draft: &AgentDraft,
        message: &str,
        files: Vec<Attachment>,
        notify: &mut dyn FnMut(PanelEvent),
    ) -> Result<(), ClientError> {
        let ticket = self.session.begin(message, files.clone())?;

        let draft_path = format!("/api/agents/{}/draft", self.agent_id);
        let draft_body = serde_json::to_value(draft)?;
        if let Err(error) = self.backend.save_draft(&draft_path, &draft_body).await {
            self.session.fail(ticket, notify);
            return Err(error);
        }

        let request = StreamRequest {
            path: format!("/api/agents/{}/draft/run", self.agent_id),
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
#[path = "agent_test.rs"]
mod tests;
