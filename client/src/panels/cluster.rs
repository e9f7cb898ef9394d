//! Multi-agent cluster debug chat panel.
//!
//! Clusters orchestrate several agents server-side; the panel sees a single
//! merged reply stream, so it runs one thread with index-0 targeting.

use serde_json::{json, Value};

use crate::dispatch::PanelMode;
use crate::error::ClientError;
use crate::state::chat::{ChatThread, Role};
use crate::transport::{Backend, StreamRequest};

use super::session::{pump_stream, ChatSession, PanelEvent};

pub struct ClusterChatPanel<B: Backend> {
    backend: B,
    cluster_id: String,
    session: ChatSession,
}

impl<B: Backend> ClusterChatPanel<B> {
    pub fn new(backend: B, cluster_id: impl Into<String>) -> Self {
        Self {
            backend,
            cluster_id: cluster_id.into(),
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

    /// Persist the cluster draft, then run it with the new message.
    ///
    /// # Errors
    ///
    /// Returns an error when a send is already in flight, when the draft
    /// cannot be saved, or when the stream fails mid-reply.
    pub async fn send(
        &mut self,
        draft: &Value,
        message: &str,
        notify: &mut dyn FnMut(PanelEvent),
    ) -> Result<(), ClientError> {
        let ticket = self.session.begin(message, Vec::new())?;

        let draft_path = format!("/api/clusters/{}/draft", self.cluster_id);
        if let Err(error) = self.backend.save_draft(&draft_path, draft).await {
            self.session.fail(ticket, notify);
            return Err(error);
        }

        let request = StreamRequest {
            path: format!("/api/clusters/{}/run", self.cluster_id),
            body: json!({
                "message": message,
                "conversation_id": self.session.conversation_id(),
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
#[path = "cluster_test.rs"]
mod tests;
