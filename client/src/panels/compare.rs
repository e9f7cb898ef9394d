//! Side-by-side model comparison panel.
//!
//! One prompt fans out to up to four model configs over a single stream;
//! `model_message` frames carry the column they belong to.

use serde_json::json;

use crate::dispatch::PanelMode;
use crate::error::ClientError;
use crate::state::chat::{ChatThread, Role};
use crate::transport::{Backend, StreamRequest};

use super::session::{pump_stream, ChatSession, PanelEvent};

pub const MAX_COMPARE_COLUMNS: usize = 4;

/// One comparison column.
#[derive(Clone, Debug)]
pub struct CompareColumn {
    pub model_config_id: String,
    pub label: Option<String>,
    pub model_parameters: Option<serde_json::Value>,
}

/// Compare chat fanning one prompt out across model configs.
pub struct ModelComparePanel<B: Backend> {
    backend: B,
    agent_id: String,
    model_config_ids: Vec<String>,
    session: ChatSession,
}

impl<B: Backend> ModelComparePanel<B> {
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidCompareColumns`] for an empty column
    /// list or more than [`MAX_COMPARE_COLUMNS`] columns.
    pub fn new(
        backend: B,
        agent_id: impl Into<String>,
        columns: Vec<CompareColumn>,
    ) -> Result<Self, ClientError> {
        if columns.is_empty() || columns.len() > MAX_COMPARE_COLUMNS {
            return Err(ClientError::InvalidCompareColumns { count: columns.len() });
        }

        let model_config_ids: Vec<String> =
            columns.iter().map(|c| c.model_config_id.clone()).collect();
        let threads: Vec<ChatThread> = columns
            .into_iter()
            .map(|column| ChatThread {
                label: column.label,
                model_config_id: Some(column.model_config_id),
                model_parameters: column.model_parameters,
                conversation_id: None,
                list: Vec::new(),
            })
            .collect();

        Ok(Self {
            backend,
            agent_id: agent_id.into(),
            model_config_ids,
            session: ChatSession::new(PanelMode::Compare, Role::Assistant, threads),
        })
    }

    #[must_use]
    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    /// Send one prompt to every column and demultiplex the shared stream.
    ///
    /// # Errors
    ///
    /// Returns an error when a send is already in flight or the stream fails.
    pub async fn send(
        &mut self,
        message: &str,
        notify: &mut dyn FnMut(PanelEvent),
    ) -> Result<(), ClientError> {
        let ticket = self.session.begin(message, Vec::new())?;

        let request = StreamRequest {
            path: format!("/api/agents/{}/compare/run", self.agent_id),
            body: json!({
                "message": message,
                "model_config_ids": self.model_config_ids,
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
#[path = "compare_test.rs"]
mod tests;
