//! Prompt-optimization assistant.
//!
//! Streams a rewritten system prompt into a plain text buffer rather than a
//! chat thread; the caller decides whether to accept the result.

use futures::StreamExt;
use serde_json::json;

use crate::error::ClientError;
use crate::transport::{Backend, StreamRequest};

use events::{ChatEvent, SseParser, StreamFrame};

/// A chunk of optimized prompt text as it streams in.
#[derive(Clone, Debug, PartialEq)]
pub enum PromptEvent {
    Delta(String),
    Finished,
}

pub struct PromptAssistantPanel<B: Backend> {
    backend: B,
    buffer: String,
    loading: bool,
}

impl<B: Backend> PromptAssistantPanel<B> {
    pub fn new(backend: B) -> Self {
        Self { backend, buffer: String::new(), loading: false }
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.loading
    }

    /// Text accumulated by the last optimization run.
    #[must_use]
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Rewrite `current_prompt` per `instruction`, returning the full
    /// optimized text once the stream ends.
    ///
    /// # Errors
    ///
    /// Returns an error when a run is already in flight, when the server
    /// reports an optimization error mid-stream, or when transport fails.
    pub async fn optimize(
        &mut self,
        current_prompt: &str,
        instruction: &str,
        notify: &mut dyn FnMut(PromptEvent),
    ) -> Result<String, ClientError> {
        if self.loading {
            return Err(ClientError::RequestInFlight);
        }
        self.loading = true;
        self.buffer.clear();

        let result = self.run(current_prompt, instruction, notify).await;
        self.loading = false;
        result?;
        Ok(self.buffer.clone())
    }

    async fn run(
        &mut self,
        current_prompt: &str,
        instruction: &str,
        notify: &mut dyn FnMut(PromptEvent),
    ) -> Result<(), ClientError> {
        let request = StreamRequest {
            path: "/api/prompt/optimize".to_owned(),
            body: json!({
                "prompt": current_prompt,
                "instruction": instruction,
            }),
        };
        let mut stream = self.backend.open_stream(&request).await?;

        let mut parser = SseParser::new();
        let mut failure: Option<String> = None;
        while let Some(chunk) = stream.next().await {
            for frame in parser.push_chunk(&chunk?) {
                self.accept(&frame, &mut failure, notify);
            }
        }
        if let Some(frame) = parser.finish() {
            self.accept(&frame, &mut failure, notify);
        }

        match failure {
            Some(message) => Err(ClientError::Stream(message)),
            None => Ok(()),
        }
    }

    fn accept(
        &mut self,
        frame: &StreamFrame,
        failure: &mut Option<String>,
        notify: &mut dyn FnMut(PromptEvent),
    ) {
        match ChatEvent::from_frame(frame) {
            ChatEvent::Start { .. } => self.buffer.clear(),
            ChatEvent::Message { content, .. } => {
                self.buffer.push_str(&content);
                notify(PromptEvent::Delta(content));
            }
            ChatEvent::Error { message } => {
                tracing::warn!(%message, "prompt optimization failed");
                *failure = Some(message);
            }
            ChatEvent::End { .. } => notify(PromptEvent::Finished),
            _ => {}
        }
    }
}

#[cfg(test)]
#[path = "prompt_test.rs"]
mod tests;
