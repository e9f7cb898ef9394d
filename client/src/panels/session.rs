//! Shared streaming session used by every chat panel.
//!
//! A session owns the thread state, the frame parser, and the single-flight
//! guard. Panels call [`ChatSession::begin`] to stage an exchange, pipe the
//! response body through [`pump_stream`], and read the updated threads back
//! out. Each `begin` mints a ticket; frames arriving under an older ticket
//! belong to an aborted exchange and are dropped.

use events::{ChatEvent, SseParser, StreamFrame};
use futures::StreamExt;

use crate::dispatch::{dispatch_event, PanelMode};
use crate::error::ClientError;
use crate::state::chat::{
    apply, now_ms, resolve, trailing_reply, Attachment, ChatThread, Role, ThreadAction,
};
use crate::transport::ByteStream;

/// Incremental notifications emitted while a stream is applied.
#[derive(Clone, Debug, PartialEq)]
pub enum PanelEvent {
    /// A delta landed on the thread at `thread_index`.
    Delta { thread_index: usize, delta: String },
    /// The trailing reply of the thread at `thread_index` became a reply
    /// exception.
    ReplyError { thread_index: usize },
    /// The server minted a conversation id for this exchange.
    ConversationMinted(String),
    /// The exchange finished; input is re-enabled.
    Finished,
}

/// Streaming chat state shared by the panel controllers.
pub struct ChatSession {
    mode: PanelMode,
    reply_role: Role,
    parser: SseParser,
    threads: Vec<ChatThread>,
    conversation_id: Option<String>,
    history_stale: bool,
    loading: bool,
    finished: bool,
    ticket: u64,
}

impl ChatSession {
    #[must_use]
    pub fn new(mode: PanelMode, reply_role: Role, threads: Vec<ChatThread>) -> Self {
        Self {
            mode,
            reply_role,
            parser: SseParser::default(),
            threads,
            conversation_id: None,
            history_stale: false,
            loading: false,
            finished: false,
            ticket: 0,
        }
    }

    #[must_use]
    pub fn threads(&self) -> &[ChatThread] {
        &self.threads
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub fn finished(&self) -> bool {
        self.finished
    }

    #[must_use]
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Resume an existing conversation, e.g. when reopening from history.
    pub fn set_conversation_id(&mut self, conversation_id: impl Into<String>) {
        let conversation_id = conversation_id.into();
        self.threads = apply(
            &self.threads,
            &ThreadAction::SetConversationId { conversation_id: conversation_id.clone() },
        );
        self.conversation_id = Some(conversation_id);
    }

    /// True once per newly minted conversation; the caller refreshes its
    /// history list when it reads `true`.
    pub fn take_history_stale(&mut self) -> bool {
        std::mem::take(&mut self.history_stale)
    }

    /// Stage a new exchange: push the user message and reply placeholders and
    /// mint a ticket for the stream that will feed them.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::RequestInFlight`] while a previous exchange is
    /// still streaming.
    pub fn begin(&mut self, content: &str, files: Vec<Attachment>) -> Result<u64, ClientError> {
        if self.loading {
            return Err(ClientError::RequestInFlight);
        }
        self.ticket += 1;
        self.loading = true;
        self.finished = false;
        self.parser = SseParser::default();
        self.threads = apply(
            &self.threads,
            &ThreadAction::PushExchange {
                content: content.to_owned(),
                files,
                reply_role: self.reply_role,
                created_at: now_ms(),
            },
        );
        Ok(self.ticket)
    }

    /// Feed one body chunk through the parser and apply every complete frame.
    pub fn apply_chunk(
        &mut self,
        ticket: u64,
        chunk: &[u8],
        notify: &mut dyn FnMut(PanelEvent),
    ) {
        if ticket != self.ticket {
            tracing::debug!(ticket, current = self.ticket, "dropping stale stream chunk");
            return;
        }
        for frame in self.parser.push_chunk(chunk) {
            self.apply_frame(&frame, notify);
        }
    }

    /// Flush the parser and release the single-flight guard.
    pub fn finish_stream(&mut self, ticket: u64, notify: &mut dyn FnMut(PanelEvent)) {
        if ticket != self.ticket {
            return;
        }
        if let Some(frame) = self.parser.finish() {
            self.apply_frame(&frame, notify);
        }
        self.loading = false;
    }

    /// Release the guard after a transport failure. The failure takes down
    /// the whole exchange, so every thread's trailing reply is marked.
    pub fn fail(&mut self, ticket: u64, notify: &mut dyn FnMut(PanelEvent)) {
        if ticket != self.ticket {
            return;
        }
        self.mark_exchange_failed(notify);
        self.loading = false;
    }

    fn mark_exchange_failed(&mut self, notify: &mut dyn FnMut(PanelEvent)) {
        let landed: Vec<usize> = self
            .threads
            .iter()
            .enumerate()
            .filter_map(|(index, thread)| trailing_reply(thread).map(|_| index))
            .collect();
        self.threads = apply(&self.threads, &ThreadAction::MarkExchangeError);
        for thread_index in landed {
            notify(PanelEvent::ReplyError { thread_index });
        }
    }

    /// Invalidate the current ticket so in-flight frames are dropped.
    pub fn abort(&mut self) {
        self.ticket += 1;
        self.loading = false;
    }

    fn apply_frame(&mut self, frame: &StreamFrame, notify: &mut dyn FnMut(PanelEvent)) {
        let event = ChatEvent::from_frame(frame);
        let dispatch = dispatch_event(&event, self.mode);

        for action in &dispatch.actions {
            if matches!(action, ThreadAction::MarkExchangeError) {
                self.mark_exchange_failed(notify);
                continue;
            }
            // The landing index must be resolved against the state the action
            // applies to, before the reducer replaces it.
            let landed = match action {
                ThreadAction::AppendDelta { target, .. }
                | ThreadAction::MarkReplyError { target } => resolve(&self.threads, target),
                _ => None,
            };
            self.threads = apply(&self.threads, action);
            match (action, landed) {
                (ThreadAction::AppendDelta { delta, .. }, Some(thread_index)) => {
                    notify(PanelEvent::Delta { thread_index, delta: delta.clone() });
                }
                (ThreadAction::MarkReplyError { .. }, Some(thread_index)) => {
                    notify(PanelEvent::ReplyError { thread_index });
                }
                _ => {}
            }
        }

        if let Some(conversation_id) = dispatch.conversation_id {
            if self.conversation_id.as_deref() != Some(conversation_id.as_str()) {
                self.threads = apply(
                    &self.threads,
                    &ThreadAction::SetConversationId { conversation_id: conversation_id.clone() },
                );
                self.conversation_id = Some(conversation_id.clone());
                self.history_stale = true;
                notify(PanelEvent::ConversationMinted(conversation_id));
            }
        }

        if dispatch.finished {
            self.finished = true;
            self.loading = false;
            notify(PanelEvent::Finished);
        }
    }
}

/// Drain a response body into the session until it ends or fails.
pub(crate) async fn pump_stream(
    session: &mut ChatSession,
    ticket: u64,
    mut stream: ByteStream,
    notify: &mut dyn FnMut(PanelEvent),
) -> Result<(), ClientError> {
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => session.apply_chunk(ticket, &bytes, notify),
            Err(error) => {
                session.fail(ticket, notify);
                return Err(error);
            }
        }
    }
    session.finish_stream(ticket, notify);
    Ok(())
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
