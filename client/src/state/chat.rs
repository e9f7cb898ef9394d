//! Chat thread state and the pure reducer that advances it.
//!
//! SYSTEM CONTEXT
//! ==============
//! Streamed deltas and panel actions all mutate thread state through one
//! transition function, [`apply`], which takes the full previous state and an
//! action descriptor and returns a fresh thread list. The input is never
//! mutated, so callers can diff old and new state and stale captures cannot
//! corrupt it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

// =============================================================================
// DATA MODEL
// =============================================================================

/// Message author role, lowercase on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Question,
    Answer,
}

impl Role {
    /// Reply roles are the ones fed by streamed deltas.
    #[must_use]
    pub fn is_reply(self) -> bool {
        matches!(self, Self::Assistant | Self::Answer)
    }

    /// The prompt-side counterpart for a reply role.
    #[must_use]
    pub fn prompt_for(reply: Self) -> Self {
        if reply == Self::Answer { Self::Question } else { Self::User }
    }
}

/// An uploaded file attached to a user message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// One message in a thread.
///
/// `content == None` marks a reply that terminated with no output; the
/// console renders it as a reply-exception placeholder instead of an empty
/// string.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Option<String>,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<Attachment>,
}

/// One comparison column: a message list bound to one model or one cluster
/// execution. Single-thread views use exactly one.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatThread {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_config_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_parameters: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub list: Vec<ChatMessage>,
}

// =============================================================================
// REDUCER
// =============================================================================

/// Which thread an action addresses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ThreadTarget {
    /// Match on `model_config_id` equality (compare mode).
    ByModelConfig(String),
    /// Index 0 (single-thread and cluster mode).
    First,
}

/// Resolve a target to a thread index.
#[must_use]
pub fn resolve(threads: &[ChatThread], target: &ThreadTarget) -> Option<usize> {
    match target {
        ThreadTarget::ByModelConfig(id) => threads
            .iter()
            .position(|t| t.model_config_id.as_deref() == Some(id.as_str())),
        ThreadTarget::First => {
            if threads.is_empty() { None } else { Some(0) }
        }
    }
}

/// Index of the trailing reply-role message in a thread, if any.
#[must_use]
pub fn trailing_reply(thread: &ChatThread) -> Option<usize> {
    thread.list.iter().rposition(|m| m.role.is_reply())
}

/// A state transition over the thread list.
#[derive(Clone, Debug, PartialEq)]
pub enum ThreadAction {
    /// Optimistic push of a user message plus an empty reply placeholder into
    /// every thread, ahead of the network call.
    PushExchange {
        content: String,
        files: Vec<Attachment>,
        reply_role: Role,
        created_at: i64,
    },

    /// Append a streamed delta to the target thread's trailing reply.
    AppendDelta { target: ThreadTarget, delta: String },

    /// Mark the target thread's trailing reply as a reply exception.
    MarkReplyError { target: ThreadTarget },

    /// Mark the trailing reply of every thread as a reply exception. Used
    /// when the whole exchange fails rather than one column.
    MarkExchangeError,

    /// Record the conversation id minted by the server. One stream mints one
    /// conversation, so it lands on every thread.
    SetConversationId { conversation_id: String },
}

/// Apply one action, returning a new thread list.
///
/// The input is never mutated. Actions with no valid target (unknown model
/// config id, no trailing reply) return the input unchanged as a fresh copy.
#[must_use]
pub fn apply(threads: &[ChatThread], action: &ThreadAction) -> Vec<ChatThread> {
    let mut next = threads.to_vec();
    match action {
        ThreadAction::PushExchange { content, files, reply_role, created_at } => {
            for thread in &mut next {
                thread.list.push(ChatMessage {
                    role: Role::prompt_for(*reply_role),
                    content: Some(content.clone()),
                    created_at: *created_at,
                    files: files.clone(),
                });
                thread.list.push(ChatMessage {
                    role: *reply_role,
                    content: Some(String::new()),
                    created_at: *created_at,
                    files: Vec::new(),
                });
            }
        }
        ThreadAction::AppendDelta { target, delta } => {
            if let Some(index) = resolve(threads, target) {
                if let Some(message_index) = trailing_reply(&next[index]) {
                    let message = &mut next[index].list[message_index];
                    let mut content = message.content.take().unwrap_or_default();
                    content.push_str(delta);
                    message.content = Some(content);
                }
            }
        }
        ThreadAction::MarkReplyError { target } => {
            if let Some(index) = resolve(threads, target) {
                if let Some(message_index) = trailing_reply(&next[index]) {
                    next[index].list[message_index].content = None;
                }
            }
        }
        ThreadAction::MarkExchangeError => {
            for thread in &mut next {
                if let Some(message_index) = trailing_reply(thread) {
                    thread.list[message_index].content = None;
                }
            }
        }
        ThreadAction::SetConversationId { conversation_id } => {
            for thread in &mut next {
                thread.conversation_id = Some(conversation_id.clone());
            }
        }
    }
    next
}

/// Current time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(duration) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(duration.as_millis()).unwrap_or(0)
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
