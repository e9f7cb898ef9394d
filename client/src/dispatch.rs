//! Per-event dispatch: maps typed stream events to reducer actions.
//!
//! Kept free of thread state so the mapping itself stays trivially testable;
//! [`crate::panels::ChatSession`] applies the resulting actions through the
//! reducer in arrival order.

use events::ChatEvent;

use crate::state::chat::{ThreadAction, ThreadTarget};

/// How deltas are routed to threads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelMode {
    /// One thread; every delta lands on index 0.
    Single,
    /// Side-by-side comparison; `model_message` routes by `model_config_id`.
    Compare,
}

/// Result of dispatching one event.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dispatch {
    /// Reducer actions to apply, in order.
    pub actions: Vec<ThreadAction>,
    /// The exchange is finished; input can be re-enabled.
    pub finished: bool,
    /// Conversation id observed on this event, if any.
    pub conversation_id: Option<String>,
}

/// Map one event to its reducer actions and stream signals.
///
/// Unknown events dispatch to nothing; events missing expected fields were
/// already degraded to [`ChatEvent::Unknown`] at the parse boundary.
#[must_use]
pub fn dispatch_event(event: &ChatEvent, mode: PanelMode) -> Dispatch {
    match event {
        ChatEvent::Start { conversation_id } => Dispatch {
            conversation_id: conversation_id.clone(),
            ..Dispatch::default()
        },

        ChatEvent::Message { content, conversation_id } => Dispatch {
            actions: vec![ThreadAction::AppendDelta {
                target: ThreadTarget::First,
                delta: content.clone(),
            }],
            conversation_id: conversation_id.clone(),
            finished: false,
        },

        ChatEvent::ModelMessage { model_config_id, content, conversation_id } => Dispatch {
            actions: vec![ThreadAction::AppendDelta {
                target: route(mode, Some(model_config_id)),
                delta: content.clone(),
            }],
            conversation_id: conversation_id.clone(),
            finished: false,
        },

        ChatEvent::ModelEnd { model_config_id, message_length } => Dispatch {
            actions: mark_if_empty(*message_length, route(mode, model_config_id.as_deref())),
            ..Dispatch::default()
        },

        // A zero-length compare_end means the whole exchange produced
        // nothing, so every column becomes a reply exception.
        ChatEvent::CompareEnd { message_length } => Dispatch {
            actions: if *message_length == Some(0) {
                vec![ThreadAction::MarkExchangeError]
            } else {
                Vec::new()
            },
            finished: true,
            conversation_id: None,
        },

        ChatEvent::End { conversation_id, message_length } => Dispatch {
            actions: mark_if_empty(*message_length, ThreadTarget::First),
            finished: true,
            conversation_id: conversation_id.clone(),
        },

        ChatEvent::Error { message } => {
            tracing::warn!(%message, "stream reported an error");
            Dispatch {
                actions: vec![ThreadAction::MarkReplyError { target: ThreadTarget::First }],
                ..Dispatch::default()
            }
        }

        ChatEvent::Unknown => Dispatch::default(),
    }
}

fn route(mode: PanelMode, model_config_id: Option<&str>) -> ThreadTarget {
    match (mode, model_config_id) {
        (PanelMode::Compare, Some(id)) => ThreadTarget::ByModelConfig(id.to_owned()),
        _ => ThreadTarget::First,
    }
}

/// A terminal frame with zero `message_length` marks the trailing reply as a
/// reply exception; any other length leaves it alone.
fn mark_if_empty(message_length: Option<u64>, target: ThreadTarget) -> Vec<ThreadAction> {
    if message_length == Some(0) {
        vec![ThreadAction::MarkReplyError { target }]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
#[path = "dispatch_test.rs"]
mod tests;
