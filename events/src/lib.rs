//! Shared stream-event model for the platform's SSE chat endpoints.
//!
//! This crate owns the wire representation consumed by both the `client`
//! library and the console binary. Frame payloads stay flexible
//! (`serde_json::Value`); typed validation happens at the dispatch boundary
//! via [`ChatEvent::from_frame`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event name assumed for `data:` lines seen before any `event:` line.
pub const DEFAULT_EVENT: &str = "message";

/// One parsed `(event, data)` unit extracted from a streaming response chunk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreamFrame {
    /// Event name from the most recent `event:` line.
    pub event: String,
    /// JSON payload from one `data:` line.
    pub data: Value,
}

// =============================================================================
// PARSER
// =============================================================================

/// Incremental parser for `text/event-stream`-shaped response bodies.
///
/// Feed raw body chunks with [`SseParser::push_chunk`]; each call yields the
/// frames completed by that chunk. Lines beginning with `event:` set the
/// current event name; lines beginning with `data:` yield one frame tagged
/// with that name. Blank-line framing is accepted but not required.
///
/// A trailing partial line is carried across chunk boundaries, so a frame
/// split by the network parses once the remainder arrives. Call
/// [`SseParser::finish`] after the stream ends to flush an unterminated
/// final line.
///
/// A `data:` line whose payload is not valid JSON is logged and dropped; it
/// never surfaces as an error to the caller.
#[derive(Debug, Default)]
pub struct SseParser {
    event: Option<String>,
    carry: Vec<u8>,
}

impl SseParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw body chunk, returning the frames it completed.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<StreamFrame> {
        self.carry.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.carry.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.carry.drain(..=pos).collect();
            if let Some(frame) = self.accept_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flush a final line left unterminated when the stream ended.
    pub fn finish(&mut self) -> Option<StreamFrame> {
        if self.carry.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.carry);
        self.accept_line(&line)
    }

    fn accept_line(&mut self, raw: &[u8]) -> Option<StreamFrame> {
        let Ok(text) = std::str::from_utf8(raw) else {
            tracing::warn!("dropping non-utf8 stream line");
            return None;
        };
        let line = text.trim_end_matches(['\n', '\r']);

        if let Some(name) = line.strip_prefix("event:") {
            self.event = Some(name.trim().to_owned());
            return None;
        }

        let payload = line.strip_prefix("data:")?;
        match serde_json::from_str::<Value>(payload.trim()) {
            Ok(data) => Some(StreamFrame {
                event: self
                    .event
                    .clone()
                    .unwrap_or_else(|| DEFAULT_EVENT.to_owned()),
                data,
            }),
            Err(error) => {
                tracing::warn!(%error, "dropping unparseable data line");
                None
            }
        }
    }
}

// =============================================================================
// TYPED EVENTS
// =============================================================================

/// Typed view of a [`StreamFrame`], keyed by event name.
///
/// Payload shapes vary per event, so they are validated here instead of being
/// trusted implicitly downstream. A recognized event whose payload is missing
/// a required field degrades to [`ChatEvent::Unknown`], which dispatch treats
/// as a no-op.
#[derive(Clone, Debug, PartialEq)]
pub enum ChatEvent {
    /// Stream opened; may carry an emergent conversation id.
    Start { conversation_id: Option<String> },

    /// Content delta for single-thread flows.
    Message {
        content: String,
        conversation_id: Option<String>,
    },

    /// Content delta for one compared model, tagged with its config id.
    ModelMessage {
        model_config_id: String,
        content: String,
        conversation_id: Option<String>,
    },

    /// One compared model finished; zero `message_length` marks an empty
    /// reply.
    ModelEnd {
        model_config_id: Option<String>,
        message_length: Option<u64>,
    },

    /// The whole comparison exchange finished.
    CompareEnd { message_length: Option<u64> },

    /// Terminal signal for single-thread flows.
    End {
        conversation_id: Option<String>,
        message_length: Option<u64>,
    },

    /// Server-reported failure inside the stream.
    Error { message: String },

    /// Unrecognized event name or malformed payload; ignored by dispatch.
    Unknown,
}

#[derive(Deserialize)]
struct StartPayload {
    conversation_id: Option<String>,
}

#[derive(Deserialize)]
struct MessagePayload {
    content: String,
    conversation_id: Option<String>,
}

#[derive(Deserialize)]
struct ModelMessagePayload {
    model_config_id: String,
    content: String,
    conversation_id: Option<String>,
}

#[derive(Deserialize)]
struct ModelEndPayload {
    model_config_id: Option<String>,
    message_length: Option<u64>,
}

#[derive(Deserialize)]
struct CompareEndPayload {
    message_length: Option<u64>,
}

#[derive(Deserialize)]
struct EndPayload {
    conversation_id: Option<String>,
    message_length: Option<u64>,
}

#[derive(Deserialize)]
struct ErrorPayload {
    #[serde(alias = "error")]
    message: String,
}

fn parse<T: serde::de::DeserializeOwned>(data: &Value) -> Option<T> {
    serde_json::from_value(data.clone()).ok()
}

impl ChatEvent {
    /// Classify a frame by event name and validate its payload.
    #[must_use]
    pub fn from_frame(frame: &StreamFrame) -> Self {
        let data = &frame.data;
        match frame.event.as_str() {
            "start" => parse::<StartPayload>(data).map_or(Self::Unknown, |p| Self::Start {
                conversation_id: p.conversation_id,
            }),
            "message" => parse::<MessagePayload>(data).map_or(Self::Unknown, |p| Self::Message {
                content: p.content,
                conversation_id: p.conversation_id,
            }),
            "model_message" => {
                parse::<ModelMessagePayload>(data).map_or(Self::Unknown, |p| Self::ModelMessage {
                    model_config_id: p.model_config_id,
                    content: p.content,
                    conversation_id: p.conversation_id,
                })
            }
            "model_end" => parse::<ModelEndPayload>(data).map_or(Self::Unknown, |p| Self::ModelEnd {
                model_config_id: p.model_config_id,
                message_length: p.message_length,
            }),
            "compare_end" => {
                parse::<CompareEndPayload>(data).map_or(Self::Unknown, |p| Self::CompareEnd {
                    message_length: p.message_length,
                })
            }
            "end" => parse::<EndPayload>(data).map_or(Self::Unknown, |p| Self::End {
                conversation_id: p.conversation_id,
                message_length: p.message_length,
            }),
            "error" => parse::<ErrorPayload>(data).map_or(Self::Unknown, |p| Self::Error {
                message: p.message,
            }),
            _ => Self::Unknown,
        }
    }
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
