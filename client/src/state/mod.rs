//! Client-side state: chat threads and persisted tokens.

pub mod chat;
pub mod share;
