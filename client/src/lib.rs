//! Platform API client and chat state for the agentdeck console.
//!
//! SYSTEM CONTEXT
//! ==============
//! The agent platform exposes REST CRUD plus `text/event-stream` chat
//! endpoints. This crate layers the console's client logic on top: the
//! [`api`] HTTP client, the pure [`state::chat`] reducer, the [`dispatch`]
//! event mapping, and the [`panels`] controllers that wire them together
//! per view.

pub mod api;
pub mod dispatch;
pub mod error;
pub mod panels;
pub mod state;
pub mod transport;

pub use api::ApiClient;
pub use error::ClientError;
