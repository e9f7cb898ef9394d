//! Panel controllers.
//!
//! SYSTEM CONTEXT
//! ==============
//! Each chat surface in the console (agent draft test, model compare, cluster
//! run, conversation review, prompt assistant) owns one controller here. The
//! controllers share [`ChatSession`] for the streaming plumbing and differ
//! only in draft persistence and which endpoint they run.

pub mod agent;
pub mod cluster;
pub mod compare;
pub mod conversation;
pub mod prompt;
pub mod session;

pub use agent::{AgentChatPanel, AgentDraft};
pub use cluster::ClusterChatPanel;
pub use compare::{CompareColumn, ModelComparePanel, MAX_COMPARE_COLUMNS};
pub use conversation::ConversationPanel;
pub use prompt::{PromptAssistantPanel, PromptEvent};
pub use session::{ChatSession, PanelEvent};
