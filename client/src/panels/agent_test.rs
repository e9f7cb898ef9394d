use std::sync::Arc;

use serde_json::json;

use crate::panels::testing::ScriptedBackend;
use super::*;
use crate::error::ClientError;
use crate::panels::session::PanelEvent;

fn draft() -> AgentDraft {
    AgentDraft {
        prompt: "You are terse.".to_owned(),
        model_config_id: Some("m1".to_owned()),
        model_parameters: None,
        knowledge_base_ids: Vec::new(),
    }
}

#[tokio::test]
async fn send_saves_the_draft_then_runs_it() {
    let backend = Arc::new(ScriptedBackend::replaying_frames(&[
        "event:start\ndata: {\"conversation_id\": \"c1\"}\n\n",
        "event:message\ndata: {\"content\": \"Hello\"}\n\n",
        "event:end\ndata: {\"conversation_id\": \"c1\", \"message_length\": 5}\n\n",
    ]));
    let mut panel = AgentChatPanel::new(Arc::clone(&backend), "a1");

    let mut events = Vec::new();
    panel
        .send(&draft(), "Say hello", Vec::new(), &mut |e| events.push(e))
        .await
        .expect("send");

    let saved = backend.saved.lock().expect("saved");
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].0, "/api/agents/a1/draft");
    assert_eq!(saved[0].1["prompt"], json!("You are terse."));

    let opened = backend.opened.lock().expect("opened");
    assert_eq!(opened[0].0, "/api/agents/a1/draft/run");
    assert_eq!(opened[0].1["message"], json!("Say hello"));

    assert_eq!(panel.session().threads()[0].list[1].content.as_deref(), Some("Hello"));
    assert_eq!(panel.session().conversation_id(), Some("c1"));
    assert!(events.contains(&PanelEvent::Finished));
}

#[tokio::test]
async fn second_turn_sends_the_minted_conversation_id() {
    let backend = Arc::new(ScriptedBackend::replaying_frames(&[
        "event:start\ndata: {\"conversation_id\": \"c1\"}\n\n",
        "event:end\ndata: {\"message_length\": 1}\n\n",
    ]));
    let mut panel = AgentChatPanel::new(Arc::clone(&backend), "a1");

    panel.send(&draft(), "one", Vec::new(), &mut |_| {}).await.expect("first send");
    panel.send(&draft(), "two", Vec::new(), &mut |_| {}).await.expect("second send");

    let opened = backend.opened.lock().expect("opened");
    assert_eq!(opened[0].1["conversation_id"], serde_json::Value::Null);
    assert_eq!(opened[1].1["conversation_id"], json!("c1"));
}

#[tokio::test]
async fn failed_draft_save_marks_the_reply_and_skips_the_run() {
    let mut backend = ScriptedBackend::replaying(Vec::new());
    backend.fail_save = true;
    let backend = Arc::new(backend);
    let mut panel = AgentChatPanel::new(Arc::clone(&backend), "a1");

    let mut events = Vec::new();
    let result = panel.send(&draft(), "q", Vec::new(), &mut |e| events.push(e)).await;

    assert!(matches!(result, Err(ClientError::Request(_))));
    assert!(backend.opened.lock().expect("opened").is_empty());
    assert_eq!(panel.session().threads()[0].list[1].content, None);
    assert!(!panel.session().loading(), "input must be re-enabled");
    assert_eq!(events, vec![PanelEvent::ReplyError { thread_index: 0 }]);
}

#[tokio::test]
async fn mid_stream_transport_failure_marks_the_partial_reply() {
    let mut backend = ScriptedBackend::replaying(vec![
        b"event:message\ndata: {\"content\": \"par\"}\n\n".to_vec(),
    ]);
    backend.fail_after_chunks = true;
    let backend = Arc::new(backend);
    let mut panel = AgentChatPanel::new(backend, "a1");

    let mut events = Vec::new();
    let result = panel.send(&draft(), "q", Vec::new(), &mut |e| events.push(e)).await;

    assert!(matches!(result, Err(ClientError::Stream(_))));
    assert_eq!(panel.session().threads()[0].list[1].content, None);
    assert!(!panel.session().loading());
}

#[tokio::test]
async fn a_panel_can_send_again_after_the_stream_closes() {
    let backend = Arc::new(ScriptedBackend::replaying(Vec::new()));
    let mut panel = AgentChatPanel::new(backend, "a1");
    // The stream closes without a terminal frame; the guard is still released.
    panel.send(&draft(), "one", Vec::new(), &mut |_| {}).await.expect("send");
    assert!(!panel.session().loading());
    panel.send(&draft(), "two", Vec::new(), &mut |_| {}).await.expect("second send");
    assert_eq!(panel.session().threads()[0].list.len(), 4);
}
