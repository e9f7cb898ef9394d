use std::sync::Arc;

use crate::panels::testing::ScriptedBackend;
use super::*;
use crate::error::ClientError;

#[tokio::test]
async fn optimize_accumulates_deltas_into_the_final_text() {
    let backend = Arc::new(ScriptedBackend::replaying_frames(&[
        "event:start\ndata: {}\n\n",
        "event:message\ndata: {\"content\": \"Be \"}\n\n",
        "event:message\ndata: {\"content\": \"brief.\"}\n\n",
        "event:end\ndata: {\"message_length\": 9}\n\n",
    ]));
    let mut panel = PromptAssistantPanel::new(Arc::clone(&backend));

    let mut events = Vec::new();
    let optimized = panel
        .optimize("Be verbose.", "make it shorter", &mut |e| events.push(e))
        .await
        .expect("optimize");

    assert_eq!(optimized, "Be brief.");
    assert_eq!(panel.buffer(), "Be brief.");
    assert_eq!(
        events,
        vec![
            PromptEvent::Delta("Be ".to_owned()),
            PromptEvent::Delta("brief.".to_owned()),
            PromptEvent::Finished,
        ]
    );

    let opened = backend.opened.lock().expect("opened");
    assert_eq!(opened[0].0, "/api/prompt/optimize");
    assert_eq!(opened[0].1["prompt"], serde_json::json!("Be verbose."));
}

#[tokio::test]
async fn a_server_error_event_surfaces_as_a_stream_error() {
    let backend = Arc::new(ScriptedBackend::replaying_frames(&[
        "event:message\ndata: {\"content\": \"partial\"}\n\n",
        "event:error\ndata: {\"message\": \"quota exhausted\"}\n\n",
    ]));
    let mut panel = PromptAssistantPanel::new(backend);

    let result = panel.optimize("p", "i", &mut |_| {}).await;
    match result {
        Err(ClientError::Stream(message)) => assert_eq!(message, "quota exhausted"),
        other => panic!("expected stream error, got {other:?}"),
    }
    assert!(!panel.loading());
}

#[tokio::test]
async fn optimize_is_single_flight() {
    let backend = Arc::new(ScriptedBackend::replaying(Vec::new()));
    let mut panel = PromptAssistantPanel::new(backend);
    panel.optimize("p", "i", &mut |_| {}).await.expect("first run");
    // Guard releases when the stream ends, so a second run is fine.
    panel.optimize("p", "i", &mut |_| {}).await.expect("second run");
}
