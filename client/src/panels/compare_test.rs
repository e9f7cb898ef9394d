use std::sync::Arc;

use serde_json::json;

use crate::panels::testing::ScriptedBackend;
use super::*;
use crate::error::ClientError;

fn columns(ids: &[&str]) -> Vec<CompareColumn> {
    ids.iter()
        .map(|id| CompareColumn {
            model_config_id: (*id).to_owned(),
            label: None,
            model_parameters: None,
        })
        .collect()
}

#[test]
fn new_rejects_empty_and_oversized_column_lists() {
    let empty = ModelComparePanel::new(
        Arc::new(ScriptedBackend::replaying(Vec::new())),
        "a1",
        Vec::new(),
    );
    assert!(matches!(empty, Err(ClientError::InvalidCompareColumns { count: 0 })));

    let five = ModelComparePanel::new(
        Arc::new(ScriptedBackend::replaying(Vec::new())),
        "a1",
        columns(&["m1", "m2", "m3", "m4", "m5"]),
    );
    assert!(matches!(five, Err(ClientError::InvalidCompareColumns { count: 5 })));
}

#[tokio::test]
async fn one_stream_feeds_every_column_by_model_config_id() {
    let backend = Arc::new(ScriptedBackend::replaying_frames(&[
        "event:start\ndata: {\"conversation_id\": \"c1\"}\n\n",
        "event:model_message\ndata: {\"model_config_id\": \"m1\", \"content\": \"al\"}\n\n",
        "event:model_message\ndata: {\"model_config_id\": \"m2\", \"content\": \"be\"}\n\n",
        "event:model_message\ndata: {\"model_config_id\": \"m1\", \"content\": \"pha\"}\n\n",
        "event:model_end\ndata: {\"model_config_id\": \"m1\", \"message_length\": 5}\n\n",
        "event:model_end\ndata: {\"model_config_id\": \"m2\", \"message_length\": 0}\n\n",
        "event:compare_end\ndata: {}\n\n",
    ]));
    let mut panel =
        ModelComparePanel::new(Arc::clone(&backend), "a1", columns(&["m1", "m2"])).expect("new");

    panel.send("compare this", &mut |_| {}).await.expect("send");

    let threads = panel.session().threads();
    assert_eq!(threads[0].list[1].content.as_deref(), Some("alpha"));
    assert_eq!(threads[1].list[1].content, None, "zero-length column is an exception");
    assert!(panel.session().finished());

    let opened = backend.opened.lock().expect("opened");
    assert_eq!(opened[0].0, "/api/agents/a1/compare/run");
    assert_eq!(opened[0].1["model_config_ids"], json!(["m1", "m2"]));
}

#[tokio::test]
async fn mid_stream_failure_marks_every_column_as_an_exception() {
    let mut backend = ScriptedBackend::replaying(vec![
        b"event:model_message\ndata: {\"model_config_id\": \"m1\", \"content\": \"par\"}\n\n".to_vec(),
    ]);
    backend.fail_after_chunks = true;
    let mut panel =
        ModelComparePanel::new(Arc::new(backend), "a1", columns(&["m1", "m2"])).expect("new");

    let result = panel.send("q", &mut |_| {}).await;

    assert!(matches!(result, Err(ClientError::Stream(_))));
    let threads = panel.session().threads();
    assert_eq!(threads[0].list[1].content, None, "partial column is marked too");
    assert_eq!(threads[1].list[1].content, None);
    assert!(!panel.session().loading());
}

#[tokio::test]
async fn unknown_column_frames_are_ignored() {
    let backend = Arc::new(ScriptedBackend::replaying_frames(&[
        "event:model_message\ndata: {\"model_config_id\": \"ghost\", \"content\": \"x\"}\n\n",
        "event:compare_end\ndata: {}\n\n",
    ]));
    let mut panel = ModelComparePanel::new(backend, "a1", columns(&["m1"])).expect("new");

    panel.send("q", &mut |_| {}).await.expect("send");
    assert_eq!(panel.session().threads()[0].list[1].content.as_deref(), Some(""));
}
