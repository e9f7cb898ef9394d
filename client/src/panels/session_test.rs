use super::*;
use crate::state::chat::ChatThread;

fn single_session() -> ChatSession {
    ChatSession::new(PanelMode::Single, Role::Assistant, vec![ChatThread::default()])
}

fn collect(events: &mut Vec<PanelEvent>) -> impl FnMut(PanelEvent) + '_ {
    |event| events.push(event)
}

#[test]
fn hello_exchange_accumulates_deltas_and_finishes() {
    let mut session = single_session();
    let ticket = session.begin("Say hello", Vec::new()).expect("begin");
    assert!(session.loading());

    let body = concat!(
        "event:start\ndata: {\"conversation_id\": \"c1\"}\n\n",
        "event:message\ndata: {\"content\": \"Hel\"}\n\n",
        "event:message\ndata: {\"content\": \"lo\"}\n\n",
        "event:end\ndata: {\"conversation_id\": \"c1\", \"message_length\": 5}\n\n",
    );
    let mut events = Vec::new();
    session.apply_chunk(ticket, body.as_bytes(), &mut collect(&mut events));

    let reply = &session.threads()[0].list[1];
    assert_eq!(reply.content.as_deref(), Some("Hello"));
    assert!(session.finished());
    assert!(!session.loading());
    assert_eq!(session.conversation_id(), Some("c1"));
    assert!(session.take_history_stale());
    assert!(!session.take_history_stale(), "stale flag is one-shot");
    assert_eq!(
        events,
        vec![
            PanelEvent::ConversationMinted("c1".to_owned()),
            PanelEvent::Delta { thread_index: 0, delta: "Hel".to_owned() },
            PanelEvent::Delta { thread_index: 0, delta: "lo".to_owned() },
            PanelEvent::Finished,
        ]
    );
}

#[test]
fn zero_length_end_turns_the_reply_into_an_exception() {
    let mut session = single_session();
    let ticket = session.begin("q", Vec::new()).expect("begin");
    let body = "event:end\ndata: {\"message_length\": 0}\n\n";
    let mut events = Vec::new();
    session.apply_chunk(ticket, body.as_bytes(), &mut collect(&mut events));

    assert_eq!(session.threads()[0].list[1].content, None);
    assert!(events.contains(&PanelEvent::ReplyError { thread_index: 0 }));
    assert!(session.finished());
}

#[test]
fn begin_while_loading_is_refused() {
    let mut session = single_session();
    session.begin("first", Vec::new()).expect("begin");
    let second = session.begin("second", Vec::new());
    assert!(matches!(second, Err(ClientError::RequestInFlight)));
}

#[test]
fn stale_ticket_chunks_are_dropped() {
    let mut session = single_session();
    let old = session.begin("first", Vec::new()).expect("begin");
    session.abort();
    let fresh = session.begin("second", Vec::new()).expect("begin again");

    let mut events = Vec::new();
    session.apply_chunk(
        old,
        b"event:message\ndata: {\"content\": \"stale\"}\n\n",
        &mut collect(&mut events),
    );
    assert!(events.is_empty());
    assert_eq!(session.threads()[0].list.last().and_then(|m| m.content.as_deref()), Some(""));

    session.apply_chunk(
        fresh,
        b"event:message\ndata: {\"content\": \"live\"}\n\n",
        &mut collect(&mut events),
    );
    assert_eq!(
        session.threads()[0].list.last().and_then(|m| m.content.as_deref()),
        Some("live")
    );
}

#[test]
fn frames_split_across_chunks_are_reassembled() {
    let mut session = single_session();
    let ticket = session.begin("q", Vec::new()).expect("begin");
    let body = "event:message\ndata: {\"content\": \"whole\"}\n\n";
    let (a, b) = body.as_bytes().split_at(20);

    let mut events = Vec::new();
    session.apply_chunk(ticket, a, &mut collect(&mut events));
    assert!(events.is_empty(), "no complete frame yet");
    session.apply_chunk(ticket, b, &mut collect(&mut events));
    assert_eq!(session.threads()[0].list[1].content.as_deref(), Some("whole"));
}

#[test]
fn finish_stream_flushes_an_unterminated_final_frame() {
    let mut session = single_session();
    let ticket = session.begin("q", Vec::new()).expect("begin");
    let mut events = Vec::new();
    session.apply_chunk(
        ticket,
        b"event:message\ndata: {\"content\": \"tail\"}",
        &mut collect(&mut events),
    );
    assert!(events.is_empty());
    session.finish_stream(ticket, &mut collect(&mut events));
    assert_eq!(session.threads()[0].list[1].content.as_deref(), Some("tail"));
    assert!(!session.loading());
}

#[test]
fn fail_marks_the_reply_and_releases_the_guard() {
    let mut session = single_session();
    let ticket = session.begin("q", Vec::new()).expect("begin");
    let mut events = Vec::new();
    session.fail(ticket, &mut collect(&mut events));

    assert_eq!(session.threads()[0].list[1].content, None);
    assert!(!session.loading());
    assert_eq!(events, vec![PanelEvent::ReplyError { thread_index: 0 }]);
}

#[test]
fn fail_in_compare_mode_marks_every_column() {
    let mut threads = vec![ChatThread::default(), ChatThread::default()];
    threads[0].model_config_id = Some("m1".to_owned());
    threads[1].model_config_id = Some("m2".to_owned());
    let mut session = ChatSession::new(PanelMode::Compare, Role::Assistant, threads);
    let ticket = session.begin("q", Vec::new()).expect("begin");

    session.apply_chunk(
        ticket,
        b"event:model_message\ndata: {\"model_config_id\": \"m1\", \"content\": \"par\"}\n\n",
        &mut |_| {},
    );
    let mut events = Vec::new();
    session.fail(ticket, &mut collect(&mut events));

    assert_eq!(session.threads()[0].list[1].content, None);
    assert_eq!(session.threads()[1].list[1].content, None);
    assert_eq!(
        events,
        vec![
            PanelEvent::ReplyError { thread_index: 0 },
            PanelEvent::ReplyError { thread_index: 1 },
        ]
    );
    assert!(!session.loading());
}

#[test]
fn zero_length_compare_end_marks_every_column() {
    let mut threads = vec![ChatThread::default(), ChatThread::default()];
    threads[0].model_config_id = Some("m1".to_owned());
    threads[1].model_config_id = Some("m2".to_owned());
    let mut session = ChatSession::new(PanelMode::Compare, Role::Assistant, threads);
    let ticket = session.begin("q", Vec::new()).expect("begin");

    let mut events = Vec::new();
    session.apply_chunk(
        ticket,
        b"event:compare_end\ndata: {\"message_length\": 0}\n\n",
        &mut collect(&mut events),
    );

    assert_eq!(session.threads()[0].list[1].content, None);
    assert_eq!(session.threads()[1].list[1].content, None);
    assert!(session.finished());
}

#[test]
fn error_event_marks_the_reply_but_keeps_streaming() {
    let mut session = single_session();
    let ticket = session.begin("q", Vec::new()).expect("begin");
    let body = concat!(
        "event:error\ndata: {\"message\": \"model unavailable\"}\n\n",
        "event:end\ndata: {}\n\n",
    );
    let mut events = Vec::new();
    session.apply_chunk(ticket, body.as_bytes(), &mut collect(&mut events));

    assert_eq!(session.threads()[0].list[1].content, None);
    assert!(session.finished());
    assert_eq!(
        events,
        vec![PanelEvent::ReplyError { thread_index: 0 }, PanelEvent::Finished]
    );
}

#[test]
fn compare_mode_routes_model_messages_to_their_columns() {
    let mut threads = vec![ChatThread::default(), ChatThread::default()];
    threads[0].model_config_id = Some("m1".to_owned());
    threads[1].model_config_id = Some("m2".to_owned());
    let mut session = ChatSession::new(PanelMode::Compare, Role::Assistant, threads);
    let ticket = session.begin("q", Vec::new()).expect("begin");

    let body = concat!(
        "event:model_message\ndata: {\"model_config_id\": \"m2\", \"content\": \"beta\"}\n\n",
        "event:model_message\ndata: {\"model_config_id\": \"m1\", \"content\": \"alpha\"}\n\n",
        "event:model_end\ndata: {\"model_config_id\": \"m1\", \"message_length\": 5}\n\n",
        "event:model_end\ndata: {\"model_config_id\": \"m2\", \"message_length\": 4}\n\n",
        "event:compare_end\ndata: {}\n\n",
    );
    let mut events = Vec::new();
    session.apply_chunk(ticket, body.as_bytes(), &mut collect(&mut events));

    assert_eq!(session.threads()[0].list[1].content.as_deref(), Some("alpha"));
    assert_eq!(session.threads()[1].list[1].content.as_deref(), Some("beta"));
    assert!(session.finished());
}

#[test]
fn set_conversation_id_lands_on_threads_without_marking_history_stale() {
    let mut session = single_session();
    session.set_conversation_id("resumed");
    assert_eq!(session.conversation_id(), Some("resumed"));
    assert_eq!(session.threads()[0].conversation_id.as_deref(), Some("resumed"));
    assert!(!session.take_history_stale());
}
