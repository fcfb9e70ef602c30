//! End-to-end turn pipeline tests: identity, streaming, and persistence.

use futures_util::StreamExt;
use futures_util::future::join_all;
use lagoon_core::{
    ChatError, ConversationEngine, Message, SessionStore, StreamingResponder, TextGenerator,
};
use lagoon_protocol::{ChatRequest, RequestMessage, StreamEvent};
use lagoon_test_utils::{
    ChunkedGenerator, FixedGenerator, FlakyGenerator, RecordingGenerator, SlowGenerator,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use uuid::Uuid;

const TIMEOUT: Duration = Duration::from_secs(5);

fn responder_with(
    store: &SessionStore,
    generator: Arc<dyn TextGenerator>,
) -> StreamingResponder {
    StreamingResponder::new(ConversationEngine::new(generator, TIMEOUT), store.clone())
}

fn request(token: Option<String>, content: &str) -> ChatRequest {
    ChatRequest {
        session_token: token,
        messages: vec![RequestMessage::user(content)],
    }
}

/// Drain the live event stream, then await the turn outcome.
async fn drain(
    mut reply: lagoon_core::ChatReply,
) -> (
    Vec<StreamEvent>,
    Result<lagoon_core::TurnSummary, ChatError>,
) {
    let mut events = Vec::new();
    while let Some(event) = reply.events.next().await {
        events.push(event);
    }
    let outcome = reply.finish().await;
    (events, outcome)
}

#[tokio::test]
async fn fresh_session_mints_token_streams_and_persists() {
    let temp = tempdir().expect("tempdir");
    let store = SessionStore::open(temp.path().join("sessions.json")).expect("open");
    let generator = Arc::new(ChunkedGenerator::new(vec![
        "Hel".to_string(),
        "lo!".to_string(),
    ]));
    let responder = responder_with(&store, generator);

    let reply = responder.respond(request(None, "Hello")).expect("respond");
    assert!(reply.minted);
    let session_id = reply.session_id;
    assert_eq!(reply.token(), session_id.to_string());

    let (events, outcome) = drain(reply).await;
    assert_eq!(
        events,
        vec![
            StreamEvent::Fragment {
                text: "Hel".to_string()
            },
            StreamEvent::Fragment {
                text: "lo!".to_string()
            },
            StreamEvent::Done,
        ]
    );
    let summary = outcome.expect("turn");
    assert_eq!(summary.response, "Hello!");

    assert_eq!(
        store.load(session_id),
        vec![Message::user("Hello"), Message::assistant("Hello!")]
    );

    // Durable: a fresh store instance sees the same transcript.
    let reopened =
        SessionStore::open(temp.path().join("sessions.json")).expect("reopen");
    assert_eq!(reopened.load(session_id).len(), 2);
}

#[tokio::test]
async fn existing_session_feeds_full_history_to_the_engine() {
    let temp = tempdir().expect("tempdir");
    let store = SessionStore::open(temp.path().join("sessions.json")).expect("open");
    let session_id = Uuid::new_v4();
    store
        .append(
            session_id,
            vec![Message::user("Hi"), Message::assistant("Hello!")],
        )
        .await
        .expect("seed");

    let generator = Arc::new(RecordingGenerator::new("I am fine."));
    let seen = generator.last_context.clone();
    let responder = responder_with(&store, generator);

    let reply = responder
        .respond(request(Some(session_id.to_string()), "And you?"))
        .expect("respond");
    assert!(!reply.minted);
    assert_eq!(reply.session_id, session_id);
    let (_, outcome) = drain(reply).await;
    outcome.expect("turn");

    // The engine received the prior transcript plus the new message.
    assert_eq!(
        *seen.lock(),
        vec![
            Message::user("Hi"),
            Message::assistant("Hello!"),
            Message::user("And you?"),
        ]
    );
    assert_eq!(
        store.load(session_id),
        vec![
            Message::user("Hi"),
            Message::assistant("Hello!"),
            Message::user("And you?"),
            Message::assistant("I am fine."),
        ]
    );
}

#[tokio::test]
async fn mid_stream_failure_keeps_fragments_and_stores_only_the_question() {
    let temp = tempdir().expect("tempdir");
    let store = SessionStore::open(temp.path().join("sessions.json")).expect("open");
    let generator = Arc::new(FlakyGenerator::new(
        vec!["Para".to_string()],
        "connection reset",
    ));
    let responder = responder_with(&store, generator);

    let reply = responder.respond(request(None, "Tell me more")).expect("respond");
    let session_id = reply.session_id;
    let (events, outcome) = drain(reply).await;

    assert_eq!(events.len(), 2);
    assert_eq!(
        events[0],
        StreamEvent::Fragment {
            text: "Para".to_string()
        }
    );
    assert!(matches!(events[1], StreamEvent::Error { .. }));
    assert!(matches!(outcome, Err(ChatError::Inference(_))));

    // The question is remembered; no partial assistant message lands.
    assert_eq!(store.load(session_id), vec![Message::user("Tell me more")]);
}

#[tokio::test]
async fn turn_history_is_the_concatenation_of_turn_outcomes() {
    let temp = tempdir().expect("tempdir");
    let store = SessionStore::open(temp.path().join("sessions.json")).expect("open");
    let session_id = Uuid::new_v4();
    let token = || Some(session_id.to_string());

    let ok = responder_with(&store, Arc::new(FixedGenerator::new("ok")));
    let failing = responder_with(
        &store,
        Arc::new(FlakyGenerator::new(Vec::new(), "provider down")),
    );

    let (_, first) = drain(ok.respond(request(token(), "one")).expect("respond")).await;
    first.expect("first turn");
    let (_, second) = drain(failing.respond(request(token(), "two")).expect("respond")).await;
    assert!(second.is_err());
    let (_, third) = drain(ok.respond(request(token(), "three")).expect("respond")).await;
    third.expect("third turn");

    assert_eq!(
        store.load(session_id),
        vec![
            Message::user("one"),
            Message::assistant("ok"),
            Message::user("two"),
            Message::user("three"),
            Message::assistant("ok"),
        ]
    );
}

#[tokio::test]
async fn concurrent_turns_on_one_session_lose_no_appends() {
    let temp = tempdir().expect("tempdir");
    let store = SessionStore::open(temp.path().join("sessions.json")).expect("open");
    let session_id = Uuid::new_v4();
    let responder = responder_with(
        &store,
        Arc::new(ChunkedGenerator::new(vec!["answer".to_string()])),
    );

    let turns = (0..4)
        .map(|n| {
            let responder = responder.clone();
            let token = session_id.to_string();
            async move {
                let reply = responder
                    .respond(request(Some(token), &format!("question {n}")))
                    .expect("respond");
                drain(reply).await.1
            }
        })
        .collect::<Vec<_>>();

    for outcome in join_all(turns).await {
        outcome.expect("turn");
    }

    let transcript = store.load(session_id);
    assert_eq!(transcript.len(), 8);
    // Every append landed as an intact user/assistant pair.
    for pair in transcript.chunks(2) {
        assert_eq!(pair[0].role, lagoon_core::Role::User);
        assert_eq!(pair[1].role, lagoon_core::Role::Assistant);
    }
}

#[tokio::test(start_paused = true)]
async fn distinct_sessions_run_fully_in_parallel() {
    let temp = tempdir().expect("tempdir");
    let store = SessionStore::open(temp.path().join("sessions.json")).expect("open");
    let responder = responder_with(
        &store,
        Arc::new(SlowGenerator::new(Duration::from_secs(1), "done")),
    );

    let started = tokio::time::Instant::now();
    let turns = (0..5)
        .map(|n| {
            let responder = responder.clone();
            async move {
                let reply = responder
                    .respond(request(None, &format!("hello {n}")))
                    .expect("respond");
                drain(reply).await.1
            }
        })
        .collect::<Vec<_>>();
    for outcome in join_all(turns).await {
        outcome.expect("turn");
    }

    // Five one-second turns overlap instead of running back to back.
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(store.session_count(), 5);
}

#[tokio::test]
async fn disconnect_flushes_partial_content_as_a_truncated_reply() {
    let temp = tempdir().expect("tempdir");
    let store = SessionStore::open(temp.path().join("sessions.json")).expect("open");
    let generator = Arc::new(ChunkedGenerator::new(vec![
        "Para".to_string(),
        "graph".to_string(),
    ]));
    let responder = responder_with(&store, generator);

    let mut reply = responder.respond(request(None, "Hello")).expect("respond");
    let session_id = reply.session_id;
    // Simulate the client going away before consuming anything.
    reply.events.close();
    let summary = reply.finish().await.expect("turn");

    assert_eq!(summary.response, "Para");
    assert_eq!(
        store.load(session_id),
        vec![Message::user("Hello"), Message::assistant("Para")]
    );
}

#[tokio::test]
async fn store_write_failure_arrives_after_the_streamed_answer() {
    let temp = tempdir().expect("tempdir");
    let dir = temp.path().join("state");
    let store = SessionStore::open(dir.join("sessions.json")).expect("open");
    let responder = responder_with(
        &store,
        Arc::new(ChunkedGenerator::new(vec!["All good".to_string()])),
    );

    // Break the backing medium after the store opened.
    std::fs::remove_dir_all(&dir).expect("remove dir");
    std::fs::write(&dir, b"").expect("block path");

    let reply = responder.respond(request(None, "Hello")).expect("respond");
    let (events, outcome) = drain(reply).await;

    assert_eq!(
        events[0],
        StreamEvent::Fragment {
            text: "All good".to_string()
        }
    );
    assert!(matches!(events[1], StreamEvent::Error { .. }));
    assert!(matches!(outcome, Err(ChatError::Store(_))));
}

#[tokio::test]
async fn malformed_requests_never_touch_the_store() {
    let temp = tempdir().expect("tempdir");
    let store = SessionStore::open(temp.path().join("sessions.json")).expect("open");
    let responder = responder_with(
        &store,
        Arc::new(ChunkedGenerator::new(vec!["unused".to_string()])),
    );

    let empty = ChatRequest {
        session_token: None,
        messages: Vec::new(),
    };
    assert!(matches!(
        responder.respond(empty),
        Err(ChatError::MalformedRequest(_))
    ));

    let bad_role = ChatRequest {
        session_token: None,
        messages: vec![RequestMessage {
            role: "operator".to_string(),
            content: "hi".to_string(),
        }],
    };
    assert!(matches!(
        responder.respond(bad_role),
        Err(ChatError::MalformedRequest(_))
    ));

    assert_eq!(store.session_count(), 0);
}
