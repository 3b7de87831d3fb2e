//! Chat session against `MockModel`: fragment accumulation, failure isolation,
//! history threading and send serialization.

mod init_logging;

use std::sync::Arc;
use std::time::Duration;

use strategist::llm::{MockModel, MockStream};
use strategist::model::Role;
use strategist::{ChatEvent, ChatMessage, ChatOptions, ChatSession, StrategistError, Transcript};

const GREETING: &str = "Halo! Tanyakan apa saja tentang strategi bisnis Anda.";
const FALLBACK: &str = "Maaf, saya mengalami kesalahan. Silakan coba lagi.";

fn fragments(parts: &[&str]) -> MockStream {
    MockStream::Fragments(parts.iter().map(|s| s.to_string()).collect())
}

fn session(model: &Arc<MockModel>) -> ChatSession {
    ChatSession::new(model.clone(), ChatOptions::default())
}

#[tokio::test]
async fn fragments_accumulate_into_prefixes_of_the_reply() {
    let model = Arc::new(MockModel::with_text("unused").with_streams([fragments(&["Hal", "o ", "there"])]));
    let session = session(&model);
    let mut transcript = Transcript::with_greeting(GREETING, FALLBACK);

    assert!(transcript.begin_turn("Hi"));
    let mut stream = session.send_message("Hi").await;
    let mut states = Vec::new();
    while let Some(event) = stream.next().await {
        transcript.apply(&event);
        if matches!(event, ChatEvent::Fragment(_)) {
            states.push(transcript.last_text().to_string());
        }
    }

    assert_eq!(transcript.last_text(), "Halo there");
    assert_eq!(states, vec!["Hal", "Halo ", "Halo there"]);
    assert!(states.iter().all(|s| "Halo there".starts_with(s.as_str())));
    assert!(!transcript.is_streaming());
    assert_eq!(transcript.messages().len(), 3);
    assert_eq!(transcript.messages()[0].text, GREETING);
}

#[tokio::test]
async fn failed_stream_leaves_session_reusable() {
    let model = Arc::new(MockModel::with_text("unused").with_streams([
        MockStream::FailAfter(vec!["par".into()], "connection reset".into()),
        fragments(&["Second ", "answer"]),
    ]));
    let session = session(&model);
    let mut transcript = Transcript::with_greeting(GREETING, FALLBACK);

    transcript.begin_turn("first");
    let mut stream = session.send_message("first").await;
    let mut last = None;
    while let Some(event) = stream.next().await {
        transcript.apply(&event);
        last = Some(event);
    }
    assert!(matches!(last, Some(ChatEvent::Error(ref m)) if m.contains("connection reset")));
    assert_eq!(transcript.last_text(), FALLBACK);
    assert!(session.history().is_empty());

    transcript.begin_turn("second");
    let mut stream = session.send_message("second").await;
    while let Some(event) = stream.next().await {
        transcript.apply(&event);
    }
    assert_eq!(transcript.last_text(), "Second answer");
    assert_eq!(
        session.history(),
        vec![ChatMessage::user("second"), ChatMessage::model("Second answer")]
    );
}

#[tokio::test]
async fn history_is_sent_with_each_turn() {
    let model = Arc::new(
        MockModel::with_text("unused")
            .with_streams([fragments(&["one"]), fragments(&["two"]), fragments(&["three"])]),
    );
    let session = session(&model);
    for q in ["a", "b", "c"] {
        session.send_message(q).await.collect_text().await.unwrap();
    }

    let requests = model.requests();
    let sizes: Vec<usize> = requests.iter().map(|r| r.contents.len()).collect();
    assert_eq!(sizes, vec![1, 3, 5]);
    let last = &requests[2].contents;
    assert_eq!(last[0], ChatMessage::user("a"));
    assert_eq!(last[1], ChatMessage::model("one"));
    assert_eq!(last[4].role, Role::User);
    assert_eq!(last[4].text, "c");
}

#[tokio::test]
async fn collect_text_reports_failure() {
    let model = Arc::new(
        MockModel::with_text("unused")
            .with_streams([MockStream::FailAfter(vec![], "quota exceeded".into())]),
    );
    let err = session(&model)
        .send_message("q")
        .await
        .collect_text()
        .await
        .unwrap_err();
    assert!(matches!(err, StrategistError::ChatTurn(ref m) if m.contains("quota exceeded")));
}

#[tokio::test]
async fn sends_are_serialized() {
    let model = Arc::new(MockModel::with_text("reply").with_delay(Duration::from_millis(100)));
    let session = session(&model);

    let first = session.send_message("first").await;
    assert!(session.is_busy());

    let second_session = session.clone();
    let second = tokio::spawn(async move {
        second_session.send_message("second").await.collect_text().await
    });
    let first_text = first.collect_text().await.unwrap();
    let second_text = second.await.unwrap().unwrap();

    assert_eq!(first_text, "reply");
    assert_eq!(second_text, "reply");
    let requests = model.requests();
    assert_eq!(requests[0].last_user_text(), "first");
    assert_eq!(requests[1].contents.len(), 3);
    assert_eq!(requests[1].last_user_text(), "second");
}

#[tokio::test]
async fn dropping_the_stream_cancels_the_turn() {
    let model = Arc::new(MockModel::with_text("slow").with_delay(Duration::from_secs(30)));
    let session = session(&model);
    drop(session.send_message("abandoned").await);

    let next = tokio::time::timeout(Duration::from_secs(5), session.send_message("next"))
        .await
        .expect("lock released after drop");
    drop(next);
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn empty_reply_is_an_error_and_not_recorded() {
    let model = Arc::new(
        MockModel::with_text("unused")
            .with_streams([MockStream::Fragments(vec![]), fragments(&["ok"])]),
    );
    let session = session(&model);

    let err = session
        .send_message("q1")
        .await
        .collect_text()
        .await
        .unwrap_err();
    assert!(matches!(err, StrategistError::ChatTurn(ref m) if m.contains("no text")));
    assert!(session.history().is_empty());

    let second = session.send_message("q2").await.collect_text().await.unwrap();
    assert_eq!(second, "ok");
    let requests = model.requests();
    assert_eq!(requests[1].contents, vec![ChatMessage::user("q2")]);
    assert!(requests[1].contents.iter().all(|m| !m.text.is_empty()));
    assert_eq!(
        session.history(),
        vec![ChatMessage::user("q2"), ChatMessage::model("ok")]
    );
}
