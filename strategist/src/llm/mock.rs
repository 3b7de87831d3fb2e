//! Mock generation service for tests and offline runs.
//!
//! Answers through a responder closure, records every request it receives, and
//! can replay scripted streams (including streams that fail part way).

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::StrategistError;
use crate::llm::{GenerateRequest, GenerativeModel, Generation, TextChunk};

type Responder = dyn Fn(&GenerateRequest) -> Result<Generation, StrategistError> + Send + Sync;

/// Scripted behaviour for one `generate_stream` call.
#[derive(Clone, Debug)]
pub enum MockStream {
    /// Sends each fragment in order, then succeeds with their concatenation.
    Fragments(Vec<String>),
    /// Sends the fragments, then fails with a transport error carrying the message.
    FailAfter(Vec<String>, String),
}

/// Mock [`GenerativeModel`].
///
/// `generate_stream` consumes the next [`MockStream`] script when one is queued;
/// otherwise it falls back to the responder and sends the text as one chunk.
pub struct MockModel {
    responder: Box<Responder>,
    requests: Mutex<Vec<GenerateRequest>>,
    streams: Mutex<VecDeque<MockStream>>,
    delay: Option<Duration>,
}

impl MockModel {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&GenerateRequest) -> Result<Generation, StrategistError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
            streams: Mutex::new(VecDeque::new()),
            delay: None,
        }
    }

    /// Always answers with `text`.
    pub fn with_text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_| Ok(Generation::text(text.clone())))
    }

    /// Queues scripted streams, consumed one per `generate_stream` call.
    pub fn with_streams(self, streams: impl IntoIterator<Item = MockStream>) -> Self {
        if let Ok(mut queue) = self.streams.lock() {
            queue.extend(streams);
        }
        self
    }

    /// Sleeps before answering every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    fn record(&self, request: &GenerateRequest) {
        if let Ok(mut r) = self.requests.lock() {
            r.push(request.clone());
        }
    }

    fn next_stream(&self) -> Option<MockStream> {
        self.streams.lock().ok().and_then(|mut q| q.pop_front())
    }
}

#[async_trait]
impl GenerativeModel for MockModel {
    async fn generate(&self, request: GenerateRequest) -> Result<Generation, StrategistError> {
        self.record(&request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(&request)
    }

    async fn generate_stream(
        &self,
        request: GenerateRequest,
        chunk_tx: Option<mpsc::Sender<TextChunk>>,
    ) -> Result<Generation, StrategistError> {
        let Some(script) = self.next_stream() else {
            let generation = self.generate(request).await?;
            if let (Some(tx), false) = (chunk_tx, generation.text.is_empty()) {
                let _ = tx
                    .send(TextChunk {
                        text: generation.text.clone(),
                    })
                    .await;
            }
            return Ok(generation);
        };

        self.record(&request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let (fragments, failure) = match script {
            MockStream::Fragments(f) => (f, None),
            MockStream::FailAfter(f, message) => (f, Some(message)),
        };
        let mut text = String::new();
        for fragment in fragments {
            text.push_str(&fragment);
            if let Some(tx) = &chunk_tx {
                let _ = tx.send(TextChunk { text: fragment }).await;
            }
        }
        match failure {
            Some(message) => Err(StrategistError::Transport(message)),
            None => Ok(Generation::text(text)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::RequestKind;

    #[tokio::test]
    async fn records_requests_in_order() {
        let model = MockModel::with_text("ok");
        model
            .generate(GenerateRequest::prompt(RequestKind::MarketTrends, "m", "a"))
            .await
            .unwrap();
        model
            .generate(GenerateRequest::prompt(RequestKind::TrendsSummary, "m", "b"))
            .await
            .unwrap();
        let kinds: Vec<_> = model.requests().iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![RequestKind::MarketTrends, RequestKind::TrendsSummary]);
    }

    #[tokio::test]
    async fn scripted_stream_sends_fragments_then_fails() {
        let model = MockModel::with_text("unused").with_streams([MockStream::FailAfter(
            vec!["par".into(), "tial".into()],
            "connection reset".into(),
        )]);
        let (tx, mut rx) = mpsc::channel(8);
        let err = model
            .generate_stream(GenerateRequest::prompt(RequestKind::Chat, "m", "q"), Some(tx))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(rx.recv().await.unwrap().text, "par");
        assert_eq!(rx.recv().await.unwrap().text, "tial");
        assert!(rx.recv().await.is_none());
    }
}
