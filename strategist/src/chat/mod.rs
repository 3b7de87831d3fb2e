//! Streaming follow-up chat with a persistent history.
//!
//! A [`ChatSession`] is an explicit handle: create one per conversation and pass
//! clones to whoever needs to send. Each [`send_message`](ChatSession::send_message)
//! returns a [`ChatStream`] of [`ChatEvent`]s that ends with exactly one of
//! `Done`, `Error` or `Cancelled`.
//!
//! Only one turn streams at a time: a second send waits until the previous stream
//! has finished, been cancelled or been dropped. A successful turn appends the user
//! message and the full reply to the history; a failed or cancelled turn appends
//! nothing, and the session stays usable.

mod transcript;

pub use transcript::Transcript;

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, warn, Instrument};

use crate::config::{StrategistConfig, DEFAULT_CHAT_MODEL};
use crate::error::StrategistError;
use crate::llm::{GenerateRequest, GenerativeModel, RequestKind, TextChunk};
use crate::model::ChatMessage;
use crate::prompts::Prompts;

const EVENT_BUFFER: usize = 64;

/// One item of a chat stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatEvent {
    /// Next piece of the reply, in arrival order.
    Fragment(String),
    /// The reply is complete and recorded in the history.
    Done,
    /// The turn failed; the message describes why.
    Error(String),
    /// The turn was cancelled before it completed.
    Cancelled,
}

impl ChatEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChatEvent::Fragment(_))
    }
}

#[derive(Clone, Debug)]
pub struct ChatOptions {
    pub model: String,
    pub system_instruction: Option<String>,
}

impl ChatOptions {
    /// Chat model from `config`, system instruction from `prompts`.
    pub fn from_config(config: &StrategistConfig, prompts: &Prompts) -> Self {
        Self {
            model: config.chat_model.clone(),
            system_instruction: Some(prompts.chat_system_instruction()),
        }
    }
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_CHAT_MODEL.to_string(),
            system_instruction: None,
        }
    }
}

/// Handle to one conversation. Clones share the history and the send lock.
#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    model: Arc<dyn GenerativeModel>,
    options: ChatOptions,
    history: Mutex<Vec<ChatMessage>>,
    send_lock: Arc<tokio::sync::Mutex<()>>,
}

impl ChatSession {
    pub fn new(model: Arc<dyn GenerativeModel>, options: ChatOptions) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                model,
                options,
                history: Mutex::new(Vec::new()),
                send_lock: Arc::new(tokio::sync::Mutex::new(())),
            }),
        }
    }

    /// Starts a turn and returns its event stream.
    ///
    /// Waits while another turn of this session is still streaming.
    pub async fn send_message(&self, text: impl Into<String>) -> ChatStream {
        let guard = self.inner.send_lock.clone().lock_owned().await;
        let text = text.into();
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let cancel = CancellationToken::new();

        let inner = Arc::clone(&self.inner);
        let token = cancel.clone();
        let span = info_span!("chat_turn", turn = inner.history().len() / 2 + 1);
        tokio::spawn(
            async move {
                let _guard = guard;
                let last = tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!("chat turn cancelled");
                        ChatEvent::Cancelled
                    }
                    outcome = inner.run_turn(text, &tx) => match outcome {
                        Ok(()) => ChatEvent::Done,
                        Err(e) => {
                            warn!(error = %e, "chat turn failed");
                            ChatEvent::Error(e.to_string())
                        }
                    },
                };
                let _ = tx.send(last).await;
            }
            .instrument(span),
        );

        ChatStream {
            rx,
            cancel,
            finished: false,
        }
    }

    /// Completed turns so far, oldest first.
    pub fn history(&self) -> Vec<ChatMessage> {
        self.inner.history().clone()
    }

    /// True while a turn is streaming.
    pub fn is_busy(&self) -> bool {
        self.inner.send_lock.try_lock().is_err()
    }
}

impl SessionInner {
    fn history(&self) -> MutexGuard<'_, Vec<ChatMessage>> {
        self.history.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn run_turn(
        &self,
        text: String,
        events: &mpsc::Sender<ChatEvent>,
    ) -> Result<(), StrategistError> {
        let mut contents = self.history().clone();
        contents.push(ChatMessage::user(text.clone()));
        let mut request = GenerateRequest::with_history(RequestKind::Chat, &self.options.model, contents);
        if let Some(instruction) = &self.options.system_instruction {
            request = request.with_system_instruction(instruction.clone());
        }

        let (chunk_tx, mut chunk_rx) = mpsc::channel::<TextChunk>(EVENT_BUFFER);
        let forward = async move {
            while let Some(chunk) = chunk_rx.recv().await {
                if events.send(ChatEvent::Fragment(chunk.text)).await.is_err() {
                    break;
                }
            }
        };
        let (generation, ()) = tokio::join!(
            self.model.generate_stream(request, Some(chunk_tx)),
            forward
        );
        let generation = generation?;
        // an empty model turn would be rejected on every later request
        if generation.text.trim().is_empty() {
            return Err(StrategistError::EmptyResponse(RequestKind::Chat));
        }

        let mut history = self.history();
        history.push(ChatMessage::user(text));
        history.push(ChatMessage::model(generation.text));
        Ok(())
    }
}

/// Receiving end of one chat turn. Dropping it cancels the turn.
pub struct ChatStream {
    rx: mpsc::Receiver<ChatEvent>,
    cancel: CancellationToken,
    finished: bool,
}

impl ChatStream {
    /// Next event; `None` once the terminal event has been returned.
    pub async fn next(&mut self) -> Option<ChatEvent> {
        if self.finished {
            return None;
        }
        let event = self.rx.recv().await?;
        self.finished = event.is_terminal();
        Some(event)
    }

    /// Asks the turn to stop; the stream then ends with `Cancelled` unless it already finished.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Drains the stream and returns the full reply.
    pub async fn collect_text(mut self) -> Result<String, StrategistError> {
        let mut text = String::new();
        while let Some(event) = self.next().await {
            match event {
                ChatEvent::Fragment(f) => text.push_str(&f),
                ChatEvent::Done => return Ok(text),
                ChatEvent::Error(message) => return Err(StrategistError::ChatTurn(message)),
                ChatEvent::Cancelled => return Err(StrategistError::Cancelled),
            }
        }
        Err(StrategistError::ChatTurn(
            "stream closed without a final event".to_string(),
        ))
    }
}

impl Drop for ChatStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockModel, MockStream};
    use std::time::Duration;

    fn session(model: MockModel) -> (Arc<MockModel>, ChatSession) {
        let model = Arc::new(model);
        let session = ChatSession::new(model.clone(), ChatOptions::default());
        (model, session)
    }

    #[tokio::test]
    async fn stream_ends_with_done_and_records_history() {
        let (_, session) = session(
            MockModel::with_text("unused")
                .with_streams([MockStream::Fragments(vec!["a".into(), "b".into()])]),
        );
        let mut stream = session.send_message("hi").await;
        assert_eq!(stream.next().await, Some(ChatEvent::Fragment("a".into())));
        assert_eq!(stream.next().await, Some(ChatEvent::Fragment("b".into())));
        assert_eq!(stream.next().await, Some(ChatEvent::Done));
        assert_eq!(stream.next().await, None);
        assert_eq!(
            session.history(),
            vec![ChatMessage::user("hi"), ChatMessage::model("ab")]
        );
    }

    #[tokio::test]
    async fn cancelled_turn_appends_nothing() {
        let (_, session) = session(MockModel::with_text("slow").with_delay(Duration::from_secs(30)));
        let mut stream = session.send_message("hi").await;
        stream.cancel();
        assert_eq!(stream.next().await, Some(ChatEvent::Cancelled));
        assert!(session.history().is_empty());

        // the lock is released once the cancelled turn's task exits
        let next = tokio::time::timeout(Duration::from_secs(5), session.send_message("again"))
            .await
            .expect("send lock released after cancel");
        drop(next);
    }

    #[tokio::test]
    async fn system_instruction_is_sent_with_every_turn() {
        let model = Arc::new(MockModel::with_text("ok"));
        let session = ChatSession::new(
            model.clone(),
            ChatOptions {
                model: "chat-model".into(),
                system_instruction: Some("be brief".into()),
            },
        );
        session.send_message("one").await.collect_text().await.unwrap();
        session.send_message("two").await.collect_text().await.unwrap();
        let requests = model.requests();
        assert_eq!(requests.len(), 2);
        for r in &requests {
            assert_eq!(r.model, "chat-model");
            assert_eq!(r.system_instruction.as_deref(), Some("be brief"));
        }
        assert_eq!(requests[1].contents.len(), 3);
    }
}
