//! Display state of a chat panel, driven by [`ChatEvent`]s.

use crate::chat::ChatEvent;
use crate::model::{ChatMessage, Role};

/// Messages shown to the user, including the greeting and the reply being streamed.
///
/// Fragments are accumulated and the last model message is replaced with the
/// running text after each one, so every intermediate state is a prefix of the
/// final reply.
#[derive(Clone, Debug)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    error_text: String,
    pending: String,
    streaming: bool,
}

impl Transcript {
    /// Transcript holding only the greeting. `error_text` replaces a reply whose turn fails.
    pub fn with_greeting(greeting: impl Into<String>, error_text: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::model(greeting)],
            error_text: error_text.into(),
            pending: String::new(),
            streaming: false,
        }
    }

    /// Adds the user message and an empty reply placeholder.
    ///
    /// Returns `false` (and changes nothing) for blank text or while a reply is streaming.
    pub fn begin_turn(&mut self, text: &str) -> bool {
        if text.trim().is_empty() || self.streaming {
            return false;
        }
        self.messages.push(ChatMessage::user(text));
        self.messages.push(ChatMessage::model(""));
        self.pending.clear();
        self.streaming = true;
        true
    }

    pub fn apply(&mut self, event: &ChatEvent) {
        if !self.streaming {
            return;
        }
        match event {
            ChatEvent::Fragment(fragment) => {
                self.pending.push_str(fragment);
                let text = self.pending.clone();
                self.replace_reply(text);
            }
            ChatEvent::Done => self.streaming = false,
            ChatEvent::Error(_) => {
                let text = self.error_text.clone();
                self.replace_reply(text);
                self.streaming = false;
            }
            // partial text stays visible
            ChatEvent::Cancelled => self.streaming = false,
        }
    }

    fn replace_reply(&mut self, text: String) {
        if let Some(last) = self.messages.last_mut() {
            if last.role == Role::Model {
                last.text = text;
            }
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Text of the newest message.
    pub fn last_text(&self) -> &str {
        self.messages.last().map(|m| m.text.as_str()).unwrap_or("")
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Suggested questions are offered until the first turn starts.
    pub fn shows_suggestions(&self) -> bool {
        self.messages.len() <= 1
    }
}
