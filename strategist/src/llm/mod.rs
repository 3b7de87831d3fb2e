//! Generation service boundary.
//!
//! The orchestrator and the chat session depend on [`GenerativeModel`]; this module
//! defines the trait, the request/response types, the Gemini REST client and a
//! mock implementation.
//!
//! # Streaming Support
//!
//! `generate_stream()` accepts an optional `Sender<TextChunk>` for emitting text as
//! it arrives. [`GeminiClient`] reads the service's SSE stream and sends one chunk
//! per event; implementations without streaming fall back to the default, which
//! calls `generate()` and sends the full text as one chunk.

mod gemini;
mod mock;
mod sse;

pub use gemini::{GeminiClient, DEFAULT_GEMINI_BASE_URL};
pub use mock::{MockModel, MockStream};
pub use sse::SseBuffer;

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::StrategistError;
use crate::model::{ChatMessage, GroundingChunk, Role};

/// Purpose of a request. Not sent to the service; used in logs, errors and test doubles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestKind {
    CoreAnalysis,
    MarketTrends,
    LocalOpportunities,
    TrendsSummary,
    FollowUpQuestions,
    Chat,
}

impl RequestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestKind::CoreAnalysis => "core_analysis",
            RequestKind::MarketTrends => "market_trends",
            RequestKind::LocalOpportunities => "local_opportunities",
            RequestKind::TrendsSummary => "trends_summary",
            RequestKind::FollowUpQuestions => "follow_up_questions",
            RequestKind::Chat => "chat",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retrieval tool the service should ground the answer on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Grounding {
    WebSearch,
    Maps { latitude: f64, longitude: f64 },
}

/// One generation call: prompt or history plus its configuration bag.
#[derive(Clone, Debug)]
pub struct GenerateRequest {
    pub kind: RequestKind,
    pub model: String,
    pub contents: Vec<ChatMessage>,
    pub system_instruction: Option<String>,
    /// JSON schema (service dialect) the response text must satisfy.
    pub response_schema: Option<Value>,
    pub grounding: Option<Grounding>,
    pub temperature: Option<f32>,
}

impl GenerateRequest {
    /// Single user prompt.
    pub fn prompt(kind: RequestKind, model: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with_history(kind, model, vec![ChatMessage::user(text)])
    }

    pub fn with_history(
        kind: RequestKind,
        model: impl Into<String>,
        contents: Vec<ChatMessage>,
    ) -> Self {
        Self {
            kind,
            model: model.into(),
            contents,
            system_instruction: None,
            response_schema: None,
            grounding: None,
            temperature: None,
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    pub fn with_grounding(mut self, grounding: Grounding) -> Self {
        self.grounding = Some(grounding);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Text of the last user message (the prompt for single-turn requests).
    pub fn last_user_text(&self) -> &str {
        self.contents
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.text.as_str())
            .unwrap_or("")
    }
}

/// Token usage reported by the service for one call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub candidates_tokens: u32,
    pub total_tokens: u32,
}

/// Response of one generation call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Generation {
    pub text: String,
    /// Citations from grounding; empty when the call was not grounded or cited nothing.
    pub grounding: Vec<GroundingChunk>,
    pub usage: Option<Usage>,
}

impl Generation {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_grounding(mut self, grounding: Vec<GroundingChunk>) -> Self {
        self.grounding = grounding;
        self
    }
}

/// Incremental text fragment of a streaming call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextChunk {
    pub text: String,
}

/// Text generation service: single-shot and streaming calls.
///
/// **Interaction**: used by [`Analyzer`](crate::Analyzer) (single-shot) and
/// [`ChatSession`](crate::ChatSession) (streaming).
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> Result<Generation, StrategistError>;

    /// Streaming variant. When `chunk_tx` is `Some`, fragments are sent as they
    /// arrive; the complete [`Generation`] is still returned at the end.
    ///
    /// Default implementation calls `generate()` and sends the full text as one chunk.
    async fn generate_stream(
        &self,
        request: GenerateRequest,
        chunk_tx: Option<mpsc::Sender<TextChunk>>,
    ) -> Result<Generation, StrategistError> {
        let generation = self.generate(request).await?;
        if let Some(tx) = chunk_tx {
            if !generation.text.is_empty() {
                let _ = tx
                    .send(TextChunk {
                        text: generation.text.clone(),
                    })
                    .await;
            }
        }
        Ok(generation)
    }
}
