//! # Strategist
//!
//! Startup strategy reports and a follow-up chat, generated by a hosted
//! generative-language model (Gemini `generateContent` REST API).
//!
//! A user supplies four facts about a business ([`BusinessInput`]) and optionally a
//! [`Geolocation`]. The [`Analyzer`] fans out grounded and structured generation
//! calls and assembles an [`AnalysisResult`]: SWOT analysis, audience profile,
//! market trends with web citations, local opportunities with maps citations,
//! marketing strategy, an executive summary and suggested follow-up questions.
//! A [`ChatSession`] then streams answers to follow-up questions.
//!
//! ## Main modules
//!
//! - [`markdown`]: the markdown subset the model writes in, rendered through a
//!   [`BlockSink`] into a [`markdown::Document`] or HTML.
//! - [`export`]: [`render_report_html`], the standalone HTML report.
//! - [`llm`]: [`GenerativeModel`] trait, [`GeminiClient`], [`MockModel`].
//! - [`prompts`]: prompt templates, schema descriptions and UI labels from YAML.
//! - [`analysis`]: [`Analyzer`], the orchestrator.
//! - [`chat`]: [`ChatSession`], [`ChatStream`], [`ChatEvent`], [`Transcript`].
//! - [`config`]: [`StrategistConfig`] read from the environment.
//! - [`model`]: domain types shared by all of the above.
//!
//! Key types are re-exported at crate root: `use strategist::{Analyzer, BusinessInput};`.

pub mod analysis;
pub mod chat;
pub mod config;
pub mod error;
pub mod export;
pub mod llm;
pub mod markdown;
pub mod model;
pub mod prompts;

pub use analysis::Analyzer;
pub use chat::{ChatEvent, ChatOptions, ChatSession, ChatStream, Transcript};
pub use config::StrategistConfig;
pub use error::StrategistError;
pub use export::render_report_html;
pub use llm::{
    GeminiClient, GenerateRequest, GenerativeModel, Generation, Grounding, MockModel, MockStream,
    RequestKind, TextChunk,
};
pub use markdown::{BlockSink, HeadingLevel, Inline};
pub use model::{
    AnalysisResult, BusinessInput, ChatMessage, ExecutiveSummary, Geolocation, GroundingChunk,
    MapsSource, Role, WebSource,
};
pub use prompts::{Labels, Prompts};
