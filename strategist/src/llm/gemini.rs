//! Gemini `generateContent` REST client implementing [`GenerativeModel`].
//!
//! Single-shot calls post to `{base}/models/{model}:generateContent`; streaming
//! calls post to `{base}/models/{model}:streamGenerateContent?alt=sse` and read
//! one `GenerateContentResponse` JSON object per SSE event. The API key goes in the
//! `x-goog-api-key` header.
//!
//! Request mapping:
//! - `response_schema` → `generationConfig.responseMimeType = application/json`
//!   and `generationConfig.responseSchema`
//! - `Grounding::WebSearch` → `tools: [{googleSearch: {}}]`
//! - `Grounding::Maps` → `tools: [{googleMaps: {}}]` and
//!   `toolConfig.retrievalConfig.latLng`
//!
//! Response text is the concatenation of the first candidate's text parts
//! (thought parts excluded). Citations come from
//! `groundingMetadata.groundingChunks`; entries that are neither `web` nor `maps`
//! are ignored.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::config::StrategistConfig;
use crate::error::StrategistError;
use crate::llm::{
    GenerateRequest, GenerativeModel, Generation, Grounding, RequestKind, SseBuffer, TextChunk,
    Usage,
};
use crate::model::{GroundingChunk, Role};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini REST client. Cheap to clone; the underlying connection pool is shared.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn from_config(config: &StrategistConfig) -> Self {
        Self::new(config.api_key.clone()).with_base_url(config.base_url.clone())
    }

    /// Overrides the API root (e.g. a proxy or a local test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.base_url.trim_end_matches('/'),
            model,
            method
        )
    }

    async fn post(
        &self,
        url: &str,
        request: &GenerateRequest,
    ) -> Result<reqwest::Response, StrategistError> {
        let body = WireRequest::from_request(request);
        debug!(
            kind = %request.kind,
            model = %request.model,
            url = %url,
            contents = request.contents.len(),
            schema = request.response_schema.is_some(),
            grounding = ?request.grounding,
            temperature = ?request.temperature,
            "gemini request"
        );
        if let Ok(js) = serde_json::to_string_pretty(&body) {
            trace!(kind = %request.kind, request = %js, "gemini request body");
        }

        let res = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(StrategistError::Service { status, body });
        }
        Ok(res)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> Result<Generation, StrategistError> {
        let url = self.endpoint(&request.model, "generateContent");
        let res = self.post(&url, &request).await?;
        let wire: WireResponse = res.json().await?;
        trace!(kind = %request.kind, response = ?wire, "gemini response");
        wire.into_generation(request.kind)
    }

    async fn generate_stream(
        &self,
        request: GenerateRequest,
        chunk_tx: Option<mpsc::Sender<TextChunk>>,
    ) -> Result<Generation, StrategistError> {
        let url = self.endpoint(&request.model, "streamGenerateContent?alt=sse");
        let res = self.post(&url, &request).await?;

        let mut body = res.bytes_stream();
        let mut sse = SseBuffer::new();
        let mut out = Generation::default();
        let mut events = 0usize;

        while let Some(bytes) = body.next().await {
            let bytes = bytes?;
            for data in sse.push(&bytes) {
                events += 1;
                let piece = decode_event(&data, &mut out)?;
                send_piece(&chunk_tx, piece).await;
            }
        }
        for data in sse.finish() {
            events += 1;
            let piece = decode_event(&data, &mut out)?;
            send_piece(&chunk_tx, piece).await;
        }

        debug!(
            kind = %request.kind,
            events,
            chars = out.text.chars().count(),
            usage = ?out.usage,
            "gemini stream finished"
        );
        if out.text.is_empty() {
            return Err(StrategistError::EmptyResponse(request.kind));
        }
        Ok(out)
    }
}

/// Parses one SSE payload, folds it into `out` and returns its new text.
fn decode_event(data: &str, out: &mut Generation) -> Result<String, StrategistError> {
    let wire: WireResponse = serde_json::from_str(data)
        .map_err(|e| StrategistError::Transport(format!("invalid stream event: {}", e)))?;
    if let Some(reason) = wire.block_reason() {
        return Err(StrategistError::Blocked(reason));
    }
    if let Some(usage) = wire.usage() {
        out.usage = Some(usage);
    }
    let Some(candidate) = wire.candidates.into_iter().next() else {
        return Ok(String::new());
    };
    out.grounding.extend(candidate.grounding_chunks());
    let piece = candidate.text();
    out.text.push_str(&piece);
    Ok(piece)
}

async fn send_piece(chunk_tx: &Option<mpsc::Sender<TextChunk>>, piece: String) {
    if piece.is_empty() {
        return;
    }
    if let Some(tx) = chunk_tx {
        let _ = tx.send(TextChunk { text: piece }).await;
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest<'a> {
    contents: Vec<WireContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<WireGenerationConfig<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<Value>,
}

#[derive(Serialize)]
struct WireContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<WirePart<'a>>,
}

#[derive(Serialize)]
struct WirePart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl<'a> WireRequest<'a> {
    fn from_request(request: &'a GenerateRequest) -> Self {
        let contents = request
            .contents
            .iter()
            .map(|m| WireContent {
                role: Some(match m.role {
                    Role::User => "user",
                    Role::Model => "model",
                }),
                parts: vec![WirePart { text: &m.text }],
            })
            .collect();

        let system_instruction = request.system_instruction.as_deref().map(|s| WireContent {
            role: None,
            parts: vec![WirePart { text: s }],
        });

        let generation_config =
            if request.response_schema.is_some() || request.temperature.is_some() {
                Some(WireGenerationConfig {
                    response_mime_type: request
                        .response_schema
                        .as_ref()
                        .map(|_| "application/json"),
                    response_schema: request.response_schema.as_ref(),
                    temperature: request.temperature,
                })
            } else {
                None
            };

        let (tools, tool_config) = match request.grounding {
            None => (Vec::new(), None),
            Some(Grounding::WebSearch) => (vec![json!({ "googleSearch": {} })], None),
            Some(Grounding::Maps {
                latitude,
                longitude,
            }) => (
                vec![json!({ "googleMaps": {} })],
                Some(json!({
                    "retrievalConfig": {
                        "latLng": { "latitude": latitude, "longitude": longitude }
                    }
                })),
            ),
        };

        Self {
            contents,
            system_instruction,
            generation_config,
            tools,
            tool_config,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
    prompt_feedback: Option<WirePromptFeedback>,
    usage_metadata: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCandidate {
    content: Option<WireCandidateContent>,
    grounding_metadata: Option<WireGroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct WireCandidateContent {
    #[serde(default)]
    parts: Vec<WireResponsePart>,
}

#[derive(Debug, Deserialize)]
struct WireResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireGroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

impl WireCandidate {
    fn text(&self) -> String {
        self.content
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter(|p| !p.thought)
            .filter_map(|p| p.text.as_deref())
            .collect()
    }

    fn grounding_chunks(&self) -> Vec<GroundingChunk> {
        self.grounding_metadata
            .iter()
            .flat_map(|m| m.grounding_chunks.iter())
            .filter_map(|v| serde_json::from_value::<GroundingChunk>(v.clone()).ok())
            .collect()
    }
}

impl WireResponse {
    fn block_reason(&self) -> Option<String> {
        self.prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.clone())
    }

    fn usage(&self) -> Option<Usage> {
        self.usage_metadata.as_ref().map(|u| Usage {
            prompt_tokens: u.prompt_token_count,
            candidates_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        })
    }

    fn into_generation(self, kind: RequestKind) -> Result<Generation, StrategistError> {
        let usage = self.usage();
        if self.candidates.is_empty() {
            return Err(match self.block_reason() {
                Some(reason) => StrategistError::Blocked(reason),
                None => StrategistError::EmptyResponse(kind),
            });
        }
        let candidate = &self.candidates[0];
        Ok(Generation {
            text: candidate.text(),
            grounding: candidate.grounding_chunks(),
            usage,
        })
    }
}
