//! Domain types shared by the orchestrator, the chat session and the presentation layer.
//!
//! Field names serialize in camelCase so JSON output matches the shape the
//! generation service and downstream consumers use. Optional fields are skipped
//! when absent; they are never written as empty strings or empty arrays.

use serde::{Deserialize, Serialize};

/// Facts about the startup, as typed by the user.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessInput {
    pub name: String,
    pub description: String,
    pub target_audience: String,
    pub competitors: String,
}

impl BusinessInput {
    /// True when every field has non-whitespace content; the analyze action is
    /// only offered in that case.
    pub fn is_complete(&self) -> bool {
        [
            &self.name,
            &self.description,
            &self.target_audience,
            &self.competitors,
        ]
        .iter()
        .all(|f| !f.trim().is_empty())
    }
}

/// User position used for maps-grounded local analysis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Geolocation {
    pub latitude: f64,
    pub longitude: f64,
}

impl Geolocation {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Web citation attached to a search-grounded answer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WebSource {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewSnippet {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub author: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceAnswerSource {
    #[serde(default)]
    pub review_snippets: Vec<ReviewSnippet>,
}

/// Maps citation attached to a location-grounded answer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapsSource {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub place_answer_sources: Vec<PlaceAnswerSource>,
}

/// One grounding citation: exactly one of web or maps.
///
/// Externally tagged, so it reads and writes `{"web": {...}}` / `{"maps": {...}}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GroundingChunk {
    Web(WebSource),
    Maps(MapsSource),
}

impl GroundingChunk {
    pub fn uri(&self) -> &str {
        match self {
            GroundingChunk::Web(s) => &s.uri,
            GroundingChunk::Maps(s) => &s.uri,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            GroundingChunk::Web(s) => &s.title,
            GroundingChunk::Maps(s) => &s.title,
        }
    }
}

/// Short digest of each narrative section.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutiveSummary {
    pub swot: String,
    pub target_audience: String,
    pub market_trends: String,
    pub marketing_strategy: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_opportunities: Option<String>,
}

/// Result of one successful analysis run. Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub swot_analysis: String,
    pub target_audience_profile: String,
    pub market_trends: String,
    pub marketing_strategy: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_opportunities: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_trends_sources: Option<Vec<GroundingChunk>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_opportunities_sources: Option<Vec<GroundingChunk>>,
    pub executive_summary: ExecutiveSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_questions: Option<Vec<String>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One chat turn; also the unit of conversation history sent to the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}
