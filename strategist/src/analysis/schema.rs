//! Structured-output schemas (service dialect) and the typed payloads they describe.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::StrategistError;
use crate::llm::RequestKind;
use crate::prompts::SchemaDescriptions;

/// Payload of the core analysis call.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CoreAnalysis {
    pub swot_analysis: String,
    pub swot_summary: String,
    pub target_audience_profile: String,
    pub target_audience_summary: String,
    pub marketing_strategy: String,
    pub marketing_strategy_summary: String,
}

/// Payload of the trends summary call.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrendsSummary {
    pub market_trends_summary: String,
    #[serde(default)]
    pub local_opportunities_summary: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct FollowUpQuestions {
    pub questions: Vec<String>,
}

fn string_field(description: &str) -> Value {
    json!({ "type": "STRING", "description": description })
}

pub fn core_analysis_schema(d: &SchemaDescriptions) -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "swotAnalysis": string_field(&d.swot_analysis),
            "swotSummary": string_field(&d.swot_summary),
            "targetAudienceProfile": string_field(&d.target_audience_profile),
            "targetAudienceSummary": string_field(&d.target_audience_summary),
            "marketingStrategy": string_field(&d.marketing_strategy),
            "marketingStrategySummary": string_field(&d.marketing_strategy_summary),
        },
        "required": [
            "swotAnalysis",
            "swotSummary",
            "targetAudienceProfile",
            "targetAudienceSummary",
            "marketingStrategy",
            "marketingStrategySummary"
        ],
    })
}

pub fn trends_summary_schema(d: &SchemaDescriptions) -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "marketTrendsSummary": string_field(&d.market_trends_summary),
            "localOpportunitiesSummary": string_field(&d.local_opportunities_summary),
        },
        "required": ["marketTrendsSummary", "localOpportunitiesSummary"],
    })
}

pub fn follow_up_questions_schema(d: &SchemaDescriptions) -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "questions": {
                "type": "ARRAY",
                "description": d.questions,
                "items": { "type": "STRING" },
            },
        },
        "required": ["questions"],
    })
}

/// Parses structured response text into `T`.
///
/// Surrounding whitespace and a Markdown code fence (```` ```json ... ``` ````) are removed first.
pub fn parse_structured<T: DeserializeOwned>(kind: RequestKind, text: &str) -> Result<T, StrategistError> {
    let body = strip_code_fence(text.trim());
    serde_json::from_str(body).map_err(|e| StrategistError::Parse {
        kind,
        message: e.to_string(),
    })
}

fn strip_code_fence(text: &str) -> &str {
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    let Some(inner) = inner.strip_suffix("```") else {
        return text;
    };
    // drop the info string (`json`) on the opening line
    match inner.find('\n') {
        Some(nl) => inner[nl + 1..].trim(),
        None => inner.trim(),
    }
}
