//! Prompt templates, schema field descriptions and UI labels loaded from YAML.
//!
//! Defaults are embedded from `strategist/prompts/strategist.yaml`; a file given by
//! `STRATEGIST_PROMPTS` is layered on top, so it only needs the keys it changes.
//! See [`load`], [`load_or_default`] and [`fill`].

mod load;

use serde::{Deserialize, Serialize};

use crate::model::BusinessInput;

pub use load::{default_from_embedded, load, load_or_default, LoadError};

/// Everything user-facing that is text: prompts, schema descriptions, labels.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Prompts {
    /// Output language named in prompts through `{language}`.
    pub language: String,
    pub analysis: AnalysisPrompts,
    pub schema: SchemaDescriptions,
    pub chat: ChatPrompts,
    pub labels: Labels,
}

/// Templates of the analysis run. Placeholders are listed per field.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisPrompts {
    /// `{name}`, `{description}`, `{target_audience}`, `{competitors}`.
    pub core: String,
    /// `{name}`, `{description}`.
    pub market_trends: String,
    /// `{name}`, `{description}`.
    pub local_opportunities: String,
    /// `{market_trends}`, `{local_opportunities}`.
    pub trends_summary: String,
    /// `{analysis}`.
    pub follow_up_questions: String,
    /// Concatenated analysis handed to the follow-up prompt.
    pub full_analysis: String,
}

/// Field descriptions placed in the structured-output schemas.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SchemaDescriptions {
    pub swot_analysis: String,
    pub swot_summary: String,
    pub target_audience_profile: String,
    pub target_audience_summary: String,
    pub marketing_strategy: String,
    pub marketing_strategy_summary: String,
    pub market_trends_summary: String,
    pub local_opportunities_summary: String,
    pub questions: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ChatPrompts {
    pub system_instruction: String,
}

/// Section titles and fixed UI strings.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Labels {
    /// `lang` attribute of the exported document.
    pub document_lang: String,
    /// `<title>` prefix of the exported document.
    pub document_title: String,
    /// Heading prefix of the report.
    pub report_title: String,
    pub executive_summary: String,
    pub swot: String,
    pub target_audience: String,
    pub market_trends: String,
    pub local_opportunities: String,
    pub marketing_strategy: String,
    pub sources: String,
    pub not_available: String,
    pub none: String,
    pub suggested_questions: String,
    pub chat_title: String,
    pub chat_greeting: String,
    pub chat_error: String,
    pub analysis_error: String,
}

impl Prompts {
    /// Replaces the output language when `language` is `Some`.
    pub fn with_language(mut self, language: Option<&str>) -> Self {
        if let Some(language) = language {
            self.language = language.to_string();
        }
        self
    }

    pub fn core_analysis(&self, input: &BusinessInput) -> String {
        fill(
            &self.analysis.core,
            &[
                ("language", self.language.as_str()),
                ("name", input.name.as_str()),
                ("description", input.description.as_str()),
                ("target_audience", input.target_audience.as_str()),
                ("competitors", input.competitors.as_str()),
            ],
        )
    }

    pub fn market_trends(&self, input: &BusinessInput) -> String {
        fill(
            &self.analysis.market_trends,
            &[
                ("language", self.language.as_str()),
                ("name", input.name.as_str()),
                ("description", input.description.as_str()),
            ],
        )
    }

    pub fn local_opportunities(&self, input: &BusinessInput) -> String {
        fill(
            &self.analysis.local_opportunities,
            &[
                ("language", self.language.as_str()),
                ("name", input.name.as_str()),
                ("description", input.description.as_str()),
            ],
        )
    }

    /// Summary prompt; a missing local text is replaced by the "not available" label.
    pub fn trends_summary(&self, market_trends: &str, local_opportunities: Option<&str>) -> String {
        let local = match local_opportunities {
            Some(text) if !text.is_empty() => text,
            _ => self.labels.not_available.as_str(),
        };
        fill(
            &self.analysis.trends_summary,
            &[
                ("language", self.language.as_str()),
                ("market_trends", market_trends),
                ("local_opportunities", local),
            ],
        )
    }

    /// Follow-up prompt built from the full analysis text.
    pub fn follow_up_questions(
        &self,
        swot_analysis: &str,
        target_audience_profile: &str,
        market_trends: &str,
        local_opportunities: Option<&str>,
        marketing_strategy: &str,
    ) -> String {
        let local = match local_opportunities {
            Some(text) if !text.is_empty() => text,
            _ => self.labels.none.as_str(),
        };
        let analysis = fill(
            &self.analysis.full_analysis,
            &[
                ("swot_analysis", swot_analysis),
                ("target_audience_profile", target_audience_profile),
                ("market_trends", market_trends),
                ("local_opportunities", local),
                ("marketing_strategy", marketing_strategy),
            ],
        );
        fill(
            &self.analysis.follow_up_questions,
            &[("language", self.language.as_str()), ("analysis", analysis.as_str())],
        )
    }

    pub fn chat_system_instruction(&self) -> String {
        fill(&self.chat.system_instruction, &[("language", self.language.as_str())])
    }
}

/// Replaces `{key}` placeholders in one pass.
///
/// Unknown keys stay as written, and braces inside substituted values are never
/// expanded again (model output fed back into a prompt may contain them).
pub fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let key = &after[..close];
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v, close))
        });
        match value {
            Some((v, close)) => {
                out.push_str(v);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> BusinessInput {
        BusinessInput {
            name: "Kopi Senja".into(),
            description: "specialty coffee".into(),
            target_audience: "students".into(),
            competitors: "Kopi Kenangan".into(),
        }
    }

    #[test]
    fn fill_replaces_known_keys_and_keeps_unknown() {
        let out = fill("a {x} b {y} {", &[("x", "1")]);
        assert_eq!(out, "a 1 b {y} {");
    }

    #[test]
    fn fill_does_not_expand_substituted_values() {
        let out = fill("{a}{b}", &[("a", "{b}"), ("b", "2")]);
        assert_eq!(out, "{b}2");
    }

    #[test]
    fn core_prompt_carries_every_business_field() {
        let prompts = default_from_embedded();
        let prompt = prompts.core_analysis(&input());
        for expected in ["Kopi Senja", "specialty coffee", "students", "Kopi Kenangan"] {
            assert!(prompt.contains(expected), "missing {expected}");
        }
        assert!(prompt.contains(&prompts.language));
        assert!(!prompt.contains("{name}"));
    }

    #[test]
    fn trends_summary_uses_not_available_for_missing_local_text() {
        let prompts = default_from_embedded();
        let prompt = prompts.trends_summary("alpha", None);
        assert!(prompt.contains("alpha"));
        assert!(prompt.contains(&prompts.labels.not_available));
    }

    #[test]
    fn follow_up_uses_none_label_for_missing_local_text() {
        let prompts = default_from_embedded();
        let prompt = prompts.follow_up_questions("s", "t", "m", None, "k");
        assert!(prompt.contains(&format!("Local opportunities: {}", prompts.labels.none)));
    }

    #[test]
    fn language_override_flows_into_prompts() {
        let prompts = default_from_embedded().with_language(Some("English"));
        assert!(prompts.chat_system_instruction().contains("English"));
        assert!(prompts.market_trends(&input()).contains("English"));
    }
}
