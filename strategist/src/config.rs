//! Typed runtime configuration read from the process environment.
//!
//! Call `config::load_and_apply("strategist", None)` first so values from `.env`
//! and `~/.config/strategist/config.toml` are visible here.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::StrategistError;
use crate::llm::DEFAULT_GEMINI_BASE_URL;

pub const DEFAULT_ANALYSIS_MODEL: &str = "gemini-2.5-pro";
pub const DEFAULT_FAST_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_ANALYSIS_TEMPERATURE: f32 = 0.5;
/// Range the service accepts; NaN is outside it.
const TEMPERATURE_RANGE: std::ops::RangeInclusive<f32> = 0.0..=2.0;

/// Settings for the generation client, the orchestrator and the chat session.
#[derive(Clone, Debug)]
pub struct StrategistConfig {
    /// `GEMINI_API_KEY`, falling back to `API_KEY`.
    pub api_key: String,
    /// `GEMINI_BASE_URL`.
    pub base_url: String,
    /// Model for the structured core analysis (`STRATEGIST_ANALYSIS_MODEL`).
    pub analysis_model: String,
    /// Model for grounded, summary and question calls (`STRATEGIST_FAST_MODEL`).
    pub fast_model: String,
    /// `STRATEGIST_CHAT_MODEL`.
    pub chat_model: String,
    /// Temperature of the core analysis call (`STRATEGIST_TEMPERATURE`).
    pub analysis_temperature: f32,
    /// Whole-run limit for one analysis (`STRATEGIST_TIMEOUT_SECS`); `None` waits forever.
    pub timeout: Option<Duration>,
    /// Prompt file replacing the embedded prompts (`STRATEGIST_PROMPTS`).
    pub prompts_path: Option<PathBuf>,
    /// Output language named in every prompt (`STRATEGIST_LANGUAGE`); `None` keeps the prompt file's.
    pub language: Option<String>,
}

impl StrategistConfig {
    /// Config with the given key and defaults for everything else.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            analysis_model: DEFAULT_ANALYSIS_MODEL.to_string(),
            fast_model: DEFAULT_FAST_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            analysis_temperature: DEFAULT_ANALYSIS_TEMPERATURE,
            timeout: None,
            prompts_path: None,
            language: None,
        }
    }

    pub fn from_env() -> Result<Self, StrategistError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds config from an arbitrary key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StrategistError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("GEMINI_API_KEY").or_else(|| get("API_KEY")).ok_or_else(|| {
            StrategistError::Config("GEMINI_API_KEY (or API_KEY) is not set".to_string())
        })?;
        let mut config = Self::new(api_key);

        if let Some(v) = get("GEMINI_BASE_URL") {
            config.base_url = v;
        }
        if let Some(v) = get("STRATEGIST_ANALYSIS_MODEL") {
            config.analysis_model = v;
        }
        if let Some(v) = get("STRATEGIST_FAST_MODEL") {
            config.fast_model = v;
        }
        if let Some(v) = get("STRATEGIST_CHAT_MODEL") {
            config.chat_model = v;
        }
        if let Some(v) = get("STRATEGIST_TEMPERATURE") {
            let temperature: f32 = v.trim().parse().map_err(|_| {
                StrategistError::Config(format!("STRATEGIST_TEMPERATURE: not a number: {}", v))
            })?;
            if !TEMPERATURE_RANGE.contains(&temperature) {
                return Err(StrategistError::Config(format!(
                    "STRATEGIST_TEMPERATURE: must be between 0.0 and 2.0: {}",
                    v
                )));
            }
            config.analysis_temperature = temperature;
        }
        if let Some(v) = get("STRATEGIST_TIMEOUT_SECS") {
            let secs: u64 = v.trim().parse().map_err(|_| {
                StrategistError::Config(format!(
                    "STRATEGIST_TIMEOUT_SECS: not a whole number of seconds: {}",
                    v
                ))
            })?;
            config.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        config.prompts_path = get("STRATEGIST_PROMPTS").map(PathBuf::from);
        config.language = get("STRATEGIST_LANGUAGE");
        Ok(config)
    }
}
