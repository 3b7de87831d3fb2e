//! Analysis orchestrator: one business description in, one [`AnalysisResult`] out.
//!
//! A run issues up to five generation calls:
//!
//! 1. core analysis (analysis model, structured JSON),
//! 2. market trends (fast model, web-search grounding),
//! 3. local opportunities (fast model, maps grounding; only with a geolocation),
//! 4. trends summary (fast model, structured JSON),
//! 5. follow-up questions (fast model, structured JSON).
//!
//! Calls 1-3 run concurrently. 4 starts once all of them have completed, and 5
//! once 4 has. Any failure fails the whole run; there is no partial result.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use strategist::{Analyzer, BusinessInput, GeminiClient, StrategistConfig};
//! # async fn demo() -> Result<(), strategist::StrategistError> {
//! let config = StrategistConfig::from_env()?;
//! let analyzer = Analyzer::from_config(Arc::new(GeminiClient::from_config(&config)), &config);
//! let input = BusinessInput {
//!     name: "Kopi Senja".into(),
//!     description: "Specialty coffee shop near campus".into(),
//!     target_audience: "University students".into(),
//!     competitors: "Kopi Kenangan, Janji Jiwa".into(),
//! };
//! let result = analyzer.analyze(&input, None).await?;
//! println!("{}", result.executive_summary.swot);
//! # Ok(())
//! # }
//! ```

mod schema;

pub use schema::{
    core_analysis_schema, follow_up_questions_schema, parse_structured, trends_summary_schema,
    CoreAnalysis, FollowUpQuestions, TrendsSummary,
};

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::config::{
    StrategistConfig, DEFAULT_ANALYSIS_MODEL, DEFAULT_ANALYSIS_TEMPERATURE, DEFAULT_FAST_MODEL,
};
use crate::error::StrategistError;
use crate::llm::{GenerateRequest, GenerativeModel, Generation, Grounding, RequestKind};
use crate::model::{AnalysisResult, BusinessInput, ExecutiveSummary, Geolocation, GroundingChunk};
use crate::prompts::{self, Prompts};

/// Runs analyses against a [`GenerativeModel`]. Cheap to share; holds no per-run state.
pub struct Analyzer {
    model: Arc<dyn GenerativeModel>,
    prompts: Arc<Prompts>,
    analysis_model: String,
    fast_model: String,
    temperature: f32,
    timeout: Option<Duration>,
}

impl Analyzer {
    /// Analyzer with default models, temperature and no timeout.
    pub fn new(model: Arc<dyn GenerativeModel>, prompts: Prompts) -> Self {
        Self {
            model,
            prompts: Arc::new(prompts),
            analysis_model: DEFAULT_ANALYSIS_MODEL.to_string(),
            fast_model: DEFAULT_FAST_MODEL.to_string(),
            temperature: DEFAULT_ANALYSIS_TEMPERATURE,
            timeout: None,
        }
    }

    /// Models, temperature, timeout, prompt file and language from `config`.
    pub fn from_config(model: Arc<dyn GenerativeModel>, config: &StrategistConfig) -> Self {
        let prompts = prompts::load_or_default(config.prompts_path.as_deref())
            .with_language(config.language.as_deref());
        Self::new(model, prompts)
            .with_models(config.analysis_model.clone(), config.fast_model.clone())
            .with_temperature(config.analysis_temperature)
            .with_timeout(config.timeout)
    }

    pub fn with_models(mut self, analysis: impl Into<String>, fast: impl Into<String>) -> Self {
        self.analysis_model = analysis.into();
        self.fast_model = fast.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Limits the whole run; `None` waits as long as the service does.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn prompts(&self) -> &Prompts {
        &self.prompts
    }

    /// Produces a full analysis, or the first error any step raised.
    ///
    /// Without `location` the local-opportunity call is skipped and the local
    /// fields of the result are absent.
    pub async fn analyze(
        &self,
        input: &BusinessInput,
        location: Option<Geolocation>,
    ) -> Result<AnalysisResult, StrategistError> {
        let span = info_span!("analysis", run_id = %Uuid::new_v4());
        let run = self.run(input, location).instrument(span);
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .map_err(|_| StrategistError::TimedOut(limit))?,
            None => run.await,
        }
    }

    /// Like [`analyze`](Self::analyze), but stops with [`StrategistError::Cancelled`]
    /// as soon as `cancel` fires. Outstanding calls are dropped.
    pub async fn analyze_with_cancel(
        &self,
        input: &BusinessInput,
        location: Option<Geolocation>,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, StrategistError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(StrategistError::Cancelled),
            result = self.analyze(input, location) => result,
        }
    }

    async fn run(
        &self,
        input: &BusinessInput,
        location: Option<Geolocation>,
    ) -> Result<AnalysisResult, StrategistError> {
        let started = Instant::now();
        info!(business = %input.name, local = location.is_some(), "analysis started");

        let core = self.model.generate(self.core_request(input));
        let trends = self.model.generate(self.trends_request(input));
        let local = async {
            match location {
                Some(at) => self.model.generate(self.local_request(input, at)).await.map(Some),
                None => Ok(None),
            }
        };
        let (core, trends, local) = tokio::try_join!(core, trends, local)?;
        debug!(
            trends_sources = trends.grounding.len(),
            local_sources = local.as_ref().map(|g| g.grounding.len()),
            "first stage complete"
        );

        let core: CoreAnalysis = parse_structured(RequestKind::CoreAnalysis, &core.text)?;
        let local_text = local.as_ref().map(|g| g.text.as_str());

        let summary = self.model.generate(self.summary_request(&trends.text, local_text)).await?;
        let summary: TrendsSummary = parse_structured(RequestKind::TrendsSummary, &summary.text)?;

        let questions = self
            .model
            .generate(self.questions_request(&core, &trends.text, local_text))
            .await?;
        let questions: FollowUpQuestions =
            parse_structured(RequestKind::FollowUpQuestions, &questions.text)?;

        let has_local_text = local_text.is_some_and(|t| !t.is_empty());
        let executive_summary = ExecutiveSummary {
            swot: core.swot_summary,
            target_audience: core.target_audience_summary,
            market_trends: summary.market_trends_summary,
            marketing_strategy: core.marketing_strategy_summary,
            local_opportunities: has_local_text.then_some(summary.local_opportunities_summary),
        };
        let suggested: Vec<String> = questions
            .questions
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect();

        let (local_opportunities, local_opportunities_sources) = match local {
            Some(Generation {
                text, grounding, ..
            }) => (Some(text), non_empty(grounding)),
            None => (None, None),
        };
        let result = AnalysisResult {
            swot_analysis: core.swot_analysis,
            target_audience_profile: core.target_audience_profile,
            market_trends: trends.text,
            marketing_strategy: core.marketing_strategy,
            local_opportunities,
            market_trends_sources: non_empty(trends.grounding),
            local_opportunities_sources,
            executive_summary,
            suggested_questions: (!suggested.is_empty()).then_some(suggested),
        };
        info!(elapsed_ms = started.elapsed().as_millis() as u64, "analysis finished");
        Ok(result)
    }

    fn core_request(&self, input: &BusinessInput) -> GenerateRequest {
        GenerateRequest::prompt(
            RequestKind::CoreAnalysis,
            &self.analysis_model,
            self.prompts.core_analysis(input),
        )
        .with_schema(core_analysis_schema(&self.prompts.schema))
        .with_temperature(self.temperature)
    }

    fn trends_request(&self, input: &BusinessInput) -> GenerateRequest {
        GenerateRequest::prompt(
            RequestKind::MarketTrends,
            &self.fast_model,
            self.prompts.market_trends(input),
        )
        .with_grounding(Grounding::WebSearch)
    }

    fn local_request(&self, input: &BusinessInput, at: Geolocation) -> GenerateRequest {
        GenerateRequest::prompt(
            RequestKind::LocalOpportunities,
            &self.fast_model,
            self.prompts.local_opportunities(input),
        )
        .with_grounding(Grounding::Maps {
            latitude: at.latitude,
            longitude: at.longitude,
        })
    }

    fn summary_request(&self, market_trends: &str, local: Option<&str>) -> GenerateRequest {
        GenerateRequest::prompt(
            RequestKind::TrendsSummary,
            &self.fast_model,
            self.prompts.trends_summary(market_trends, local),
        )
        .with_schema(trends_summary_schema(&self.prompts.schema))
    }

    fn questions_request(
        &self,
        core: &CoreAnalysis,
        market_trends: &str,
        local: Option<&str>,
    ) -> GenerateRequest {
        let prompt = self.prompts.follow_up_questions(
            &core.swot_analysis,
            &core.target_audience_profile,
            market_trends,
            local,
            &core.marketing_strategy,
        );
        GenerateRequest::prompt(RequestKind::FollowUpQuestions, &self.fast_model, prompt)
            .with_schema(follow_up_questions_schema(&self.prompts.schema))
    }
}

fn non_empty(chunks: Vec<GroundingChunk>) -> Option<Vec<GroundingChunk>> {
    (!chunks.is_empty()).then_some(chunks)
}
