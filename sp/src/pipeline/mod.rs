//! Generation pipeline
//!
//! PromptBuilder -> RetryingClient -> extract -> validate_plan -> PlanStore,
//! with every stage leaving a debug artifact and the status tracker moved at
//! stage boundaries. Extraction and validation failures trigger a bounded
//! number of regenerations; transport failures do not, since the client has
//! already spent its own retry budget.

mod error;

pub use error::GenerationError;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::artifacts::{ArtifactKind, DebugArtifactStore, ErrorReport};
use crate::config::Config;
use crate::domain::{GenerationRequest, StudyPlan, SurveyAnswers};
use crate::extract::extract;
use crate::llm::{LlmClient, RetryingClient};
use crate::prompts::{ModelParams, Prompt, PromptBuilder, PromptError};
use crate::state::{StatusHandle, spawn_progress_ticker};
use crate::storage::PlanStore;
use crate::validation::validate_plan;

/// Pipeline-level knobs
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// LLM rounds per request, the first included
    pub rounds: u32,
    pub progress_tick: Duration,
    pub expected_duration: Duration,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            rounds: config.generation_rounds(),
            progress_tick: Duration::from_millis(config.generation.progress_tick_ms),
            expected_duration: Duration::from_millis(config.generation.expected_duration_ms),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Runs survey answers through to a persisted plan
pub struct Pipeline {
    prompts: PromptBuilder,
    llm: RetryingClient,
    artifacts: Arc<DebugArtifactStore>,
    plans: Arc<dyn PlanStore>,
    status: StatusHandle,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        prompts: PromptBuilder,
        llm: RetryingClient,
        artifacts: Arc<DebugArtifactStore>,
        plans: Arc<dyn PlanStore>,
        status: StatusHandle,
        settings: PipelineSettings,
    ) -> Self {
        debug!(?settings, "Pipeline::new: called");
        Self {
            prompts,
            llm,
            artifacts,
            plans,
            status,
            settings,
        }
    }

    /// Wire a pipeline from configuration around the given transport
    pub fn from_config(
        config: &Config,
        client: Arc<dyn LlmClient>,
        artifacts: Arc<DebugArtifactStore>,
        plans: Arc<dyn PlanStore>,
        status: StatusHandle,
    ) -> Self {
        let prompts = PromptBuilder::new(ModelParams::from(&config.llm));
        let llm = RetryingClient::from_config(client, &config.llm, &config.retry, artifacts.clone());
        Self::new(prompts, llm, artifacts, plans, status, PipelineSettings::from_config(config))
    }

    pub fn status(&self) -> &StatusHandle {
        &self.status
    }

    /// Run one generation request to a terminal state
    ///
    /// Returns the persisted plan id. On failure the tracker holds a
    /// user-safe message and the full diagnostic is in the artifacts.
    pub async fn run(&self, survey: SurveyAnswers) -> Result<String, GenerationError> {
        debug!(rounds = self.settings.rounds, "run: called");
        let request = self.status.start(survey).await?;
        let _ticker = TickerGuard(spawn_progress_ticker(
            self.status.clone(),
            self.settings.progress_tick,
            self.settings.expected_duration,
        ));

        let result = self.generate(&request).await;

        let settled = match &result {
            Ok(plan_id) => self.status.complete(plan_id.as_str()).await,
            Err(e) => {
                error!(request_id = %request.id, stage = e.stage(), error = %e, "Generation failed");
                self.status.fail(e.user_message()).await
            }
        };

        if let Err(e) = settled {
            error!(request_id = %request.id, error = %e, "Failed to record terminal status");
        }
        result
    }

    /// Run detached; dropping the returned handle does not cancel generation
    ///
    /// The run itself happens in a worker task. If that task dies before
    /// settling, the request is failed here so it never stays `generating`.
    pub fn spawn(self: Arc<Self>, survey: SurveyAnswers) -> JoinHandle<Result<String, GenerationError>> {
        debug!("spawn: called");
        tokio::spawn(async move {
            let worker = tokio::spawn({
                let pipeline = self.clone();
                async move { pipeline.run(survey).await }
            });
            match worker.await {
                Ok(result) => result,
                Err(e) => self.settle_dead_worker(e).await,
            }
        })
    }

    async fn settle_dead_worker(&self, join_error: JoinError) -> Result<String, GenerationError> {
        let request_id = self.status.snapshot().await.ok().flatten().map(|r| r.id);
        error!(?request_id, error = %join_error, "Generation task died before settling");

        let mut report = ErrorReport::new("pipeline", join_error.to_string());
        if let Some(id) = &request_id {
            report = report.request(id);
        }
        self.record_error(report).await;

        let err = GenerationError::Aborted(join_error.to_string());
        if let Err(e) = self.status.fail(err.user_message()).await {
            warn!(error = %e, "Could not fail the abandoned request");
        }
        Err(err)
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let prompt = match self.prompts.build(&request.survey_answers) {
            Ok(prompt) => prompt,
            Err(e) => {
                let violations: Vec<String> = match &e {
                    PromptError::InvalidSurvey(errors) => errors.iter().map(|e| e.to_string()).collect(),
                    PromptError::Template(_) => Vec::new(),
                };
                self.record_error(ErrorReport::new("prompt", e.to_string()).request(&request.id).violations(violations))
                    .await;
                return Err(e.into());
            }
        };

        let plan = self.generate_plan(request, &prompt).await?;

        self.record(ArtifactKind::LocalPlan, serde_json::to_vec_pretty(&plan).ok()).await;
        let plan_id = match self.plans.save(&request.id, &plan).await {
            Ok(plan_id) => plan_id,
            Err(e) => {
                self.record_error(ErrorReport::new("storage", e.to_string()).request(&request.id))
                    .await;
                return Err(e.into());
            }
        };

        info!(request_id = %request.id, %plan_id, "Study plan generated");
        Ok(plan_id)
    }

    /// Ask the model for a plan, regenerating on unusable output
    async fn generate_plan(&self, request: &GenerationRequest, prompt: &Prompt) -> Result<StudyPlan, GenerationError> {
        let rounds = self.settings.rounds.max(1);
        let mut round = 0;

        loop {
            round += 1;
            info!(request_id = %request.id, round, rounds, "Requesting study plan");
            self.record(ArtifactKind::Prompt, Some(prompt.to_artifact().into_bytes())).await;

            let err = match self.llm.complete(prompt, &request.id).await {
                Ok(raw) => match self.accept(request, round, &raw.text).await {
                    Ok(plan) => return Ok(plan),
                    Err(e) => e,
                },
                Err(e) => GenerationError::from(e),
            };

            if !err.is_regenerable() || round >= rounds {
                return Err(err);
            }
            warn!(request_id = %request.id, round, error = %err, "Unusable plan, regenerating");
        }
    }

    /// Extract and validate one completion, recording why it was unusable
    async fn accept(&self, request: &GenerationRequest, round: u32, raw: &str) -> Result<StudyPlan, GenerationError> {
        let extracted = match extract(raw) {
            Ok(extracted) => extracted,
            Err(e) => {
                let report = ErrorReport::new("extraction", e.to_string())
                    .request(&request.id)
                    .attempt(round)
                    .raw_length(e.raw_length);
                self.record_error(report).await;
                return Err(e.into());
            }
        };

        match validate_plan(&extracted.payload) {
            Ok(plan) => Ok(plan),
            Err(violations) => {
                for violation in &violations {
                    debug!(request_id = %request.id, round, %violation, "accept: violation");
                }
                let report = ErrorReport::new("validation", format!("{} violation(s)", violations.len()))
                    .request(&request.id)
                    .attempt(round)
                    .raw_length(raw.len())
                    .violations(&violations);
                self.record_error(report).await;
                Err(GenerationError::InvalidPlan(violations))
            }
        }
    }

    async fn record(&self, kind: ArtifactKind, content: Option<Vec<u8>>) {
        let Some(content) = content else {
            warn!(%kind, "Nothing to write for debug artifact");
            return;
        };
        if let Err(e) = self.artifacts.append(kind, content).await {
            warn!(%kind, error = %e, "Failed to write debug artifact");
        }
    }

    async fn record_error(&self, report: ErrorReport) {
        if let Err(e) = self.artifacts.append_json(ArtifactKind::Error, &report).await {
            warn!(error = %e, "Failed to write error artifact");
        }
    }
}

/// Stops the progress ticker when the run ends, including by unwinding
struct TickerGuard(JoinHandle<()>);

impl Drop for TickerGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}
