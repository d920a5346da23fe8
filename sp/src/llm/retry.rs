//! Retry, backoff and timeout around a single-attempt [`LlmClient`]

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, info, warn};

use super::{ChatRequest, LlmClient, LlmError, RawCompletion};
use crate::artifacts::{ArtifactKind, DebugArtifactStore, ErrorReport};
use crate::config::{LlmConfig, RetryConfig};
use crate::prompts::Prompt;

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { delay: Duration },
    GiveUp,
}

/// Bounded exponential backoff with jitter
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Fraction of the delay randomized either way, 0.0 to 1.0
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms.max(config.initial_backoff_ms)),
            jitter: config.jitter.clamp(0.0, 1.0),
        }
    }

    /// Delay after the given failed attempt (1-based)
    ///
    /// `sample` is a uniform draw in `[0, 1)`; 0.5 yields the unjittered delay.
    pub fn backoff(&self, attempt: u32, sample: f64) -> Duration {
        let exponent = attempt.saturating_sub(1).min(30);
        let base = self
            .initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff);
        let factor = 1.0 + self.jitter * (2.0 * sample.clamp(0.0, 1.0) - 1.0);
        base.mul_f64(factor.max(0.0)).min(self.max_backoff)
    }

    /// Decide whether to retry after attempt `attempt` failed with `err`
    pub fn decide(&self, attempt: u32, err: &LlmError, sample: f64) -> RetryDecision {
        if !err.is_retryable() || attempt >= self.max_attempts {
            return RetryDecision::GiveUp;
        }

        let mut delay = self.backoff(attempt, sample);
        if let Some(requested) = err.retry_after() {
            delay = delay.max(requested.min(self.max_backoff));
        }
        RetryDecision::Retry { delay }
    }
}

/// LLM client with per-attempt timeout and bounded retries
///
/// Every attempt leaves a `response` or `error` artifact behind. Artifact
/// write failures are logged and never fail the request.
pub struct RetryingClient {
    inner: Arc<dyn LlmClient>,
    policy: RetryPolicy,
    timeout: Duration,
    artifacts: Arc<DebugArtifactStore>,
}

impl RetryingClient {
    pub fn new(
        inner: Arc<dyn LlmClient>,
        policy: RetryPolicy,
        timeout: Duration,
        artifacts: Arc<DebugArtifactStore>,
    ) -> Self {
        Self {
            inner,
            policy,
            timeout,
            artifacts,
        }
    }

    /// Build from the `llm` and `retry` config sections
    pub fn from_config(
        inner: Arc<dyn LlmClient>,
        llm: &LlmConfig,
        retry: &RetryConfig,
        artifacts: Arc<DebugArtifactStore>,
    ) -> Self {
        Self::new(inner, RetryPolicy::from_config(retry), llm.timeout(), artifacts)
    }

    /// Send the prompt, retrying transient failures
    pub async fn complete(&self, prompt: &Prompt, request_id: &str) -> Result<RawCompletion, LlmError> {
        debug!(%request_id, max_attempts = self.policy.max_attempts, "RetryingClient::complete: called");
        let request = ChatRequest::from_prompt(prompt);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let started = Instant::now();

            let err = match self.attempt(&request).await {
                Ok(response) => {
                    let latency = started.elapsed();
                    info!(
                        %request_id,
                        attempt,
                        latency_ms = latency.as_millis() as u64,
                        text_len = response.text.len(),
                        "LLM attempt succeeded"
                    );
                    self.record(ArtifactKind::Response, response.text.as_bytes().to_vec()).await;
                    return Ok(RawCompletion {
                        text: response.text,
                        attempt,
                        latency,
                        http_status: response.http_status,
                    });
                }
                Err(e) => e,
            };

            let retryable = err.is_retryable();
            warn!(%request_id, attempt, retryable, error = %err, "LLM attempt failed");
            let report = ErrorReport::new("llm", err.to_string())
                .request(request_id)
                .attempt(attempt)
                .retryable(retryable)
                .http_status(err.status());
            self.record_json(&report).await;

            let sample = rand::rng().random::<f64>();
            match self.policy.decide(attempt, &err, sample) {
                RetryDecision::Retry { delay } => {
                    debug!(attempt, delay_ms = delay.as_millis() as u64, "complete: backing off");
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::GiveUp if retryable => {
                    return Err(LlmError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
                RetryDecision::GiveUp => return Err(err),
            }
        }
    }

    async fn attempt(&self, request: &ChatRequest) -> Result<super::CompletionResponse, LlmError> {
        match tokio::time::timeout(self.timeout, self.inner.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(self.timeout)),
        }
    }

    async fn record(&self, kind: ArtifactKind, content: Vec<u8>) {
        if let Err(e) = self.artifacts.append(kind, content).await {
            warn!(%kind, error = %e, "Failed to write debug artifact");
        }
    }

    async fn record_json(&self, report: &ErrorReport) {
        if let Err(e) = self.artifacts.append_json(ArtifactKind::Error, report).await {
            warn!(error = %e, "Failed to write error artifact");
        }
    }
}
