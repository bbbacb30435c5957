//! Per-row request execution with throttle-aware retry.
//!
//! [`RequestExecutor`] renders the prompt pair for one row and calls the
//! backend, retrying throttled attempts with exponential backoff. Template
//! failures are configuration defects and propagate immediately; service
//! failures abandon the row after a single attempt.

use std::sync::Arc;
use std::time::Duration;

use log::{error, warn};
use reqwest::Client;

use crate::backend::{Completion, CompletionBackend, CompletionRequest};
use crate::dataset::{ColumnMapping, Row};
use crate::error::Result;
use crate::prompt::PromptPair;

/// Retry behavior for throttled completion attempts.
///
/// Delay grows `initial_delay * multiplier^n`, capped at `max_delay`. Only
/// throttling is retried; every other failure abandons the row at once.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use promptsheet::executor::RetryPolicy;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.max_attempts, 3);
/// assert_eq!(policy.initial_delay, Duration::from_secs(1));
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Default: 3.
    pub max_attempts: u32,

    /// Delay before the first retry. Default: 1 second.
    pub initial_delay: Duration,

    /// Multiplier applied to the delay after each retry. Default: 2.0.
    pub multiplier: f64,

    /// Cap on any single delay. Default: 60 seconds.
    /// Prevents exponential blowup on sustained throttling.
    pub max_delay: Duration,

    /// Apply full jitter: random delay in `[0, computed_delay]`.
    /// Default: `false`, keeping the backoff schedule deterministic.
    pub jitter: bool,

    /// Honor the provider's `Retry-After` hint over the computed delay.
    /// Default: `true`.
    pub respect_retry_after: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
            jitter: false,
            respect_retry_after: true,
        }
    }
}

impl RetryPolicy {
    /// A policy with the given attempt limit and initial delay; everything
    /// else as per [`Default`].
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            ..Self::default()
        }
    }

    /// Enable full jitter on computed delays.
    pub fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }

    /// Calculate the delay for the retry following attempt N (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_secs_f64());
        let jittered = if self.jitter {
            fastrand::f64() * capped
        } else {
            capped
        };
        Duration::from_secs_f64(jittered)
    }
}

/// Executes one row's completion request against a backend, with retry.
///
/// Holds the HTTP client, the provider endpoint, the fixed model identifier,
/// and the [`RetryPolicy`]. Construct once per run and share by reference.
pub struct RequestExecutor {
    client: Client,
    base_url: String,
    backend: Arc<dyn CompletionBackend>,
    model: String,
    policy: RetryPolicy,
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("base_url", &self.base_url)
            .field("backend", &self.backend.name())
            .field("model", &self.model)
            .field("policy", &self.policy)
            .finish()
    }
}

impl RequestExecutor {
    /// Create an executor with a default HTTP client and retry policy.
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            backend,
            model: model.into(),
            policy: RetryPolicy::default(),
        }
    }

    /// Use a custom HTTP client (timeouts, proxies).
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Override the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Process one row: build the variable context, render both templates,
    /// and call the backend with throttle-aware retry.
    ///
    /// Returns `Ok(Some(text))` on success and `Ok(None)` when the row is
    /// abandoned, either on a non-transient failure (one attempt, no sleep)
    /// or when throttling outlasts every retry. Returns `Err` only for
    /// configuration defects (missing mapped column, template error), which
    /// would recur identically on every row and every retry.
    pub async fn execute(
        &self,
        row: &Row<'_>,
        mapping: &ColumnMapping,
        prompts: &PromptPair,
    ) -> Result<Option<String>> {
        let variables = mapping.context_for(row)?;
        let rendered = prompts.render(&variables)?;
        let request = CompletionRequest {
            model: self.model.clone(),
            system_prompt: rendered.system,
            user_prompt: rendered.user,
        };

        for attempt in 0..self.policy.max_attempts {
            match self
                .backend
                .complete(&self.client, &self.base_url, &request)
                .await
            {
                Completion::Generated(text) => return Ok(Some(text)),
                Completion::Throttled { retry_after } => {
                    // No sleep after the final attempt: no retry follows it.
                    if attempt + 1 == self.policy.max_attempts {
                        break;
                    }
                    let delay = match retry_after {
                        Some(hint) if self.policy.respect_retry_after => hint,
                        _ => self.policy.delay_for_attempt(attempt),
                    };
                    warn!(
                        "row {}: {} rate limited, retrying in {:?} (attempt {} of {})",
                        row.index(),
                        self.backend.name(),
                        delay,
                        attempt + 1,
                        self.policy.max_attempts
                    );
                    tokio::time::sleep(delay).await;
                }
                Completion::Failed(reason) => {
                    error!(
                        "row {}: {} request failed, dropping row: {}",
                        row.index(),
                        self.backend.name(),
                        reason
                    );
                    return Ok(None);
                }
            }
        }

        error!(
            "row {}: rate limited on all {} attempts, dropping row",
            row.index(),
            self.policy.max_attempts
        );
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::dataset::Dataset;
    use crate::error::{Error, TemplateError};

    fn sample_dataset() -> Dataset {
        Dataset::from_reader("name,topic\nAda,engines\n".as_bytes()).unwrap()
    }

    fn sample_mapping() -> ColumnMapping {
        ColumnMapping::new().map("name", "n").map("topic", "t")
    }

    fn sample_prompts() -> PromptPair {
        PromptPair::new("You are {n}.", "Write about {t}.")
    }

    fn executor(backend: Arc<MockBackend>) -> RequestExecutor {
        RequestExecutor::new(backend, "http://unused", "test-model")
    }

    #[test]
    fn test_delay_for_attempt_exponential() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(4));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let policy = RetryPolicy {
            max_delay: Duration::from_secs(5),
            ..RetryPolicy::default()
        };
        // Attempt 10 would be 1024s uncapped.
        assert_eq!(policy.delay_for_attempt(10), Duration::from_secs(5));
    }

    #[test]
    fn test_delay_jitter_in_range() {
        let policy = RetryPolicy::default().with_jitter();
        for _ in 0..100 {
            let d = policy.delay_for_attempt(1);
            assert!(d <= Duration::from_secs(2), "delay {:?} > 2s", d);
        }
    }

    #[tokio::test]
    async fn test_execute_success_first_attempt() {
        let backend = Arc::new(MockBackend::fixed("generated text"));
        let executor = executor(backend.clone());
        let dataset = sample_dataset();
        let row = dataset.row(0).unwrap();

        let result = executor
            .execute(&row, &sample_mapping(), &sample_prompts())
            .await
            .unwrap();
        assert_eq!(result.as_deref(), Some("generated text"));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_backoff_initial_then_doubled() {
        let backend = Arc::new(MockBackend::new(vec![
            Completion::Throttled { retry_after: None },
            Completion::Throttled { retry_after: None },
            Completion::Generated("ok".into()),
        ]));
        let executor = executor(backend.clone());
        let dataset = sample_dataset();
        let row = dataset.row(0).unwrap();

        let started = tokio::time::Instant::now();
        let result = executor
            .execute(&row, &sample_mapping(), &sample_prompts())
            .await
            .unwrap();

        assert_eq!(result.as_deref(), Some("ok"));
        assert_eq!(backend.calls(), 3);
        // 1s after the first throttle, 2s after the second.
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_failed_not_retried() {
        let backend = Arc::new(MockBackend::new(vec![Completion::Failed(
            "boom".into(),
        )]));
        let executor = executor(backend.clone());
        let dataset = sample_dataset();
        let row = dataset.row(0).unwrap();

        let started = tokio::time::Instant::now();
        let result = executor
            .execute(&row, &sample_mapping(), &sample_prompts())
            .await
            .unwrap();

        assert_eq!(result, None);
        assert_eq!(backend.calls(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_throttling_exhausts_attempts() {
        let backend = Arc::new(MockBackend::new(vec![Completion::Throttled {
            retry_after: None,
        }]));
        let executor = executor(backend.clone());
        let dataset = sample_dataset();
        let row = dataset.row(0).unwrap();

        let started = tokio::time::Instant::now();
        let result = executor
            .execute(&row, &sample_mapping(), &sample_prompts())
            .await
            .unwrap();

        assert_eq!(result, None);
        assert_eq!(backend.calls(), 3);
        // Sleeps between attempts only; no tail sleep after the last one.
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_honors_retry_after_hint() {
        let backend = Arc::new(MockBackend::new(vec![
            Completion::Throttled {
                retry_after: Some(Duration::from_secs(7)),
            },
            Completion::Generated("ok".into()),
        ]));
        let executor = executor(backend.clone());
        let dataset = sample_dataset();
        let row = dataset.row(0).unwrap();

        let started = tokio::time::Instant::now();
        let result = executor
            .execute(&row, &sample_mapping(), &sample_prompts())
            .await
            .unwrap();

        assert_eq!(result.as_deref(), Some("ok"));
        assert_eq!(started.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test]
    async fn test_execute_template_error_propagates() {
        let backend = Arc::new(MockBackend::fixed("never used"));
        let executor = executor(backend.clone());
        let dataset = sample_dataset();
        let row = dataset.row(0).unwrap();
        let prompts = PromptPair::new("You are {n}.", "Write about {unknown}.");

        let err = executor
            .execute(&row, &sample_mapping(), &prompts)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Template(TemplateError::MissingVariable { .. })
        ));
        // The backend was never called: the defect is in the configuration.
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_execute_missing_mapped_column() {
        let backend = Arc::new(MockBackend::fixed("never used"));
        let executor = executor(backend.clone());
        let dataset = sample_dataset();
        let row = dataset.row(0).unwrap();
        let mapping = ColumnMapping::new().map("absent", "a");
        let prompts = PromptPair::new("You are {a}.", "Go.");

        let err = executor.execute(&row, &mapping, &prompts).await.unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert_eq!(backend.calls(), 0);
    }
}
