//! Prioritized fallback across extractors, with per-extractor retry
//!
//! For one request the orchestrator:
//! 1. asks the registry which extractors support the URL,
//! 2. tries a caller-preferred extractor first, if one was named,
//! 3. walks the rest in fallback priority order, retrying each one on
//!    transport faults with linear backoff,
//! 4. returns the first success, or a single aggregate failure.
//!
//! It keeps no per-call state between calls, so independent requests can run
//! concurrently against one shared instance.

use crate::extractor::cobalt::CobaltExtractor;
use crate::extractor::gallery_dl::GalleryDlExtractor;
use crate::extractor::models::{
    ErrorKind, ExtractRequest, ExtractedMedia, ExtractionFailure, ExtractionOutcome,
};
use crate::extractor::registry::ExtractorRegistry;
use crate::extractor::simple::SimpleExtractor;
use crate::extractor::traits::{Extractor, ExtractorDescriptor};
use crate::extractor::ytdlp::YtDlpExtractor;
use crate::utils::config::{ExtractorSettings, DEFAULT_FALLBACK_ORDER};
use crate::utils::error::SettingsError;
use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Preference value meaning "no preference"
pub const AUTO: &str = "auto";

const ALL_FAILED_MESSAGE: &str =
    "All extractors failed; check the network connection or try again later";

/// Per-extractor retry settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per extractor, including the first
    pub max_attempts: u32,
    /// Wait before attempt `n + 1` is `n * base_delay`
    pub base_delay: Duration,
    /// Upper bound on one attempt; exceeding it counts as a network error
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_millis(1000),
            attempt_timeout: None,
        }
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &ExtractorSettings) -> Self {
        Self {
            max_attempts: settings.max_retries,
            base_delay: settings.retry_base_delay(),
            attempt_timeout: settings.attempt_timeout(),
        }
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// Result of running one extractor through its retry budget
enum Attempted {
    Succeeded(ExtractedMedia),
    Exhausted(ExtractionFailure),
    Cancelled,
}

/// Extraction orchestrator
///
/// Holds the registry behind a copy-on-register snapshot: every call works
/// on the `Arc` it grabbed at the start, and [`ExtractionOrchestrator::register`]
/// publishes a fresh registry instead of mutating the shared one.
pub struct ExtractionOrchestrator {
    registry: RwLock<Arc<ExtractorRegistry>>,
    fallback_order: Vec<String>,
    policy: RetryPolicy,
}

impl ExtractionOrchestrator {
    pub fn new(registry: ExtractorRegistry) -> Self {
        Self {
            registry: RwLock::new(Arc::new(registry)),
            fallback_order: DEFAULT_FALLBACK_ORDER.iter().map(|s| s.to_string()).collect(),
            policy: RetryPolicy::default(),
        }
    }

    /// Orchestrator with the built-in backends registered in their default
    /// order: simple, yt-dlp, cobalt, gallery-dl.
    pub fn from_settings(settings: &ExtractorSettings) -> Result<Self, SettingsError> {
        let client = settings.http_client()?;

        let mut registry = ExtractorRegistry::new();
        registry.register(Arc::new(SimpleExtractor::new(client.clone())));
        registry.register(Arc::new(YtDlpExtractor::new(settings.ytdlp_path.clone())));
        registry.register(Arc::new(CobaltExtractor::new(
            client,
            settings.cobalt_api_url.clone(),
        )));
        registry.register(Arc::new(GalleryDlExtractor::new(
            settings.gallery_dl_path.clone(),
        )));

        Ok(Self::new(registry)
            .with_retry_policy(RetryPolicy::from_settings(settings))
            .with_fallback_order(settings.fallback_order.iter().cloned()))
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_fallback_order<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fallback_order = order.into_iter().map(Into::into).collect();
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Current registry snapshot
    pub fn registry(&self) -> Arc<ExtractorRegistry> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Register an extractor at runtime. Calls already in flight keep the
    /// snapshot they started with.
    pub fn register(&self, extractor: Arc<dyn Extractor>) {
        let mut current = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = ExtractorRegistry::clone(&current);
        next.register(extractor);
        *current = Arc::new(next);
    }

    /// Registered backends and their domains
    pub fn supported_platforms(&self) -> Vec<ExtractorDescriptor> {
        self.registry().all()
    }

    /// Extract metadata and formats for `request`.
    ///
    /// `preferred` names an extractor to try first; `None` or `"auto"` means
    /// no preference. A failed preferred attempt falls through to the normal
    /// priority walk.
    pub async fn extract(&self, request: &ExtractRequest, preferred: Option<&str>) -> ExtractionOutcome {
        self.extract_with_cancel(request, preferred, &CancellationToken::new())
            .await
    }

    /// [`ExtractionOrchestrator::extract`] with best-effort cancellation.
    ///
    /// The token is checked before every attempt and every extractor, and
    /// raced against in-flight calls and backoff sleeps. A cancelled call
    /// returns `Failure{Cancelled}`.
    #[instrument(skip_all, fields(url = %request.url(), preferred = ?preferred))]
    pub async fn extract_with_cancel(
        &self,
        request: &ExtractRequest,
        preferred: Option<&str>,
        cancel: &CancellationToken,
    ) -> ExtractionOutcome {
        let candidates = self.registry().extractors_for(request.url());
        if candidates.is_empty() {
            warn!("No extractor supports {}", request.url());
            return ExtractionOutcome::failure(
                ErrorKind::NoExtractorFound,
                format!("No registered extractor supports {}", request.url()),
            );
        }

        if let Some(name) = preferred.filter(|p| !p.eq_ignore_ascii_case(AUTO)) {
            match candidates.iter().find(|e| e.name() == name) {
                Some(extractor) => {
                    info!("Trying preferred extractor {}", name);
                    match self.attempt_with_retry(extractor.as_ref(), request, cancel).await {
                        Attempted::Succeeded(media) => return ExtractionOutcome::Success(media),
                        Attempted::Cancelled => return cancelled(),
                        Attempted::Exhausted(failure) => {
                            warn!("Preferred extractor {} failed: {}", name, failure);
                        }
                    }
                }
                None => debug!("Preferred extractor {} does not support this URL", name),
            }
        }

        for extractor in self.prioritize(candidates) {
            if cancel.is_cancelled() {
                return cancelled();
            }

            info!("Trying {} extractor", extractor.name());
            match self.attempt_with_retry(extractor.as_ref(), request, cancel).await {
                Attempted::Succeeded(media) => {
                    info!("{} extraction succeeded", extractor.name());
                    return ExtractionOutcome::Success(media);
                }
                Attempted::Exhausted(failure) => {
                    warn!("{} extraction failed: {}", extractor.name(), failure);
                }
                Attempted::Cancelled => return cancelled(),
            }
        }

        ExtractionOutcome::failure(ErrorKind::AllExtractorsFailed, ALL_FAILED_MESSAGE)
    }

    /// Extract several independent requests concurrently. Results are in input
    /// order.
    pub async fn batch_extract(
        &self,
        requests: &[ExtractRequest],
        preferred: Option<&str>,
    ) -> Vec<ExtractionOutcome> {
        join_all(requests.iter().map(|r| self.extract(r, preferred))).await
    }

    fn priority(&self, name: &str) -> usize {
        self.fallback_order
            .iter()
            .position(|n| n == name)
            .unwrap_or(usize::MAX)
    }

    /// Stable sort by fallback priority; unnamed extractors keep registration
    /// order at the end.
    fn prioritize(&self, mut candidates: Vec<Arc<dyn Extractor>>) -> Vec<Arc<dyn Extractor>> {
        candidates.sort_by_key(|e| self.priority(e.name()));
        candidates
    }

    async fn attempt_with_retry(
        &self,
        extractor: &dyn Extractor,
        request: &ExtractRequest,
        cancel: &CancellationToken,
    ) -> Attempted {
        let attempts = self.policy.attempts();
        let mut last_failure = ExtractionFailure::new(ErrorKind::NetworkError, "no attempt made");

        for attempt in 1..=attempts {
            if cancel.is_cancelled() {
                return Attempted::Cancelled;
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Attempted::Cancelled,
                outcome = self.run_attempt(extractor, request) => outcome,
            };

            match outcome {
                ExtractionOutcome::Success(media) => return Attempted::Succeeded(media),
                ExtractionOutcome::Failure(failure) if failure.kind.is_retryable() => {
                    warn!(
                        "{} attempt {}/{} failed: {}",
                        extractor.name(),
                        attempt,
                        attempts,
                        failure
                    );
                    last_failure = failure;

                    if attempt < attempts {
                        let delay = self.policy.backoff(attempt);
                        debug!("Retrying {} in {:?}", extractor.name(), delay);
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => return Attempted::Cancelled,
                            _ = sleep(delay) => {}
                        }
                    }
                }
                ExtractionOutcome::Failure(failure) => return Attempted::Exhausted(failure),
            }
        }

        Attempted::Exhausted(last_failure)
    }

    /// One call into the extractor, bounded by the attempt timeout. A panic
    /// inside the extractor is reported as a failure rather than unwinding
    /// into the caller.
    async fn run_attempt(&self, extractor: &dyn Extractor, request: &ExtractRequest) -> ExtractionOutcome {
        let call = AssertUnwindSafe(extractor.extract(request)).catch_unwind();

        let result = match self.policy.attempt_timeout {
            Some(limit) => match timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => {
                    return ExtractionOutcome::failure(
                        ErrorKind::NetworkError,
                        format!("{} timed out after {:?}", extractor.name(), limit),
                    )
                }
            },
            None => call.await,
        };

        result.unwrap_or_else(|_| {
            error!("{} extractor panicked", extractor.name());
            ExtractionOutcome::failure(
                ErrorKind::Unsupported,
                format!("{} extractor panicked", extractor.name()),
            )
        })
    }
}

fn cancelled() -> ExtractionOutcome {
    ExtractionOutcome::failure(ErrorKind::Cancelled, "Extraction cancelled")
}
