//! Orchestrator behaviour against scripted extractors; no network or
//! subprocesses involved. Backoff timing runs on tokio's paused clock.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use vidfetch::{
    ErrorKind, ExtractRequest, ExtractedMedia, ExtractionOrchestrator, ExtractionOutcome,
    Extractor, ExtractorRegistry, MediaFormat, RetryPolicy, VideoMetadata,
};

const VIDEO_URL: &str = "https://youtube.com/watch?v=abc123XYZ90";
const VIDEO_DOMAINS: &[&str] = &["youtube.com", "youtu.be"];

#[derive(Clone, Copy)]
enum Step {
    Succeed,
    Fail(ErrorKind),
    Hang,
    Panic,
}

type CallLog = Arc<Mutex<Vec<&'static str>>>;

/// Extractor that replays a script; the last step repeats once the script
/// runs out.
struct Scripted {
    name: &'static str,
    domains: &'static [&'static str],
    script: Vec<Step>,
    calls: AtomicUsize,
    log: CallLog,
}

impl Scripted {
    fn new(name: &'static str, script: Vec<Step>, log: &CallLog) -> Arc<Self> {
        Arc::new(Self {
            name,
            domains: VIDEO_DOMAINS,
            script,
            calls: AtomicUsize::new(0),
            log: log.clone(),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Extractor for Scripted {
    fn name(&self) -> &str {
        self.name
    }

    fn supported_domains(&self) -> &[&str] {
        self.domains
    }

    async fn extract(&self, request: &ExtractRequest) -> ExtractionOutcome {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(self.name);

        let step = self.script[call.min(self.script.len() - 1)];
        match step {
            Step::Succeed => ExtractionOutcome::Success(media(self.name, request.url())),
            Step::Fail(kind) => ExtractionOutcome::failure(kind, format!("{} failed", self.name)),
            Step::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                ExtractionOutcome::Success(media(self.name, request.url()))
            }
            Step::Panic => panic!("{} blew up", self.name),
        }
    }
}

fn media(title: &str, url: &str) -> ExtractedMedia {
    ExtractedMedia::new(
        VideoMetadata::new(title, "", "YouTube"),
        vec![MediaFormat::new("720p", "mp4", url)],
    )
    .expect("one format")
}

fn orchestrator(extractors: &[Arc<Scripted>]) -> ExtractionOrchestrator {
    let mut registry = ExtractorRegistry::new();
    for e in extractors {
        registry.register(e.clone());
    }
    ExtractionOrchestrator::new(registry)
}

fn winner(outcome: &ExtractionOutcome) -> &str {
    &outcome.media().expect("success").metadata().title
}

/// The paused clock advances in whole-millisecond ticks
fn assert_elapsed(start: Instant, expected: Duration) {
    let elapsed = start.elapsed();
    assert!(
        elapsed >= expected && elapsed < expected + Duration::from_millis(50),
        "expected ~{:?}, got {:?}",
        expected,
        elapsed
    );
}

fn request() -> ExtractRequest {
    ExtractRequest::new(VIDEO_URL)
}

// ============================================================
// ROUTING
// ============================================================

#[tokio::test(start_paused = true)]
async fn unmatched_url_invokes_nothing() {
    let log = CallLog::default();
    let simple = Scripted::new("simple", vec![Step::Succeed], &log);
    let orch = orchestrator(&[simple.clone()]);

    let outcome = orch
        .extract(&ExtractRequest::new("https://example.org/clip/1"), None)
        .await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::NoExtractorFound));
    assert_eq!(simple.calls(), 0);

    let outcome = orch.extract(&ExtractRequest::new("not a url"), None).await;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::NoExtractorFound));
}

#[tokio::test(start_paused = true)]
async fn preferred_extractor_runs_alone_when_it_succeeds() {
    let log = CallLog::default();
    let simple = Scripted::new("simple", vec![Step::Succeed], &log);
    let cobalt = Scripted::new("cobalt", vec![Step::Succeed], &log);
    let orch = orchestrator(&[simple.clone(), cobalt.clone()]);

    let outcome = orch.extract(&request(), Some("cobalt")).await;

    assert_eq!(winner(&outcome), "cobalt");
    assert_eq!(simple.calls(), 0);
    assert_eq!(*log.lock().unwrap(), vec!["cobalt"]);
}

#[tokio::test(start_paused = true)]
async fn fallback_follows_priority_not_registration_order() {
    let log = CallLog::default();
    let gallery = Scripted::new("gallery-dl", vec![Step::Succeed], &log);
    let ytdlp = Scripted::new("yt-dlp", vec![Step::Succeed], &log);
    let simple = Scripted::new("simple", vec![Step::Fail(ErrorKind::NotFound)], &log);
    let orch = orchestrator(&[gallery.clone(), ytdlp.clone(), simple.clone()]);

    let outcome = orch.extract(&request(), None).await;

    assert_eq!(winner(&outcome), "yt-dlp");
    assert_eq!(gallery.calls(), 0);
    assert_eq!(*log.lock().unwrap(), vec!["simple", "yt-dlp"]);
}

#[tokio::test(start_paused = true)]
async fn unknown_extractors_run_last_in_registration_order() {
    let log = CallLog::default();
    let not_found = vec![Step::Fail(ErrorKind::NotFound)];
    let custom_a = Scripted::new("custom-a", not_found.clone(), &log);
    let gallery = Scripted::new("gallery-dl", not_found.clone(), &log);
    let custom_b = Scripted::new("custom-b", not_found.clone(), &log);
    let simple = Scripted::new("simple", not_found, &log);
    let orch = orchestrator(&[custom_a, gallery, custom_b, simple]);

    let outcome = orch.extract(&request(), None).await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::AllExtractorsFailed));
    assert_eq!(
        *log.lock().unwrap(),
        vec!["simple", "gallery-dl", "custom-a", "custom-b"]
    );
}

#[tokio::test(start_paused = true)]
async fn custom_fallback_order_is_respected() {
    let log = CallLog::default();
    let simple = Scripted::new("simple", vec![Step::Succeed], &log);
    let cobalt = Scripted::new("cobalt", vec![Step::Succeed], &log);
    let orch = orchestrator(&[simple, cobalt]).with_fallback_order(["cobalt", "simple"]);

    let outcome = orch.extract(&request(), None).await;
    assert_eq!(winner(&outcome), "cobalt");
}

#[tokio::test(start_paused = true)]
async fn failed_preferred_extractor_falls_through_and_is_retried_in_place() {
    let log = CallLog::default();
    let simple = Scripted::new("simple", vec![Step::Fail(ErrorKind::NotFound)], &log);
    let ytdlp = Scripted::new(
        "yt-dlp",
        vec![Step::Fail(ErrorKind::Unsupported), Step::Succeed],
        &log,
    );
    let orch = orchestrator(&[simple, ytdlp.clone()]);

    let outcome = orch.extract(&request(), Some("yt-dlp")).await;

    assert_eq!(winner(&outcome), "yt-dlp");
    assert_eq!(ytdlp.calls(), 2);
    assert_eq!(*log.lock().unwrap(), vec!["yt-dlp", "simple", "yt-dlp"]);
}

#[tokio::test(start_paused = true)]
async fn preferred_name_that_does_not_match_is_ignored() {
    let log = CallLog::default();
    let simple = Scripted::new("simple", vec![Step::Succeed], &log);
    let orch = orchestrator(&[simple]);

    for preferred in [Some("gallery-dl"), Some("auto"), Some("AUTO"), None] {
        let outcome = orch.extract(&request(), preferred).await;
        assert_eq!(winner(&outcome), "simple");
    }
    assert_eq!(log.lock().unwrap().len(), 4);
}

// ============================================================
// RETRY
// ============================================================

#[tokio::test(start_paused = true)]
async fn network_errors_are_retried_up_to_the_cap() {
    let log = CallLog::default();
    let simple = Scripted::new("simple", vec![Step::Fail(ErrorKind::NetworkError)], &log);
    let ytdlp = Scripted::new("yt-dlp", vec![Step::Fail(ErrorKind::NetworkError)], &log);
    let orch = orchestrator(&[simple.clone(), ytdlp.clone()]);

    let outcome = orch.extract(&request(), None).await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::AllExtractorsFailed));
    assert_eq!(simple.calls(), 2);
    assert_eq!(ytdlp.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn non_network_failures_are_not_retried() {
    for kind in [ErrorKind::NotFound, ErrorKind::Unsupported, ErrorKind::RateLimited] {
        let log = CallLog::default();
        let simple = Scripted::new("simple", vec![Step::Fail(kind)], &log);
        let ytdlp = Scripted::new("yt-dlp", vec![Step::Succeed], &log);
        let orch = orchestrator(&[simple.clone(), ytdlp]);

        let outcome = orch.extract(&request(), None).await;

        assert_eq!(winner(&outcome), "yt-dlp");
        assert_eq!(simple.calls(), 1, "{} must not be retried", kind);
    }
}

#[tokio::test(start_paused = true)]
async fn retry_recovers_after_a_transient_fault() {
    let log = CallLog::default();
    let simple = Scripted::new(
        "simple",
        vec![Step::Fail(ErrorKind::NetworkError), Step::Succeed],
        &log,
    );
    let ytdlp = Scripted::new("yt-dlp", vec![Step::Succeed], &log);
    let orch = orchestrator(&[simple.clone(), ytdlp.clone()]);

    let start = Instant::now();
    let outcome = orch.extract(&request(), None).await;

    assert_eq!(winner(&outcome), "simple");
    assert_eq!(simple.calls(), 2);
    assert_eq!(ytdlp.calls(), 0);
    assert_elapsed(start, Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn backoff_grows_linearly_and_skips_the_last_attempt() {
    let log = CallLog::default();
    let simple = Scripted::new("simple", vec![Step::Fail(ErrorKind::NetworkError)], &log);
    let orch = orchestrator(&[simple.clone()]).with_retry_policy(RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(1000),
        attempt_timeout: None,
    });

    let start = Instant::now();
    let outcome = orch.extract(&request(), None).await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::AllExtractorsFailed));
    assert_eq!(simple.calls(), 3);
    // 1s after the first attempt, 2s after the second, none after the third
    assert_elapsed(start, Duration::from_millis(3000));
}

#[tokio::test(start_paused = true)]
async fn exhausted_failure_has_generic_message() {
    let log = CallLog::default();
    let simple = Scripted::new("simple", vec![Step::Fail(ErrorKind::NotFound)], &log);
    let orch = orchestrator(&[simple]);

    let outcome = orch.extract(&request(), None).await;
    let failure = outcome.error().expect("failure");

    assert_eq!(failure.kind, ErrorKind::AllExtractorsFailed);
    assert!(!failure.message.contains("simple failed"));
}

#[tokio::test(start_paused = true)]
async fn attempt_timeout_counts_as_network_error() {
    let log = CallLog::default();
    let simple = Scripted::new("simple", vec![Step::Hang], &log);
    let ytdlp = Scripted::new("yt-dlp", vec![Step::Succeed], &log);
    let orch = orchestrator(&[simple.clone(), ytdlp]).with_retry_policy(RetryPolicy {
        attempt_timeout: Some(Duration::from_secs(5)),
        ..RetryPolicy::default()
    });

    let start = Instant::now();
    let outcome = orch.extract(&request(), None).await;

    assert_eq!(winner(&outcome), "yt-dlp");
    assert_eq!(simple.calls(), 2);
    assert_elapsed(start, Duration::from_secs(11));
}

#[tokio::test(start_paused = true)]
async fn panicking_extractor_is_reported_and_skipped() {
    let log = CallLog::default();
    let simple = Scripted::new("simple", vec![Step::Panic], &log);
    let ytdlp = Scripted::new("yt-dlp", vec![Step::Succeed], &log);
    let orch = orchestrator(&[simple.clone(), ytdlp]);

    let outcome = orch.extract(&request(), None).await;

    assert_eq!(winner(&outcome), "yt-dlp");
    assert_eq!(simple.calls(), 1);
}

// ============================================================
// SUCCESS SHAPE
// ============================================================

#[tokio::test(start_paused = true)]
async fn success_carries_the_extractor_formats() {
    let log = CallLog::default();
    let simple = Scripted::new("simple", vec![Step::Succeed], &log);
    let orch = orchestrator(&[simple]);

    let outcome = orch.extract(&request(), None).await;
    let media = outcome.media().expect("success");

    assert_eq!(media.formats().len(), 1);
    assert_eq!(media.formats()[0].quality_label, "720p");
    assert_eq!(media.formats()[0].container, "mp4");
}

// ============================================================
// CANCELLATION
// ============================================================

#[tokio::test(start_paused = true)]
async fn cancelled_before_start_invokes_nothing() {
    let log = CallLog::default();
    let simple = Scripted::new("simple", vec![Step::Succeed], &log);
    let orch = orchestrator(&[simple.clone()]);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let outcome = orch.extract_with_cancel(&request(), None, &cancel).await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::Cancelled));
    assert_eq!(simple.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancel_interrupts_in_flight_attempt() {
    let log = CallLog::default();
    let simple = Scripted::new("simple", vec![Step::Hang], &log);
    let ytdlp = Scripted::new("yt-dlp", vec![Step::Succeed], &log);
    let orch = orchestrator(&[simple, ytdlp.clone()]);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let outcome = orch.extract_with_cancel(&request(), None, &cancel).await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::Cancelled));
    assert_eq!(ytdlp.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancel_interrupts_backoff() {
    let log = CallLog::default();
    let simple = Scripted::new("simple", vec![Step::Fail(ErrorKind::NetworkError)], &log);
    let orch = orchestrator(&[simple.clone()]);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.cancel();
    });

    let start = Instant::now();
    let outcome = orch.extract_with_cancel(&request(), None, &cancel).await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::Cancelled));
    assert_eq!(simple.calls(), 1);
    assert!(start.elapsed() < Duration::from_millis(1000));
}

// ============================================================
// BATCH AND CONCURRENCY
// ============================================================

#[tokio::test(start_paused = true)]
async fn batch_preserves_input_order() {
    let log = CallLog::default();
    let simple = Scripted::new("simple", vec![Step::Succeed], &log);
    let orch = orchestrator(&[simple]);

    let requests = vec![
        ExtractRequest::new("https://youtu.be/first000001"),
        ExtractRequest::new("https://example.org/nothing"),
        ExtractRequest::new("https://www.youtube.com/watch?v=third000003"),
    ];
    let outcomes = orch.batch_extract(&requests, None).await;

    assert_eq!(outcomes.len(), 3);
    assert_eq!(
        outcomes[0].media().unwrap().formats()[0].locator,
        "https://youtu.be/first000001"
    );
    assert_eq!(outcomes[1].error_kind(), Some(ErrorKind::NoExtractorFound));
    assert_eq!(
        outcomes[2].media().unwrap().formats()[0].locator,
        "https://www.youtube.com/watch?v=third000003"
    );
}

#[tokio::test(start_paused = true)]
async fn shared_orchestrator_serves_concurrent_tasks() {
    let log = CallLog::default();
    let simple = Scripted::new(
        "simple",
        vec![Step::Fail(ErrorKind::NetworkError), Step::Succeed],
        &log,
    );
    let orch = Arc::new(orchestrator(&[simple]));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let orch = orch.clone();
            tokio::spawn(async move { orch.extract(&request(), None).await })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().is_success());
    }
}

// ============================================================
// REGISTRATION
// ============================================================

#[tokio::test(start_paused = true)]
async fn runtime_registration_is_visible_to_later_calls() {
    let log = CallLog::default();
    let orch = ExtractionOrchestrator::new(ExtractorRegistry::new());

    let before = orch.extract(&request(), None).await;
    assert_eq!(before.error_kind(), Some(ErrorKind::NoExtractorFound));

    let snapshot = orch.registry();
    orch.register(Scripted::new("simple", vec![Step::Succeed], &log));

    assert!(snapshot.is_empty(), "earlier snapshots are never mutated");
    assert_eq!(orch.supported_platforms().len(), 1);
    assert_eq!(orch.supported_platforms()[0].domains, vec!["youtube.com", "youtu.be"]);

    let after = orch.extract(&request(), None).await;
    assert_eq!(winner(&after), "simple");
}
