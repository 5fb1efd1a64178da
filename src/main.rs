//! vidfetch - media metadata extraction with backend fallback
//!
//! Prints the extraction envelope as JSON on stdout; logs go to stderr.

use anyhow::{bail, Context, Result};
use clap::Parser;
use futures::future::join_all;
use serde::Deserialize;
use serde_json::Value;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vidfetch::extractor::orchestrator::AUTO;
use vidfetch::utils::select_best_format;
use vidfetch::{ExtractRequest, ExtractionOrchestrator, ExtractionOutcome, ExtractorSettings, VideoQuality};

#[derive(Parser)]
#[command(name = "vidfetch", version, about = "Extract video metadata and formats from a page URL")]
struct Args {
    /// Page URL to extract
    #[arg(required_unless_present_any = ["stdin", "list"])]
    url: Option<String>,

    /// Preferred quality (best, 2160p, 1440p, 1080p, 720p, 480p, 360p, worst)
    #[arg(short, long, default_value = "best")]
    quality: VideoQuality,

    /// Preferred container
    #[arg(short, long, default_value = "mp4")]
    format: String,

    /// Extractor to try first, or "auto"
    #[arg(short, long, default_value = AUTO)]
    extractor: String,

    /// Settings file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read a JSON request, or an array of requests, from stdin
    #[arg(long, conflicts_with = "url")]
    stdin: bool,

    /// List registered extractors and their domains
    #[arg(long)]
    list: bool,

    /// Include the best matching format as `data.selected`
    #[arg(long)]
    pick: bool,
}

/// Request as read from stdin: the request fields plus an optional extractor
#[derive(Deserialize)]
struct StdinRequest {
    #[serde(flatten)]
    request: ExtractRequest,
    #[serde(default)]
    extractor: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StdinInput {
    Batch(Vec<StdinRequest>),
    Single(StdinRequest),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

/// Returns whether every extraction succeeded
fn run(args: Args) -> Result<bool> {
    let settings = ExtractorSettings::load(args.config.as_deref())?;
    let orchestrator = ExtractionOrchestrator::from_settings(&settings)?;

    if args.list {
        println!("{}", serde_json::to_string_pretty(&orchestrator.supported_platforms())?);
        return Ok(true);
    }

    let (requests, batch) = if args.stdin {
        read_stdin_requests()?
    } else {
        let Some(url) = args.url.clone() else {
            bail!("a URL is required");
        };
        let request = ExtractRequest::new(url)
            .with_quality(args.quality)
            .with_format(args.format.clone());
        (vec![StdinRequest { request, extractor: None }], false)
    };

    let rt = tokio::runtime::Runtime::new()?;
    let outcomes = rt.block_on(async {
        let cancel = CancellationToken::new();
        let on_ctrl_c = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling extraction");
                on_ctrl_c.cancel();
            }
        });

        join_all(requests.iter().map(|r| {
            let preferred = r.extractor.as_deref().unwrap_or(args.extractor.as_str());
            orchestrator.extract_with_cancel(&r.request, Some(preferred), &cancel)
        }))
        .await
    });

    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    info!("{}/{} extractions succeeded", succeeded, outcomes.len());

    let rendered = outcomes
        .iter()
        .zip(&requests)
        .map(|(outcome, r)| render(outcome, &r.request, args.pick))
        .collect::<Result<Vec<_>>>()?;

    let output = if batch {
        Value::Array(rendered)
    } else {
        rendered.into_iter().next().unwrap_or(Value::Null)
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(succeeded == outcomes.len())
}

/// Requests from stdin, and whether they arrived as a batch
fn read_stdin_requests() -> Result<(Vec<StdinRequest>, bool)> {
    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .context("failed to read stdin")?;

    let input: StdinInput = serde_json::from_str(&raw).context("stdin is not a valid request")?;
    Ok(match input {
        StdinInput::Batch(items) => (items, true),
        StdinInput::Single(item) => (vec![item], false),
    })
}

fn render(outcome: &ExtractionOutcome, request: &ExtractRequest, pick: bool) -> Result<Value> {
    let mut value = serde_json::to_value(outcome)?;

    if pick {
        let selected = outcome
            .media()
            .and_then(|m| select_best_format(m.formats(), request.quality(), request.format()));
        if let (Some(format), Some(data)) = (selected, value.get_mut("data")) {
            data["selected"] = serde_json::to_value(format)?;
        }
    }
    Ok(value)
}
