use crate::extractor::models::{ExtractRequest, ExtractionOutcome};
use crate::utils::helpers::host_matches;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Core trait for all extraction backends
///
/// This trait isolates the orchestrator from how a backend obtains its data
/// (oEmbed endpoint, yt-dlp subprocess, third-party API, ...). New backends
/// are added by implementing it and registering an instance.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Unique identifier used for preference matching and fallback ordering
    /// (e.g. "simple", "yt-dlp")
    fn name(&self) -> &str;

    /// Host fragments this backend handles
    fn supported_domains(&self) -> &[&str];

    /// Pure host check against [`Extractor::supported_domains`].
    fn supports(&self, url: &str) -> bool {
        host_matches(url, self.supported_domains())
    }

    /// Performs the lookup.
    ///
    /// Implementations must never panic on bad input or remote failures; every
    /// internal fault is reported as a `Failure` with a classified `ErrorKind`.
    async fn extract(&self, request: &ExtractRequest) -> ExtractionOutcome;

    fn descriptor(&self) -> ExtractorDescriptor {
        ExtractorDescriptor {
            name: self.name().to_string(),
            domains: self
                .supported_domains()
                .iter()
                .map(|d| d.to_string())
                .collect(),
        }
    }
}

/// Snapshot of a registered backend, for listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractorDescriptor {
    pub name: String,
    pub domains: Vec<String>,
}
