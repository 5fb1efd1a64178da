//! Cobalt API backend
//!
//! Cobalt resolves a page URL to a single direct media link for the requested
//! quality; it returns a filename but no other metadata.

use crate::extractor::models::{
    ExtractRequest, ExtractedMedia, ExtractionOutcome, MediaFormat, VideoMetadata, VideoQuality,
};
use crate::extractor::traits::Extractor;
use crate::utils::error::ExtractorError;
use crate::utils::helpers::{clean_title, platform_label};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const NAME: &str = "cobalt";

const DOMAINS: &[&str] = &[
    "youtube.com",
    "youtu.be",
    "twitter.com",
    "x.com",
    "tiktok.com",
    "instagram.com",
    "vimeo.com",
    "reddit.com",
    "soundcloud.com",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CobaltRequest<'a> {
    url: &'a str,
    v_quality: &'static str,
    v_codec: &'static str,
    v_format: &'a str,
    a_format: &'static str,
    is_audio_only: bool,
}

#[derive(Debug, Deserialize)]
struct CobaltResponse {
    status: String,
    url: Option<String>,
    text: Option<String>,
    filename: Option<String>,
}

pub struct CobaltExtractor {
    client: Client,
    api_url: String,
}

impl CobaltExtractor {
    pub fn new(client: Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into(),
        }
    }

    async fn resolve(&self, request: &ExtractRequest) -> Result<ExtractedMedia, ExtractorError> {
        let body = request_body(request);
        debug!("POST {} for {}", self.api_url, request.url());

        let response = self
            .client
            .post(&self.api_url)
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractorError::from_status(status, NAME));
        }

        let payload: CobaltResponse = response.json().await?;
        media_from_response(payload, request)
    }
}

/// Cobalt's `vQuality` vocabulary
fn map_quality(quality: VideoQuality) -> &'static str {
    match quality {
        VideoQuality::Best | VideoQuality::P2160 => "max",
        VideoQuality::P1440 => "1440",
        VideoQuality::P1080 => "1080",
        VideoQuality::P720 => "720",
        VideoQuality::P480 => "480",
        VideoQuality::P360 | VideoQuality::Worst => "360",
    }
}

fn request_body(request: &ExtractRequest) -> CobaltRequest<'_> {
    CobaltRequest {
        url: request.url(),
        v_quality: map_quality(request.quality()),
        v_codec: if request.format() == "mp4" { "h264" } else { "vp9" },
        v_format: request.format(),
        a_format: "mp3",
        is_audio_only: request.format() == "mp3",
    }
}

fn media_from_response(
    payload: CobaltResponse,
    request: &ExtractRequest,
) -> Result<ExtractedMedia, ExtractorError> {
    let text = payload.text.unwrap_or_default();

    match payload.status.as_str() {
        "success" | "redirect" | "stream" | "tunnel" => {
            let locator = payload.url.ok_or(ExtractorError::NoFormats)?;
            let metadata = VideoMetadata::new(
                clean_title(payload.filename.as_deref().unwrap_or("Untitled")),
                "",
                platform_label(request.url()),
            );
            let format = MediaFormat::new(request.quality().as_str(), request.format(), locator);
            ExtractedMedia::new(metadata, vec![format]).ok_or(ExtractorError::NoFormats)
        }
        "rate-limit" => Err(ExtractorError::RateLimited(text)),
        "error" => Err(ExtractorError::Unsupported(text)),
        other => Err(ExtractorError::Unsupported(format!(
            "unexpected cobalt status '{}'",
            other
        ))),
    }
}

#[async_trait]
impl Extractor for CobaltExtractor {
    fn name(&self) -> &str {
        NAME
    }

    fn supported_domains(&self) -> &[&str] {
        DOMAINS
    }

    async fn extract(&self, request: &ExtractRequest) -> ExtractionOutcome {
        info!("CobaltExtractor invoked for: {}", request.url());
        self.resolve(request).await.into()
    }
}
