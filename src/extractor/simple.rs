//! Lightweight extractor backed by public oEmbed endpoints
//!
//! Only metadata is available this way, so the single format it reports
//! points back at the canonical page URL.

use crate::extractor::models::{
    ExtractRequest, ExtractedMedia, ExtractionOutcome, MediaFormat, VideoMetadata,
};
use crate::extractor::traits::Extractor;
use crate::utils::error::ExtractorError;
use crate::utils::helpers::{clean_title, url_host, youtube_video_id};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

pub const NAME: &str = "simple";

const DOMAINS: &[&str] = &["youtube.com", "youtu.be", "bilibili.com", "vimeo.com"];

const YOUTUBE_OEMBED: &str = "https://www.youtube.com/oembed";
const VIMEO_OEMBED: &str = "https://vimeo.com/api/oembed.json";

#[derive(Debug, Deserialize)]
struct OEmbed {
    title: Option<String>,
    author_name: Option<String>,
    thumbnail_url: Option<String>,
    // Vimeo only
    description: Option<String>,
    duration: Option<u64>,
    upload_date: Option<String>,
}

pub struct SimpleExtractor {
    client: Client,
}

impl SimpleExtractor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn extract_info(&self, request: &ExtractRequest) -> Result<ExtractedMedia, ExtractorError> {
        let url = request.url();
        let host = url_host(url).ok_or_else(|| ExtractorError::InvalidUrl(url.to_string()))?;

        if host.contains("youtube.com") || host.contains("youtu.be") {
            self.youtube(url).await
        } else if host.contains("vimeo.com") {
            self.vimeo(url).await
        } else if host.contains("bilibili.com") {
            Err(ExtractorError::Unsupported(
                "Bilibili has no public oEmbed endpoint".to_string(),
            ))
        } else {
            Err(ExtractorError::Unsupported(format!("no oEmbed endpoint for {}", host)))
        }
    }

    async fn youtube(&self, url: &str) -> Result<ExtractedMedia, ExtractorError> {
        let id = youtube_video_id(url)
            .ok_or_else(|| ExtractorError::Unsupported("not a YouTube video link".to_string()))?;
        let watch_url = format!("https://www.youtube.com/watch?v={}", id);

        let oembed = self
            .fetch_oembed(YOUTUBE_OEMBED, &[("url", watch_url.as_str()), ("format", "json")])
            .await?;
        media_from_oembed(oembed, "YouTube", &watch_url)
    }

    async fn vimeo(&self, url: &str) -> Result<ExtractedMedia, ExtractorError> {
        let oembed = self.fetch_oembed(VIMEO_OEMBED, &[("url", url)]).await?;
        media_from_oembed(oembed, "Vimeo", url)
    }

    async fn fetch_oembed(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<OEmbed, ExtractorError> {
        debug!("Fetching oEmbed from {}", endpoint);
        let response = self.client.get(endpoint).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractorError::from_status(status, endpoint));
        }
        Ok(response.json::<OEmbed>().await?)
    }
}

fn media_from_oembed(
    oembed: OEmbed,
    platform: &str,
    page_url: &str,
) -> Result<ExtractedMedia, ExtractorError> {
    let metadata = VideoMetadata {
        title: clean_title(oembed.title.as_deref().unwrap_or("Untitled")),
        description: oembed.description.filter(|d| !d.is_empty()),
        duration_seconds: oembed.duration.unwrap_or(0),
        thumbnail_uri: oembed.thumbnail_url.unwrap_or_default(),
        author_name: oembed.author_name,
        publish_timestamp: oembed.upload_date,
        view_count: None,
        platform_label: platform.to_string(),
    };
    let format = MediaFormat::new("720p", "mp4", page_url).with_codec("h264");

    ExtractedMedia::new(metadata, vec![format]).ok_or(ExtractorError::NoFormats)
}

#[async_trait]
impl Extractor for SimpleExtractor {
    fn name(&self) -> &str {
        NAME
    }

    fn supported_domains(&self) -> &[&str] {
        DOMAINS
    }

    async fn extract(&self, request: &ExtractRequest) -> ExtractionOutcome {
        info!("SimpleExtractor invoked for: {}", request.url());
        self.extract_info(request).await.into()
    }
}
