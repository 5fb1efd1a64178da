//! yt-dlp wrapper for video extraction
//!
//! Runs `yt-dlp --dump-json --no-download` and normalizes its output. The
//! binary comes from settings or is discovered on first use (bundled, PATH,
//! common install locations).

use crate::extractor::models::{
    ExtractRequest, ExtractedMedia, ExtractionOutcome, MediaFormat, VideoMetadata,
};
use crate::extractor::traits::Extractor;
use crate::utils::error::ExtractorError;
use crate::utils::helpers::{clean_title, platform_label, sort_formats};
use crate::utils::tools::ToolLocator;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{debug, info};

pub const NAME: &str = "yt-dlp";

const DOMAINS: &[&str] = &[
    "youtube.com",
    "youtu.be",
    "bilibili.com",
    "douyin.com",
    "tiktok.com",
    "twitter.com",
    "x.com",
    "instagram.com",
    "vimeo.com",
    "facebook.com",
    "twitch.tv",
];

const DUMP_ARGS: &[&str] = &["--dump-json", "--no-download", "--no-warnings", "--no-playlist"];

/// Subset of the `--dump-json` document we consume
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: Option<String>,
    description: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
    uploader: Option<String>,
    channel: Option<String>,
    upload_date: Option<String>,
    view_count: Option<u64>,
    #[serde(default)]
    formats: Vec<YtDlpFormat>,
    // Single-format sites put the media directly on the top-level object
    url: Option<String>,
    ext: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct YtDlpFormat {
    url: Option<String>,
    ext: Option<String>,
    height: Option<u32>,
    format_note: Option<String>,
    filesize: Option<u64>,
    filesize_approx: Option<u64>,
    tbr: Option<f64>, // Total bitrate, kbps
    vcodec: Option<String>,
    acodec: Option<String>,
    fps: Option<f64>,
}

/// Main video extractor using yt-dlp
pub struct YtDlpExtractor {
    tool: ToolLocator,
}

impl YtDlpExtractor {
    pub fn new(ytdlp_path: Option<PathBuf>) -> Self {
        Self {
            tool: ToolLocator::new(NAME, ytdlp_path),
        }
    }

    async fn extract_info(&self, request: &ExtractRequest) -> Result<ExtractedMedia, ExtractorError> {
        debug!("Extracting video info for URL: {}", request.url());
        let stdout = self.tool.run(DUMP_ARGS, request.url()).await?;
        let info: YtDlpInfo = serde_json::from_slice(&stdout)?;
        media_from_info(info, request)
    }
}

fn is_none_codec(codec: &Option<String>) -> bool {
    codec.as_deref() == Some("none")
}

fn normalize_format(format: YtDlpFormat) -> Option<MediaFormat> {
    if is_none_codec(&format.vcodec) && is_none_codec(&format.acodec) {
        return None;
    }
    let locator = format.url?;

    let quality_label = match (format.height, format.format_note) {
        (Some(h), _) if h > 0 => format!("{}p", h),
        (_, Some(note)) if !note.is_empty() => note,
        _ => "unknown".to_string(),
    };
    let codec = if is_none_codec(&format.vcodec) {
        format.acodec
    } else {
        format.vcodec
    };

    Some(MediaFormat {
        quality_label,
        container: format.ext.unwrap_or_else(|| "mp4".to_string()),
        locator,
        size_bytes: format.filesize.or(format.filesize_approx),
        bitrate: format.tbr.map(|t| t.round() as u64),
        codec: codec.filter(|c| c != "none"),
        frame_rate: format.fps.filter(|f| *f > 0.0),
    })
}

fn media_from_info(info: YtDlpInfo, request: &ExtractRequest) -> Result<ExtractedMedia, ExtractorError> {
    let mut formats: Vec<MediaFormat> = info.formats.into_iter().filter_map(normalize_format).collect();

    if formats.is_empty() {
        if let Some(url) = info.url {
            formats.extend(normalize_format(YtDlpFormat {
                url: Some(url),
                ext: info.ext,
                ..Default::default()
            }));
        }
    }
    sort_formats(&mut formats, request.quality());

    let metadata = VideoMetadata {
        title: clean_title(info.title.as_deref().unwrap_or("Untitled")),
        description: info.description.filter(|d| !d.is_empty()),
        duration_seconds: info.duration.map(|d| d.max(0.0).floor() as u64).unwrap_or(0),
        thumbnail_uri: info.thumbnail.unwrap_or_default(),
        author_name: info.uploader.or(info.channel),
        publish_timestamp: info.upload_date,
        view_count: info.view_count,
        platform_label: platform_label(request.url()).to_string(),
    };

    ExtractedMedia::new(metadata, formats).ok_or(ExtractorError::NoFormats)
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    fn name(&self) -> &str {
        NAME
    }

    fn supported_domains(&self) -> &[&str] {
        DOMAINS
    }

    async fn extract(&self, request: &ExtractRequest) -> ExtractionOutcome {
        let result = self.extract_info(request).await;
        if let Ok(media) = &result {
            info!("yt-dlp returned {} formats", media.formats().len());
        }
        result.into()
    }
}

// ============================================================
// Tests
// ============================================================
