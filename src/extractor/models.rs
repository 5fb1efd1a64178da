//! Data structures for extraction requests and results

use chrono::Utc;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Requested video quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VideoQuality {
    #[default]
    #[serde(rename = "best")]
    Best,
    #[serde(rename = "2160p")]
    P2160,
    #[serde(rename = "1440p")]
    P1440,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "360p")]
    P360,
    #[serde(rename = "worst")]
    Worst,
}

impl VideoQuality {
    pub const ALL: [VideoQuality; 8] = [
        VideoQuality::Best,
        VideoQuality::P2160,
        VideoQuality::P1440,
        VideoQuality::P1080,
        VideoQuality::P720,
        VideoQuality::P480,
        VideoQuality::P360,
        VideoQuality::Worst,
    ];

    /// Wire representation, also used as the format quality label
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoQuality::Best => "best",
            VideoQuality::P2160 => "2160p",
            VideoQuality::P1440 => "1440p",
            VideoQuality::P1080 => "1080p",
            VideoQuality::P720 => "720p",
            VideoQuality::P480 => "480p",
            VideoQuality::P360 => "360p",
            VideoQuality::Worst => "worst",
        }
    }

    /// Vertical resolution for concrete qualities
    pub fn height(&self) -> Option<u32> {
        match self {
            VideoQuality::P2160 => Some(2160),
            VideoQuality::P1440 => Some(1440),
            VideoQuality::P1080 => Some(1080),
            VideoQuality::P720 => Some(720),
            VideoQuality::P480 => Some(480),
            VideoQuality::P360 => Some(360),
            VideoQuality::Best | VideoQuality::Worst => None,
        }
    }
}

impl fmt::Display for VideoQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        VideoQuality::ALL
            .into_iter()
            .find(|q| q.as_str() == wanted)
            .ok_or_else(|| {
                format!(
                    "unknown quality '{}', expected one of: best, 2160p, 1440p, 1080p, 720p, 480p, 360p, worst",
                    s
                )
            })
    }
}

fn default_format() -> String {
    "mp4".to_string()
}

/// A single extraction request.
///
/// Fields are private so a request cannot change once it has been handed to
/// the orchestrator. Build one with [`ExtractRequest::new`] and the `with_*`
/// methods, or deserialize it from `{ "url", "quality", "format", "options" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractRequest {
    url: String,
    #[serde(default)]
    quality: VideoQuality,
    #[serde(default = "default_format")]
    format: String,
    #[serde(default)]
    options: Map<String, Value>,
}

impl ExtractRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            quality: VideoQuality::Best,
            format: default_format(),
            options: Map::new(),
        }
    }

    pub fn with_quality(mut self, quality: VideoQuality) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn quality(&self) -> VideoQuality {
        self.quality
    }

    /// Container/codec tag such as `mp4`, `webm` or `mp3`
    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn options(&self) -> &Map<String, Value> {
        &self.options
    }
}

/// One downloadable variant of a piece of media
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaFormat {
    #[serde(rename = "quality")]
    pub quality_label: String,
    #[serde(rename = "format")]
    pub container: String,
    /// Opaque locator handed to whatever performs the download
    #[serde(rename = "url")]
    pub locator: String,
    #[serde(rename = "size", default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
    #[serde(rename = "fps", default, skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<f64>,
}

impl MediaFormat {
    pub fn new(
        quality_label: impl Into<String>,
        container: impl Into<String>,
        locator: impl Into<String>,
    ) -> Self {
        Self {
            quality_label: quality_label.into(),
            container: container.into(),
            locator: locator.into(),
            size_bytes: None,
            bitrate: None,
            codec: None,
            frame_rate: None,
        }
    }

    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = Some(codec.into());
        self
    }
}

/// Normalized video metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "duration")]
    pub duration_seconds: u64,
    #[serde(rename = "thumbnail")]
    pub thumbnail_uri: String,
    #[serde(rename = "author", default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(rename = "publishTime", default, skip_serializing_if = "Option::is_none")]
    pub publish_timestamp: Option<String>,
    #[serde(rename = "viewCount", default, skip_serializing_if = "Option::is_none")]
    pub view_count: Option<u64>,
    #[serde(rename = "platform")]
    pub platform_label: String,
}

impl VideoMetadata {
    pub fn new(
        title: impl Into<String>,
        thumbnail_uri: impl Into<String>,
        platform_label: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: None,
            duration_seconds: 0,
            thumbnail_uri: thumbnail_uri.into(),
            author_name: None,
            publish_timestamp: None,
            view_count: None,
            platform_label: platform_label.into(),
        }
    }
}

/// Closed taxonomy of extraction failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Transport-level fault: timeout, connection reset, 5xx
    NetworkError,
    NotFound,
    /// Backend knows the domain but not this URL shape
    Unsupported,
    RateLimited,
    NoExtractorFound,
    AllExtractorsFailed,
    /// The caller's cancellation token fired
    Cancelled,
}

impl ErrorKind {
    /// Only transport faults are retried by the orchestrator
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::NetworkError)
    }

    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Unsupported => "UNSUPPORTED",
            ErrorKind::RateLimited => "RATE_LIMITED",
            ErrorKind::NoExtractorFound => "NO_EXTRACTOR_FOUND",
            ErrorKind::AllExtractorsFailed => "ALL_EXTRACTORS_FAILED",
            ErrorKind::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Failure half of an [`ExtractionOutcome`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionFailure {
    #[serde(rename = "code")]
    pub kind: ErrorKind,
    pub message: String,
}

impl ExtractionFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ExtractionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Success payload. The format list is never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedMedia {
    metadata: VideoMetadata,
    formats: Vec<MediaFormat>,
    extracted_at_ms: i64,
}

impl ExtractedMedia {
    /// Returns `None` when `formats` is empty.
    pub fn new(metadata: VideoMetadata, formats: Vec<MediaFormat>) -> Option<Self> {
        if formats.is_empty() {
            return None;
        }
        Some(Self {
            metadata,
            formats,
            extracted_at_ms: Utc::now().timestamp_millis(),
        })
    }

    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    pub fn formats(&self) -> &[MediaFormat] {
        &self.formats
    }

    pub fn extracted_at_ms(&self) -> i64 {
        self.extracted_at_ms
    }

    pub fn into_parts(self) -> (VideoMetadata, Vec<MediaFormat>) {
        (self.metadata, self.formats)
    }
}

/// Result of one extraction call
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    Success(ExtractedMedia),
    Failure(ExtractionFailure),
}

impl ExtractionOutcome {
    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        ExtractionOutcome::Failure(ExtractionFailure::new(kind, message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionOutcome::Success(_))
    }

    pub fn media(&self) -> Option<&ExtractedMedia> {
        match self {
            ExtractionOutcome::Success(media) => Some(media),
            ExtractionOutcome::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ExtractionFailure> {
        match self {
            ExtractionOutcome::Success(_) => None,
            ExtractionOutcome::Failure(failure) => Some(failure),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error().map(|f| f.kind)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SuccessBody<'a> {
    video: &'a VideoMetadata,
    formats: &'a [MediaFormat],
    extract_time: i64,
}

#[derive(Serialize)]
struct Envelope<'a> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<SuccessBody<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a ExtractionFailure>,
}

/// Serializes as `{ success, data: { video, formats, extractTime } }` or
/// `{ success, error: { code, message } }`.
impl Serialize for ExtractionOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let envelope = match self {
            ExtractionOutcome::Success(media) => Envelope {
                success: true,
                data: Some(SuccessBody {
                    video: &media.metadata,
                    formats: &media.formats,
                    extract_time: media.extracted_at_ms,
                }),
                error: None,
            },
            ExtractionOutcome::Failure(failure) => Envelope {
                success: false,
                data: None,
                error: Some(failure),
            },
        };
        envelope.serialize(serializer)
    }
}
