//! gallery-dl backend for image/media-centric social sites
//!
//! `gallery-dl --dump-json` prints an array of messages; URL messages have the
//! shape `[3, "<url>", { ...metadata }]`.

use crate::extractor::models::{
    ExtractRequest, ExtractedMedia, ExtractionOutcome, MediaFormat, VideoMetadata,
};
use crate::extractor::traits::Extractor;
use crate::utils::error::ExtractorError;
use crate::utils::helpers::{clean_title, platform_label};
use crate::utils::tools::ToolLocator;
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use tracing::info;

pub const NAME: &str = "gallery-dl";

const DOMAINS: &[&str] = &[
    "instagram.com",
    "twitter.com",
    "x.com",
    "reddit.com",
    "pixiv.net",
    "deviantart.com",
    "tumblr.com",
];

const URL_MESSAGE: u64 = 3;

pub struct GalleryDlExtractor {
    tool: ToolLocator,
}

struct GalleryFile<'a> {
    url: &'a str,
    meta: Option<&'a Value>,
}

impl<'a> GalleryFile<'a> {
    fn str_field(&self, keys: &[&str]) -> Option<String> {
        let meta = self.meta?;
        keys.iter()
            .filter_map(|k| meta.get(*k))
            .find_map(|v| match v {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                // e.g. `author: { name: ... }`
                Value::Object(o) => o
                    .get("name")
                    .or_else(|| o.get("username"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            })
    }

    fn u64_field(&self, key: &str) -> Option<u64> {
        self.meta?.get(key)?.as_u64().filter(|v| *v > 0)
    }

    fn to_format(&self) -> MediaFormat {
        let quality_label = match (self.u64_field("width"), self.u64_field("height")) {
            (Some(w), Some(h)) => format!("{}x{}", w, h),
            _ => "unknown".to_string(),
        };
        let mut format = MediaFormat::new(
            quality_label,
            self.str_field(&["extension"]).unwrap_or_else(|| "mp4".to_string()),
            self.url,
        );
        format.size_bytes = self.u64_field("filesize");
        format
    }
}

impl GalleryDlExtractor {
    pub fn new(gallery_dl_path: Option<PathBuf>) -> Self {
        Self {
            tool: ToolLocator::new(NAME, gallery_dl_path),
        }
    }

    async fn extract_files(&self, request: &ExtractRequest) -> Result<ExtractedMedia, ExtractorError> {
        let stdout = self.tool.run(&["--dump-json"], request.url()).await?;
        let messages: Vec<Value> = serde_json::from_slice(&stdout)?;
        media_from_messages(&messages, request)
    }
}

fn url_messages(messages: &[Value]) -> Vec<GalleryFile<'_>> {
    messages
        .iter()
        .filter_map(Value::as_array)
        .filter(|m| m.first().and_then(Value::as_u64) == Some(URL_MESSAGE))
        .filter_map(|m| {
            Some(GalleryFile {
                url: m.get(1)?.as_str()?,
                meta: m.get(2),
            })
        })
        .collect()
}

fn media_from_messages(messages: &[Value], request: &ExtractRequest) -> Result<ExtractedMedia, ExtractorError> {
    let files = url_messages(messages);
    let first = files
        .first()
        .ok_or_else(|| ExtractorError::NotFound(format!("gallery-dl found no files at {}", request.url())))?;

    let metadata = VideoMetadata {
        title: clean_title(&first.str_field(&["filename", "title"]).unwrap_or_else(|| "Untitled".to_string())),
        description: first.str_field(&["description", "content"]),
        duration_seconds: 0,
        thumbnail_uri: first.str_field(&["thumbnail"]).unwrap_or_default(),
        author_name: first.str_field(&["username", "author", "user"]),
        publish_timestamp: first.str_field(&["date"]),
        view_count: None,
        platform_label: platform_label(request.url()).to_string(),
    };
    let formats = files.iter().map(GalleryFile::to_format).collect();

    ExtractedMedia::new(metadata, formats).ok_or(ExtractorError::NoFormats)
}

#[async_trait]
impl Extractor for GalleryDlExtractor {
    fn name(&self) -> &str {
        NAME
    }

    fn supported_domains(&self) -> &[&str] {
        DOMAINS
    }

    async fn extract(&self, request: &ExtractRequest) -> ExtractionOutcome {
        info!("GalleryDlExtractor invoked for: {}", request.url());
        self.extract_files(request).await.into()
    }
}
