//! Free helpers shared by all extractors

use crate::extractor::models::{MediaFormat, VideoQuality};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use url::Url;

/// Quality ladder, best first. Labels outside it sort last.
pub const QUALITY_LADDER: [&str; 7] = ["2160p", "1440p", "1080p", "720p", "480p", "360p", "240p"];

static YOUTUBE_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:youtube\.com/(?:[^/]+/.+/|(?:v|e(?:mbed)?|shorts)/|.*[?&]v=)|youtu\.be/)([^"&?/\s]{11})"#)
        .expect("valid youtube id regex")
});

/// Replace characters that are invalid in file names and trim whitespace
pub fn clean_title(title: &str) -> String {
    const INVALID: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
    title
        .chars()
        .map(|c| if INVALID.contains(&c) { '_' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Host of a URL, or `None` when it does not parse
pub fn url_host(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed.host_str().map(|h| h.to_ascii_lowercase())
}

/// True iff the URL host contains one of `domains`
pub fn host_matches(url: &str, domains: &[&str]) -> bool {
    match url_host(url) {
        Some(host) => domains.iter().any(|d| host.contains(d)),
        None => false,
    }
}

/// Human-readable platform name for a URL
pub fn platform_label(url: &str) -> &'static str {
    let Some(host) = url_host(url) else {
        return "Unknown";
    };
    let has = |needle: &str| host.contains(needle);

    if has("youtube.com") || has("youtu.be") {
        "YouTube"
    } else if has("bilibili.com") {
        "Bilibili"
    } else if has("douyin.com") || has("tiktok.com") {
        "TikTok"
    } else if has("twitter.com") || has("x.com") {
        "Twitter"
    } else if has("instagram.com") {
        "Instagram"
    } else if has("vimeo.com") {
        "Vimeo"
    } else {
        "Unknown"
    }
}

/// 11-character YouTube video id from watch, embed, shorts and youtu.be links
pub fn youtube_video_id(url: &str) -> Option<String> {
    YOUTUBE_ID
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn ladder_rank(label: &str) -> usize {
    QUALITY_LADDER
        .iter()
        .position(|q| *q == label)
        .unwrap_or(QUALITY_LADDER.len())
}

fn quality_order(a: &MediaFormat, b: &MediaFormat, quality: VideoQuality) -> Ordering {
    let (ra, rb) = (ladder_rank(&a.quality_label), ladder_rank(&b.quality_label));
    match quality {
        VideoQuality::Best => ra.cmp(&rb),
        VideoQuality::Worst => rb.cmp(&ra),
        specific => {
            let wanted = specific.as_str();
            let (ma, mb) = (a.quality_label == wanted, b.quality_label == wanted);
            mb.cmp(&ma).then(ra.cmp(&rb))
        }
    }
}

/// Order formats for the requested quality (stable).
///
/// `best` sorts down the ladder, `worst` up it, and a concrete quality puts
/// exact matches first followed by the rest best-first.
pub fn sort_formats(formats: &mut [MediaFormat], quality: VideoQuality) {
    formats.sort_by(|a, b| quality_order(a, b, quality));
}

/// Pick the format a downloader should fetch: matching container first, then
/// quality order.
pub fn select_best_format<'a>(
    formats: &'a [MediaFormat],
    quality: VideoQuality,
    container: &str,
) -> Option<&'a MediaFormat> {
    let mut ranked: Vec<&MediaFormat> = formats.iter().collect();
    ranked.sort_by(|a, b| {
        let (ca, cb) = (a.container == container, b.container == container);
        cb.cmp(&ca).then_with(|| quality_order(a, b, quality))
    });
    ranked.into_iter().next()
}
