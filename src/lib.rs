//! vidfetch library
//!
//! Resolves a media page URL into normalized metadata and downloadable
//! formats by trying several extraction backends in priority order.

pub mod downloader;
pub mod extractor;
pub mod utils;

// Re-export main types for easier use
pub use downloader::{DownloadStatus, DownloadTracker, TransitionError};
pub use extractor::{
    ErrorKind, ExtractRequest, ExtractedMedia, ExtractionFailure, ExtractionOrchestrator,
    ExtractionOutcome, Extractor, ExtractorDescriptor, ExtractorRegistry, MediaFormat,
    RetryPolicy, VideoMetadata, VideoQuality,
};
pub use utils::{ExtractorError, ExtractorSettings, SettingsError};
