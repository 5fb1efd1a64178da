pub mod cobalt;
pub mod gallery_dl;
pub mod models;
pub mod orchestrator;
pub mod registry;
pub mod simple;
pub mod traits;
pub mod ytdlp;

pub use cobalt::CobaltExtractor;
pub use gallery_dl::GalleryDlExtractor;
pub use models::{
    ErrorKind, ExtractRequest, ExtractedMedia, ExtractionFailure, ExtractionOutcome, MediaFormat,
    VideoMetadata, VideoQuality,
};
pub use orchestrator::{ExtractionOrchestrator, RetryPolicy};
pub use registry::ExtractorRegistry;
pub use simple::SimpleExtractor;
pub use traits::{Extractor, ExtractorDescriptor};
pub use ytdlp::YtDlpExtractor;
