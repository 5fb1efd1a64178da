//! Download lifecycle tracking

pub mod progress;

pub use progress::{DownloadStatus, DownloadTracker, TransitionError};
