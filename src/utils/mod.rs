//! Utility modules for error handling, configuration and helpers

pub mod config;
pub mod error;
pub mod helpers;
pub mod tools;

// Re-export for convenience
pub use config::ExtractorSettings;
pub use error::{ExtractorError, SettingsError};
pub use helpers::{clean_title, host_matches, platform_label, select_best_format, sort_formats};
