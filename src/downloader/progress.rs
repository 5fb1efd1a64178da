//! Progress tracking for downloads
//!
//! A tracker is owned by whoever drives the download; every mutation takes
//! `&mut self`, so transitions are serialized by construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Download status
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "message")]
pub enum DownloadStatus {
    #[default]
    Pending,
    Downloading,
    Paused,
    Completed,
    Error(String),
}

impl DownloadStatus {
    fn label(&self) -> &'static str {
        match self {
            DownloadStatus::Pending => "pending",
            DownloadStatus::Downloading => "downloading",
            DownloadStatus::Paused => "paused",
            DownloadStatus::Completed => "completed",
            DownloadStatus::Error(_) => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DownloadStatus::Completed | DownloadStatus::Error(_))
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {action} a download that is {from}")]
pub struct TransitionError {
    pub action: &'static str,
    pub from: DownloadStatus,
}

/// Lifecycle of one download
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadTracker {
    id: String,
    url: String,
    title: String,
    progress: u8,
    status: DownloadStatus,
}

impl DownloadTracker {
    pub fn new(id: impl Into<String>, url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            title: title.into(),
            progress: 0,
            status: DownloadStatus::Pending,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Percent complete, 0..=100
    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn status(&self) -> &DownloadStatus {
        &self.status
    }

    fn transition(
        &mut self,
        action: &'static str,
        allowed: impl FnOnce(&DownloadStatus) -> bool,
        next: DownloadStatus,
    ) -> Result<(), TransitionError> {
        if !allowed(&self.status) {
            return Err(TransitionError {
                action,
                from: self.status.clone(),
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.transition(
            "start",
            |s| *s == DownloadStatus::Pending,
            DownloadStatus::Downloading,
        )
    }

    pub fn pause(&mut self) -> Result<(), TransitionError> {
        self.transition(
            "pause",
            |s| *s == DownloadStatus::Downloading,
            DownloadStatus::Paused,
        )
    }

    pub fn resume(&mut self) -> Result<(), TransitionError> {
        self.transition(
            "resume",
            |s| *s == DownloadStatus::Paused,
            DownloadStatus::Downloading,
        )
    }

    /// Mark as completed; progress jumps to 100
    pub fn complete(&mut self) -> Result<(), TransitionError> {
        self.transition(
            "complete",
            |s| *s == DownloadStatus::Downloading,
            DownloadStatus::Completed,
        )?;
        self.progress = 100;
        Ok(())
    }

    /// Mark as failed. Progress is kept where it stopped.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(
            "fail",
            |s| !s.is_terminal(),
            DownloadStatus::Error(message.into()),
        )
    }

    /// Update progress; values above 100 are clamped
    pub fn update_progress(&mut self, percent: u8) -> Result<(), TransitionError> {
        if self.status != DownloadStatus::Downloading {
            return Err(TransitionError {
                action: "update",
                from: self.status.clone(),
            });
        }
        self.progress = percent.min(100);
        Ok(())
    }
}
