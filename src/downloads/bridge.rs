//! Collaborator seams for the native transfer and install services

use crate::errors::Result;
use std::path::Path;

/// Progress triple as reported by the transfer source, before parsing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawProgress {
    pub downloaded: String,
    pub total: String,
    pub percent: String,
}

impl RawProgress {
    pub fn new(downloaded: impl Into<String>, total: impl Into<String>, percent: impl Into<String>) -> Self {
        Self {
            downloaded: downloaded.into(),
            total: total.into(),
            percent: percent.into(),
        }
    }

    pub fn read(&self) -> Reading {
        // A missing field means the source has nothing yet, not bad data
        let fields = [&self.downloaded, &self.total, &self.percent];
        if fields.iter().any(|f| f.trim().is_empty()) {
            return Reading::Empty;
        }

        let parsed = (
            self.downloaded.trim().parse::<u64>(),
            self.total.trim().parse::<u64>(),
            self.percent.trim().parse::<f64>(),
        );
        match parsed {
            (Ok(downloaded), Ok(total), Ok(percent)) if percent.is_finite() => {
                Reading::Valid(ProgressReading { downloaded, total, percent })
            }
            _ => Reading::Unparseable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressReading {
    pub downloaded: u64,
    pub total: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Empty,
    Unparseable,
    Valid(ProgressReading),
}

/// One status poll of the transfer source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStatus {
    Report(RawProgress),
    /// Nothing to report yet
    Empty,
    /// The source's error sentinel; the transfer is dead
    Error,
}

/// Native download service
pub trait TransferSource: Send {
    /// Begin a direct download of `key` into the `destination` directory
    fn start_download(&mut self, key: &str, destination: &str, display_name: &str) -> Result<()>;

    /// Hand the package to the background download-and-install queue
    fn download_and_install(&mut self, key: &str, name: &str, cover_url: Option<&str>) -> Result<()>;

    fn status(&mut self) -> TransferStatus;

    /// Whether the finished transfer reported success
    fn succeeded(&self) -> bool;

    fn cancel(&mut self);
}

/// Native package installer
pub trait Installer: Send {
    fn install_local_package(&mut self, path: &Path, display_name: &str, delete_after: bool) -> Result<()>;
}
