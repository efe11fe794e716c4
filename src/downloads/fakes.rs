use super::bridge::{Installer, TransferSource, TransferStatus};
use crate::errors::{Error, Result};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// Transfer source that replays a fixed list of statuses, then reports empty
pub(crate) struct FakeTransfer {
    statuses: VecDeque<TransferStatus>,
    pub started: Vec<(String, String, String)>,
    pub queued: Vec<(String, String, Option<String>)>,
    pub cancelled: bool,
    pub success: bool,
}

impl FakeTransfer {
    pub fn scripted(statuses: Vec<TransferStatus>) -> Self {
        Self {
            statuses: statuses.into(),
            started: Vec::new(),
            queued: Vec::new(),
            cancelled: false,
            success: true,
        }
    }
}

impl TransferSource for FakeTransfer {
    fn start_download(&mut self, key: &str, destination: &str, display_name: &str) -> Result<()> {
        self.started
            .push((key.to_string(), destination.to_string(), display_name.to_string()));
        Ok(())
    }

    fn download_and_install(&mut self, key: &str, name: &str, cover_url: Option<&str>) -> Result<()> {
        self.queued
            .push((key.to_string(), name.to_string(), cover_url.map(str::to_string)));
        Ok(())
    }

    fn status(&mut self) -> TransferStatus {
        self.statuses.pop_front().unwrap_or(TransferStatus::Empty)
    }

    fn succeeded(&self) -> bool {
        self.success
    }

    fn cancel(&mut self) {
        self.cancelled = true;
    }
}

#[derive(Default)]
pub(crate) struct FakeInstaller {
    pub installs: Vec<(PathBuf, String, bool)>,
    pub fail: bool,
}

impl Installer for FakeInstaller {
    fn install_local_package(&mut self, path: &Path, display_name: &str, delete_after: bool) -> Result<()> {
        if self.fail {
            return Err(Error::Transfer("installer rejected package".into()));
        }
        self.installs
            .push((path.to_path_buf(), display_name.to_string(), delete_after));
        Ok(())
    }
}
