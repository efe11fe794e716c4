//! Download lifecycle: one direct download at a time, polled to completion

mod bridge;
mod session;
mod task;

#[cfg(test)]
mod fakes;

pub use bridge::{Installer, ProgressReading, RawProgress, Reading, TransferSource, TransferStatus};
pub use session::{DownloadSession, ProgressSnapshot, SpeedWindow};
pub use task::{run_poll_loop, spawn_poll_loop};

use crate::constants::{COMPLETION_PERCENT, MAX_UNREADABLE_POLLS};
use crate::errors::{Error, Result};
use crate::settings::Settings;
use crate::types::ContentRecord;
use std::path::PathBuf;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

// ============================================================================
// STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadPhase {
    Idle,
    Polling,
    Completed,
    Installing,
    Cancelled,
    Errored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The transfer source reported its error sentinel
    Sentinel,
    /// Progress stayed unreadable for too many polls after a good one
    Unreadable,
    Install(String),
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Sentinel => write!(f, "transfer reported an error"),
            FailureReason::Unreadable => write!(f, "transfer progress unreadable"),
            FailureReason::Install(msg) => write!(f, "install failed: {}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DownloadEvent {
    Started { title: String, path: PathBuf },
    /// Handed to the background download-and-install queue
    Queued { title: String },
    Progress(ProgressSnapshot),
    Completed { path: PathBuf },
    Installing { path: PathBuf },
    Installed { path: PathBuf },
    /// Completed without an install step
    Finished { path: PathBuf },
    Cancelled,
    Failed(FailureReason),
}

impl DownloadEvent {
    /// Whether the session is over once this event is seen
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DownloadEvent::Installed { .. }
                | DownloadEvent::Finished { .. }
                | DownloadEvent::Cancelled
                | DownloadEvent::Failed(_)
        )
    }
}

/// Download-related preferences captured when a download starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    pub direct_download: bool,
    pub download_path: String,
    pub install_after: bool,
    pub delete_after: bool,
}

impl From<&Settings> for DownloadOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            direct_download: settings.direct_download,
            download_path: settings.download_path.clone(),
            install_after: settings.install_after,
            delete_after: settings.delete_after,
        }
    }
}

// ============================================================================
// MANAGER
// ============================================================================

pub struct DownloadManager<T: TransferSource, I: Installer> {
    transfer: T,
    installer: I,
    phase: DownloadPhase,
    options: Option<DownloadOptions>,
    session: Option<DownloadSession>,
    progress: Option<ProgressSnapshot>,
    cancel_token: CancellationToken,
}

impl<T: TransferSource, I: Installer> DownloadManager<T, I> {
    pub fn new(transfer: T, installer: I) -> Self {
        Self {
            transfer,
            installer,
            phase: DownloadPhase::Idle,
            options: None,
            session: None,
            progress: None,
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn phase(&self) -> DownloadPhase {
        self.phase
    }

    pub fn progress(&self) -> Option<&ProgressSnapshot> {
        self.progress.as_ref()
    }

    pub fn session(&self) -> Option<&DownloadSession> {
        self.session.as_ref()
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.phase,
            DownloadPhase::Polling | DownloadPhase::Completed | DownloadPhase::Installing
        )
    }

    pub fn transfer(&self) -> &T {
        &self.transfer
    }

    pub fn installer(&self) -> &I {
        &self.installer
    }

    /// Token for the current session; cancelled by [`Self::request_cancel`]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Cancellation takes effect at the next tick
    pub fn request_cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Start downloading `record`. In background mode the record is queued
    /// with the transfer source and no session is created.
    pub fn start(&mut self, record: &ContentRecord, options: DownloadOptions, now: Instant) -> Result<DownloadEvent> {
        if self.is_active() {
            return Err(Error::Busy);
        }

        if !options.direct_download {
            self.transfer
                .download_and_install(&record.key, &record.name, record.cover_url.as_deref())?;
            info!(title = %record.name, "Queued for background download and install");
            return Ok(DownloadEvent::Queued { title: record.name.clone() });
        }

        let display_name = record.display_name();
        let package_path = PathBuf::from(format!("{}{}", options.download_path, record.package_file_name()));
        self.transfer
            .start_download(&record.key, &options.download_path, &display_name)?;

        info!(title = %record.name, path = %package_path.display(), "Download started");
        self.cancel_token = CancellationToken::new();
        self.progress = None;
        self.session = Some(DownloadSession::new(
            record.key.clone(),
            record.name.clone(),
            display_name,
            package_path.clone(),
            now,
        ));
        self.options = Some(options);
        self.phase = DownloadPhase::Polling;

        Ok(DownloadEvent::Started {
            title: record.name.clone(),
            path: package_path,
        })
    }

    /// Advance the lifecycle by one step. A pending cancel wins over
    /// whatever the active phase would do next.
    pub fn tick(&mut self, now: Instant) -> Option<DownloadEvent> {
        match self.phase {
            DownloadPhase::Idle => None,
            DownloadPhase::Cancelled | DownloadPhase::Errored => {
                self.phase = DownloadPhase::Idle;
                None
            }
            _ if self.cancel_token.is_cancelled() => Some(self.abort()),
            DownloadPhase::Polling => self.poll(now),
            DownloadPhase::Completed => Some(self.finish()),
            DownloadPhase::Installing => Some(self.install()),
        }
    }

    fn abort(&mut self) -> DownloadEvent {
        info!(phase = ?self.phase, "Download cancelled");
        self.transfer.cancel();
        self.clear();
        self.phase = DownloadPhase::Cancelled;
        DownloadEvent::Cancelled
    }

    fn poll(&mut self, now: Instant) -> Option<DownloadEvent> {
        let reading = match self.transfer.status() {
            TransferStatus::Error => {
                error!("Transfer source reported an error");
                return Some(self.fail(FailureReason::Sentinel));
            }
            TransferStatus::Empty => Reading::Empty,
            TransferStatus::Report(raw) => raw.read(),
        };

        let session = self.session.as_mut()?;
        match reading {
            Reading::Empty => {
                // Only back-to-back unreadable polls count
                session.unreadable_polls = 0;
                debug!("No transfer status yet");
                None
            }
            Reading::Unparseable => {
                session.unreadable_polls += 1;
                warn!(polls = session.unreadable_polls, "Unreadable transfer status");
                if session.seen_valid && session.unreadable_polls >= MAX_UNREADABLE_POLLS {
                    Some(self.fail(FailureReason::Unreadable))
                } else {
                    None
                }
            }
            Reading::Valid(reading) => {
                let snapshot = session.sample(&reading, now);
                let path = session.package_path.clone();
                self.progress = Some(snapshot.clone());
                if reading.percent >= COMPLETION_PERCENT {
                    info!(path = %path.display(), "Download complete");
                    self.phase = DownloadPhase::Completed;
                    Some(DownloadEvent::Completed { path })
                } else {
                    Some(DownloadEvent::Progress(snapshot))
                }
            }
        }
    }

    fn should_install(&self) -> bool {
        let direct_install = self
            .options
            .as_ref()
            .is_some_and(|o| o.direct_download && o.install_after);
        direct_install && self.transfer.succeeded()
    }

    fn package_path(&self) -> PathBuf {
        self.session
            .as_ref()
            .map(|s| s.package_path.clone())
            .unwrap_or_default()
    }

    fn finish(&mut self) -> DownloadEvent {
        let path = self.package_path();
        if self.should_install() {
            self.phase = DownloadPhase::Installing;
            return DownloadEvent::Installing { path };
        }

        debug!(path = %path.display(), "Download finished without install");
        self.clear();
        self.phase = DownloadPhase::Idle;
        DownloadEvent::Finished { path }
    }

    fn install(&mut self) -> DownloadEvent {
        let path = self.package_path();
        let title = self
            .session
            .as_ref()
            .map(|s| s.title.clone())
            .unwrap_or_default();
        let delete_after = self.options.as_ref().is_some_and(|o| o.delete_after);

        match self.installer.install_local_package(&path, &title, delete_after) {
            Ok(()) => {
                info!(path = %path.display(), "Package installed");
                self.clear();
                self.phase = DownloadPhase::Idle;
                DownloadEvent::Installed { path }
            }
            Err(e) => {
                error!(error = %e, path = %path.display(), "Install failed");
                self.fail(FailureReason::Install(e.to_string()))
            }
        }
    }

    fn fail(&mut self, reason: FailureReason) -> DownloadEvent {
        self.clear();
        self.phase = DownloadPhase::Errored;
        DownloadEvent::Failed(reason)
    }

    fn clear(&mut self) {
        self.session = None;
        self.progress = None;
        self.options = None;
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::{FakeInstaller, FakeTransfer};
    use super::*;
    use crate::test_support::record;
    use std::time::Duration;

    fn options() -> DownloadOptions {
        DownloadOptions::from(&Settings::default())
    }

    fn manager(statuses: Vec<TransferStatus>) -> DownloadManager<FakeTransfer, FakeInstaller> {
        DownloadManager::new(FakeTransfer::scripted(statuses), FakeInstaller::default())
    }

    fn report(downloaded: &str, total: &str, percent: &str) -> TransferStatus {
        TransferStatus::Report(RawProgress::new(downloaded, total, percent))
    }

    #[test]
    fn direct_download_installs_on_completion() {
        let mut m = manager(vec![
            report("1000000", "10000000", "10"),
            report("9900000", "10000000", "99"),
        ]);
        let t0 = Instant::now();
        let rec = record("https://cdn/foo.pkg", "CUSA00001", "Foo", "USA", "10000000");

        let started = m.start(&rec, options(), t0).unwrap();
        assert_eq!(
            started,
            DownloadEvent::Started {
                title: "Foo".into(),
                path: PathBuf::from("/user/data/pkg/Foo [CUSA00001].pkg"),
            }
        );
        assert_eq!(m.transfer().started[0].1, "/user/data/pkg/");
        assert_eq!(m.transfer().started[0].2, "Foo [CUSA00001]");

        let snap = match m.tick(t0 + Duration::from_secs(1)) {
            Some(DownloadEvent::Progress(snap)) => snap,
            other => panic!("expected progress, got {:?}", other),
        };
        assert_eq!(snap.eta, Some(Duration::from_secs(9)));
        assert!(m.progress().is_some());

        assert!(matches!(m.tick(t0 + Duration::from_secs(2)), Some(DownloadEvent::Completed { .. })));
        assert_eq!(m.phase(), DownloadPhase::Completed);
        assert!(matches!(m.tick(t0), Some(DownloadEvent::Installing { .. })));
        assert!(matches!(m.tick(t0), Some(DownloadEvent::Installed { .. })));

        assert_eq!(m.phase(), DownloadPhase::Idle);
        assert!(m.progress().is_none());
        assert!(m.session().is_none());
        let installs = &m.installer().installs;
        assert_eq!(installs.len(), 1);
        assert_eq!(installs[0].0, PathBuf::from("/user/data/pkg/Foo [CUSA00001].pkg"));
        assert_eq!(installs[0].1, "Foo");
        assert!(!installs[0].2);
    }

    #[test]
    fn error_sentinel_clears_without_install() {
        let mut m = manager(vec![report("10", "100", "10"), TransferStatus::Error]);
        let t0 = Instant::now();
        m.start(&record("k", "CUSA1", "Foo", "USA", "100"), options(), t0).unwrap();

        m.tick(t0);
        assert_eq!(m.tick(t0), Some(DownloadEvent::Failed(FailureReason::Sentinel)));
        assert_eq!(m.phase(), DownloadPhase::Errored);
        assert!(m.progress().is_none());
        assert!(m.session().is_none());

        assert_eq!(m.tick(t0), None);
        assert_eq!(m.phase(), DownloadPhase::Idle);
        assert!(m.installer().installs.is_empty());
    }

    #[test]
    fn install_skipped_when_disabled_or_unsuccessful() {
        let t0 = Instant::now();
        let rec = record("k", "CUSA1", "Foo", "USA", "100");

        let mut m = manager(vec![report("100", "100", "100")]);
        let opts = DownloadOptions { install_after: false, ..options() };
        m.start(&rec, opts, t0).unwrap();
        m.tick(t0);
        assert!(matches!(m.tick(t0), Some(DownloadEvent::Finished { .. })));
        assert!(m.installer().installs.is_empty());

        let mut transfer = FakeTransfer::scripted(vec![report("100", "100", "98")]);
        transfer.success = false;
        let mut m = DownloadManager::new(transfer, FakeInstaller::default());
        m.start(&rec, options(), t0).unwrap();
        assert!(matches!(m.tick(t0), Some(DownloadEvent::Completed { .. })));
        assert!(matches!(m.tick(t0), Some(DownloadEvent::Finished { .. })));
        assert!(m.installer().installs.is_empty());
    }

    #[test]
    fn cancel_is_seen_on_the_next_tick() {
        let mut m = manager(vec![report("10", "100", "10"), report("20", "100", "20")]);
        let t0 = Instant::now();
        m.start(&record("k", "CUSA1", "Foo", "USA", "100"), options(), t0).unwrap();
        m.tick(t0);

        m.request_cancel();
        assert_eq!(m.phase(), DownloadPhase::Polling);
        assert_eq!(m.tick(t0), Some(DownloadEvent::Cancelled));
        assert!(m.transfer().cancelled);
        assert!(m.progress().is_none());
        assert_eq!(m.phase(), DownloadPhase::Cancelled);
        m.tick(t0);
        assert_eq!(m.phase(), DownloadPhase::Idle);
    }

    #[test]
    fn unreadable_status_is_retried_then_fatal() {
        let garbage = || report("??", "100", "x");
        let mut m = manager(vec![
            garbage(),
            garbage(),
            garbage(),
            TransferStatus::Empty,
            report("10", "100", "10"),
            garbage(),
            garbage(),
            garbage(),
        ]);
        let t0 = Instant::now();
        m.start(&record("k", "CUSA1", "Foo", "USA", "100"), options(), t0).unwrap();

        for _ in 0..4 {
            assert_eq!(m.tick(t0), None);
            assert_eq!(m.phase(), DownloadPhase::Polling);
        }
        assert!(matches!(m.tick(t0), Some(DownloadEvent::Progress(_))));
        assert_eq!(m.tick(t0), None);
        assert_eq!(m.tick(t0), None);
        assert_eq!(m.tick(t0), Some(DownloadEvent::Failed(FailureReason::Unreadable)));
    }

    #[test]
    fn background_mode_queues_without_session() {
        let mut m = manager(Vec::new());
        let rec = ContentRecord {
            cover_url: Some("https://cdn/cover.png".into()),
            ..record("https://cdn/foo.pkg", "CUSA1", "Foo", "USA", "100")
        };
        let opts = DownloadOptions { direct_download: false, ..options() };

        let event = m.start(&rec, opts, Instant::now()).unwrap();
        assert_eq!(event, DownloadEvent::Queued { title: "Foo".into() });
        assert_eq!(m.phase(), DownloadPhase::Idle);
        assert!(m.session().is_none());
        assert_eq!(
            m.transfer().queued,
            vec![(
                "https://cdn/foo.pkg".to_string(),
                "Foo".to_string(),
                Some("https://cdn/cover.png".to_string())
            )]
        );
    }

    #[test]
    fn missing_fields_after_a_valid_read_keep_polling() {
        let partial = || report("", "100", "50");
        let mut m = manager(vec![report("10", "100", "10"), partial(), partial(), partial(), partial()]);
        let t0 = Instant::now();
        m.start(&record("k", "CUSA1", "Foo", "USA", "100"), options(), t0).unwrap();

        assert!(matches!(m.tick(t0), Some(DownloadEvent::Progress(_))));
        for _ in 0..4 {
            assert_eq!(m.tick(t0), None);
        }
        assert_eq!(m.phase(), DownloadPhase::Polling);
        assert!(m.progress().is_some());
    }

    #[test]
    fn empty_read_breaks_an_unreadable_streak() {
        let garbage = || report("??", "100", "x");
        let mut m = manager(vec![
            report("10", "100", "10"),
            garbage(),
            garbage(),
            TransferStatus::Empty,
            garbage(),
            garbage(),
            garbage(),
        ]);
        let t0 = Instant::now();
        m.start(&record("k", "CUSA1", "Foo", "USA", "100"), options(), t0).unwrap();

        m.tick(t0);
        for _ in 0..5 {
            assert_eq!(m.tick(t0), None);
        }
        assert_eq!(m.phase(), DownloadPhase::Polling);
        assert_eq!(m.tick(t0), Some(DownloadEvent::Failed(FailureReason::Unreadable)));
    }

    #[test]
    fn cancel_after_completion_skips_install() {
        let mut m = manager(vec![report("100", "100", "100")]);
        let t0 = Instant::now();
        m.start(&record("k", "CUSA1", "Foo", "USA", "100"), options(), t0).unwrap();
        assert!(matches!(m.tick(t0), Some(DownloadEvent::Completed { .. })));

        m.request_cancel();
        assert_eq!(m.tick(t0), Some(DownloadEvent::Cancelled));
        assert_eq!(m.phase(), DownloadPhase::Cancelled);
        assert!(m.session().is_none());
        assert!(m.transfer().cancelled);
        m.tick(t0);
        assert!(m.installer().installs.is_empty());
        assert_eq!(m.phase(), DownloadPhase::Idle);
    }

    #[test]
    fn cancel_while_installing_skips_install() {
        let mut m = manager(vec![report("100", "100", "100")]);
        let t0 = Instant::now();
        m.start(&record("k", "CUSA1", "Foo", "USA", "100"), options(), t0).unwrap();
        m.tick(t0);
        assert!(matches!(m.tick(t0), Some(DownloadEvent::Installing { .. })));

        m.request_cancel();
        assert_eq!(m.tick(t0), Some(DownloadEvent::Cancelled));
        assert!(m.installer().installs.is_empty());
    }

    #[test]
    fn second_start_while_active_is_busy() {
        let mut m = manager(Vec::new());
        let rec = record("k", "CUSA1", "Foo", "USA", "100");
        m.start(&rec, options(), Instant::now()).unwrap();
        assert!(matches!(m.start(&rec, options(), Instant::now()), Err(Error::Busy)));
    }

    #[test]
    fn install_failure_is_reported() {
        let mut installer = FakeInstaller::default();
        installer.fail = true;
        let mut m = DownloadManager::new(FakeTransfer::scripted(vec![report("1", "1", "100")]), installer);
        let t0 = Instant::now();
        m.start(&record("k", "CUSA1", "Foo", "USA", "1"), options(), t0).unwrap();

        m.tick(t0);
        m.tick(t0);
        assert!(matches!(m.tick(t0), Some(DownloadEvent::Failed(FailureReason::Install(_)))));
        assert_eq!(m.phase(), DownloadPhase::Errored);
    }
}
