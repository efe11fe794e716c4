//! Per-download speed sampling and progress snapshots

use super::bridge::ProgressReading;
use crate::constants::{SAMPLE_INTERVAL, SPEED_HISTORY};
use crate::utils::{format_bytes, format_duration};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Last few instantaneous speeds, oldest first
#[derive(Debug, Clone, Default)]
pub struct SpeedWindow {
    samples: VecDeque<f64>,
}

impl SpeedWindow {
    pub fn push(&mut self, speed: f64) {
        if self.samples.len() == SPEED_HISTORY {
            self.samples.pop_front();
        }
        self.samples.push_back(speed);
    }

    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Bookkeeping for the one active direct download
#[derive(Debug, Clone)]
pub struct DownloadSession {
    /// Catalog key of the record being downloaded
    pub target_key: String,
    pub title: String,
    pub display_name: String,
    pub package_path: PathBuf,
    pub start_time: Instant,
    last_sample_time: Instant,
    last_downloaded_bytes: u64,
    /// Last total reported by the transfer source
    pub total_bytes: u64,
    speeds: SpeedWindow,
    pub(crate) unreadable_polls: u32,
    pub(crate) seen_valid: bool,
}

impl DownloadSession {
    pub fn new(target_key: String, title: String, display_name: String, package_path: PathBuf, now: Instant) -> Self {
        Self {
            target_key,
            title,
            display_name,
            package_path,
            start_time: now,
            last_sample_time: now,
            last_downloaded_bytes: 0,
            total_bytes: 0,
            speeds: SpeedWindow::default(),
            unreadable_polls: 0,
            seen_valid: false,
        }
    }

    pub fn speeds(&self) -> &SpeedWindow {
        &self.speeds
    }

    /// Fold a valid reading into the session. A new speed sample is taken
    /// only once a full sample interval has passed since the previous one.
    pub fn sample(&mut self, reading: &ProgressReading, now: Instant) -> ProgressSnapshot {
        self.seen_valid = true;
        self.unreadable_polls = 0;
        self.total_bytes = reading.total;

        let since_last = now.saturating_duration_since(self.last_sample_time);
        if since_last >= SAMPLE_INTERVAL {
            let delta = reading.downloaded.saturating_sub(self.last_downloaded_bytes) as f64;
            self.speeds.push(delta / since_last.as_secs_f64());
            self.last_sample_time = now;
            self.last_downloaded_bytes = reading.downloaded;
        }

        let speed = self.speeds.mean();
        let remaining = reading.total.saturating_sub(reading.downloaded) as f64;
        let eta = (speed > 0.0).then(|| Duration::from_secs_f64((remaining / speed).max(0.0)));

        ProgressSnapshot {
            title: self.title.clone(),
            speed,
            eta,
            elapsed: now.saturating_duration_since(self.start_time),
            downloaded: reading.downloaded,
            total: reading.total,
            percent: reading.percent,
        }
    }
}

/// Published progress of the active download
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub title: String,
    /// Smoothed bytes per second
    pub speed: f64,
    /// `None` until a positive speed is known
    pub eta: Option<Duration>,
    pub elapsed: Duration,
    pub downloaded: u64,
    pub total: u64,
    pub percent: f64,
}

impl ProgressSnapshot {
    /// Lines for the progress panel
    pub fn info_text(&self) -> Vec<String> {
        let eta = self.eta.map(format_duration).unwrap_or_else(|| "--".to_string());
        vec![
            format!("Speed: {}/s", format_bytes(self.speed)),
            format!("Time remaining: {}", eta),
            format!("Elapsed: {}", format_duration(self.elapsed)),
            format!(
                "{} / {} ({:.0}%)",
                format_bytes(self.downloaded as f64),
                format_bytes(self.total as f64),
                self.percent
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(downloaded: u64, total: u64, percent: f64) -> ProgressReading {
        ProgressReading { downloaded, total, percent }
    }

    fn session(now: Instant) -> DownloadSession {
        DownloadSession::new(
            "https://cdn/foo.pkg".into(),
            "Foo".into(),
            "Foo [CUSA00001]".into(),
            PathBuf::from("/user/data/pkg/Foo [CUSA00001].pkg"),
            now,
        )
    }

    #[test]
    fn window_keeps_last_five() {
        let mut window = SpeedWindow::default();
        for speed in [10.0, 20.0, 30.0, 40.0, 50.0, 60.0] {
            window.push(speed);
        }
        assert_eq!(window.len(), 5);
        assert!((window.mean() - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn one_megabyte_per_second() {
        let t0 = Instant::now();
        let mut s = session(t0);

        let snap = s.sample(&reading(1_000_000, 10_000_000, 10.0), t0 + Duration::from_secs(1));
        assert!((snap.speed - 1_000_000.0).abs() < 1e-6);
        assert_eq!(snap.eta, Some(Duration::from_secs(9)));
        assert_eq!(snap.elapsed, Duration::from_secs(1));
        assert_eq!(s.total_bytes, 10_000_000);
        assert_eq!(s.target_key, "https://cdn/foo.pkg");

        let text = snap.info_text();
        assert_eq!(text[0], "Speed: 1 MB/s");
        assert_eq!(text[1], "Time remaining: 9s");
        assert_eq!(text[3], "1 MB / 10 MB (10%)");
    }

    #[test]
    fn steady_rate_smooths_to_the_instantaneous_speed() {
        let t0 = Instant::now();
        let mut s = session(t0);

        let mut snap = None;
        for second in 1..=5u64 {
            let downloaded = second * 100_000;
            snap = Some(s.sample(
                &reading(downloaded, 1_000_000, downloaded as f64 / 10_000.0),
                t0 + Duration::from_secs(second),
            ));
        }
        let snap = snap.unwrap();
        assert_eq!(s.speeds().len(), 5);
        assert!((snap.speed - 100_000.0).abs() < 1e-6);
        assert_eq!(snap.eta, Some(Duration::from_secs(5)));
    }

    #[test]
    fn no_sample_inside_the_interval() {
        let t0 = Instant::now();
        let mut s = session(t0);

        let snap = s.sample(&reading(500_000, 10_000_000, 5.0), t0 + Duration::from_millis(400));
        assert!(s.speeds().is_empty());
        assert_eq!(snap.speed, 0.0);
        assert_eq!(snap.eta, None);
        assert_eq!(snap.info_text()[1], "Time remaining: --");
    }

    #[test]
    fn stalled_transfer_drags_the_mean_down() {
        let t0 = Instant::now();
        let mut s = session(t0);

        s.sample(&reading(2_000_000, 10_000_000, 20.0), t0 + Duration::from_secs(1));
        let snap = s.sample(&reading(2_000_000, 10_000_000, 20.0), t0 + Duration::from_secs(2));
        assert_eq!(s.speeds().len(), 2);
        assert!((snap.speed - 1_000_000.0).abs() < 1e-6);
        assert_eq!(snap.eta, Some(Duration::from_secs(8)));
    }

    #[test]
    fn eta_never_negative() {
        let t0 = Instant::now();
        let mut s = session(t0);
        let snap = s.sample(&reading(12, 10, 100.0), t0 + Duration::from_secs(1));
        assert_eq!(snap.eta, Some(Duration::ZERO));
    }
}
