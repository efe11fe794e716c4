//! Async poll loop driving a [`DownloadManager`] on the tokio runtime

use super::{DownloadEvent, DownloadManager, DownloadPhase, Installer, TransferSource};
use crate::constants::{INSTALL_SETTLE_DELAY, POLL_INTERVAL};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::debug;

fn lock<M>(mutex: &Mutex<M>) -> MutexGuard<'_, M> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Poll the manager until its session ends, forwarding every event.
///
/// Wakes on each interval tick or as soon as the session is cancelled. The
/// manager lock is only held for the duration of a single tick. After a
/// completed download the loop waits `settle_delay` before the install step;
/// a cancel cuts that wait short.
pub async fn run_poll_loop<T, I>(
    manager: Arc<Mutex<DownloadManager<T, I>>>,
    events: UnboundedSender<DownloadEvent>,
    poll_interval: Duration,
    settle_delay: Duration,
) where
    T: TransferSource,
    I: Installer,
{
    let token = lock(&manager).cancel_token();
    let mut ticker = tokio::time::interval(poll_interval);

    loop {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = ticker.tick() => {}
        }

        let (event, phase) = {
            let mut m = lock(&manager);
            let event = m.tick(Instant::now());
            (event, m.phase())
        };

        match event {
            Some(event) => {
                let terminal = event.is_terminal();
                let completed = matches!(event, DownloadEvent::Completed { .. });
                // Receiver may be gone; the session still runs to its end
                let _ = events.send(event);
                if terminal {
                    break;
                }
                if completed {
                    tokio::select! {
                        _ = token.cancelled() => {}
                        _ = tokio::time::sleep(settle_delay) => {}
                    }
                }
            }
            None if phase == DownloadPhase::Idle => break,
            None => {}
        }
    }

    debug!("Download poll loop finished");
}

/// Spawn the poll loop with the standard poll interval and install settle delay
pub fn spawn_poll_loop<T, I>(
    runtime: &tokio::runtime::Handle,
    manager: Arc<Mutex<DownloadManager<T, I>>>,
    events: UnboundedSender<DownloadEvent>,
) -> JoinHandle<()>
where
    T: TransferSource + 'static,
    I: Installer + 'static,
{
    runtime.spawn(run_poll_loop(manager, events, POLL_INTERVAL, INSTALL_SETTLE_DELAY))
}
