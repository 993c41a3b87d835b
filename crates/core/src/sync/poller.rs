//! Periodic cache refresh for one principal's visible application set.
//!
//! The poller runs on a dedicated background thread. Every interval it asks
//! the [`SyncSource`] whether the local cache is stale, forces a refresh when
//! it is, re-reads the principal's applications and raises
//! `applications_changed` only when the normalized snapshot differs from the
//! previous iteration's. Iterations never overlap and the snapshot is touched
//! only by the poller's own thread.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};

use crate::errors::Result;
use crate::launcher::{Application, LauncherRepositoryTrait};

use super::{LauncherObserver, SyncStatus};

/// Default refresh cadence in seconds.
pub const REFRESH_DEFAULT_INTERVAL_SECS: u64 = 10;

/// Stop-flag poll slice; bounds shutdown latency regardless of the
/// configured interval.
pub const REFRESH_STOP_SLICE_MS: u64 = 250;

/// Delay after a failed iteration before the next attempt (shorter than the
/// regular interval).
pub const REFRESH_ERROR_RETRY_SECS: u64 = 2;

/// External source of truth the local cache mirrors.
pub trait SyncSource: Send + Sync {
    /// Compare the local sync marker against the source clock.
    fn check_synced(&self) -> Result<SyncStatus>;

    /// Pull fresh data from the source into the local cache.
    fn force_sync(&self) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub interval: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(REFRESH_DEFAULT_INTERVAL_SECS),
        }
    }
}

/// Normalized, order-independent identity of one visible application, used
/// for change detection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct AppFingerprint {
    pub name: String,
    pub description: Option<String>,
    pub executable_path: String,
    pub version: Option<String>,
}

impl From<&Application> for AppFingerprint {
    fn from(application: &Application) -> Self {
        Self {
            name: application.name.clone(),
            description: application.description.clone(),
            executable_path: application.executable_path.clone(),
            version: application.version.clone(),
        }
    }
}

/// Normalize a result set into a comparable snapshot.
pub fn snapshot(applications: &[Application]) -> BTreeSet<AppFingerprint> {
    applications.iter().map(AppFingerprint::from).collect()
}

/// Builder for the background refresh worker. Register observers with
/// [`RefreshPoller::subscribe`] before calling [`RefreshPoller::start`].
pub struct RefreshPoller {
    repository: Arc<dyn LauncherRepositoryTrait>,
    source: Arc<dyn SyncSource>,
    principal_sid: String,
    config: RefreshConfig,
    observers: Vec<Arc<dyn LauncherObserver>>,
    stop: Arc<AtomicBool>,
}

/// Handle returned by [`RefreshPoller::start`]. Dropping it stops and joins
/// the worker.
pub struct RefreshHandle {
    join: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl RefreshPoller {
    pub fn new(
        repository: Arc<dyn LauncherRepositoryTrait>,
        source: Arc<dyn SyncSource>,
        principal_sid: impl Into<String>,
        config: RefreshConfig,
    ) -> Self {
        Self {
            repository,
            source,
            principal_sid: principal_sid.into(),
            config,
            observers: Vec::new(),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn subscribe(&mut self, observer: Arc<dyn LauncherObserver>) {
        self.observers.push(observer);
    }

    /// Spawn the background polling thread.
    #[must_use]
    pub fn start(self) -> RefreshHandle {
        let stop = Arc::clone(&self.stop);
        let join = thread::Builder::new()
            .name("launchpad-refresh".into())
            .spawn(move || self.run())
            .expect("spawn launchpad-refresh thread");
        RefreshHandle {
            join: Some(join),
            stop,
        }
    }

    fn run(self) {
        let mut last_known: Option<BTreeSet<AppFingerprint>> = None;
        while !self.stop.load(Ordering::Relaxed) {
            match self.iterate(&mut last_known) {
                Ok(()) => self.sleep_sliced(self.config.interval),
                Err(err) => {
                    warn!(
                        "[Refresh] iteration failed for principal {}: {err}",
                        self.principal_sid
                    );
                    self.sleep_sliced(Duration::from_secs(REFRESH_ERROR_RETRY_SECS));
                }
            }
        }
        debug!("[Refresh] poller for principal {} stopped", self.principal_sid);
    }

    pub(crate) fn iterate(
        &self,
        last_known: &mut Option<BTreeSet<AppFingerprint>>,
    ) -> Result<()> {
        let status = self.source.check_synced()?;
        for observer in &self.observers {
            observer.sync_status_changed(&status);
        }
        if !status.is_synced {
            self.source.force_sync()?;
        }

        let applications = self
            .repository
            .applications_for_principal(&self.principal_sid)?;
        let current = snapshot(&applications);

        // First iteration always reports, so the UI gets its initial set.
        let changed = match last_known.as_ref() {
            None => true,
            Some(previous) => *previous != current,
        };
        if changed {
            debug!(
                "[Refresh] {} applications visible to principal {}",
                applications.len(),
                self.principal_sid
            );
            for observer in &self.observers {
                observer.applications_changed(&applications);
            }
        }
        *last_known = Some(current);
        Ok(())
    }

    /// Sleep in small increments so a stop request is noticed quickly.
    fn sleep_sliced(&self, total: Duration) {
        let slice = Duration::from_millis(REFRESH_STOP_SLICE_MS);
        let mut remaining = total;
        while remaining > Duration::ZERO && !self.stop.load(Ordering::Relaxed) {
            let nap = remaining.min(slice);
            thread::sleep(nap);
            remaining = remaining.saturating_sub(nap);
        }
    }
}

impl RefreshHandle {
    /// Signal the poller to stop and wait for the thread to exit.
    /// Idempotent; callable from any thread holding the handle.
    pub fn stop(&mut self) {
        self.signal_stop();
        self.join();
    }

    /// Signal stop without waiting.
    pub fn signal_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Wait for the thread to exit (call after `signal_stop`).
    pub fn join(&mut self) {
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
