//! File mirror of the shared source database.
//!
//! The source of truth is a database file on a shared location the client
//! may lose sight of at any time. The mirror keeps a local copy next to a
//! one-line marker file recording the source mtime at the moment of the last
//! successful copy; staleness is "source mtime is newer than the marker".

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{Local, TimeZone};
use log::info;

use launchpad_core::errors::Result;
use launchpad_core::sync::{SyncSource, SyncStatus};

const CLOCK_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct SourceMirror {
    source_path: PathBuf,
    local_path: PathBuf,
    marker_path: PathBuf,
}

impl SourceMirror {
    pub fn new(source_path: impl Into<PathBuf>, local_path: impl Into<PathBuf>) -> Self {
        let local_path = local_path.into();
        let marker_path = sibling_with_suffix(&local_path, "meta");
        Self {
            source_path: source_path.into(),
            local_path,
            marker_path,
        }
    }

    /// Where the mirrored copy lives; this is the path to hand to the
    /// repository.
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    fn source_mtime(&self) -> i64 {
        fs::metadata(&self.source_path)
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(unix_seconds)
            .unwrap_or(0)
    }

    fn last_sync(&self) -> i64 {
        fs::read_to_string(&self.marker_path)
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(0)
    }

    fn record_sync(&self, timestamp: i64) -> Result<()> {
        fs::write(&self.marker_path, timestamp.to_string())?;
        Ok(())
    }
}

impl SyncSource for SourceMirror {
    fn check_synced(&self) -> Result<SyncStatus> {
        let source = self.source_mtime();
        let local = self.last_sync();
        Ok(SyncStatus {
            // An unreadable source reports mtime 0 and therefore "synced";
            // the poller keeps serving the cached copy instead of churning.
            is_synced: source <= local,
            local_clock: format_clock(local, "Never"),
            source_clock: format_clock(source, "Unknown"),
        })
    }

    fn force_sync(&self) -> Result<()> {
        let mtime = fs::metadata(&self.source_path)?
            .modified()
            .map(|stamp| unix_seconds(stamp).unwrap_or(0))?;
        if let Some(parent) = self.local_path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Copy to a sibling temp file and rename so readers never observe a
        // half-written cache.
        let staging = sibling_with_suffix(&self.local_path, "tmp");
        fs::copy(&self.source_path, &staging)?;
        fs::rename(&staging, &self.local_path)?;
        self.record_sync(mtime)?;
        info!(
            "[Mirror] refreshed {} from {}",
            self.local_path.display(),
            self.source_path.display()
        );
        Ok(())
    }
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{suffix}"));
    path.with_file_name(name)
}

fn unix_seconds(stamp: SystemTime) -> Option<i64> {
    stamp
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|elapsed| elapsed.as_secs() as i64)
}

fn format_clock(timestamp: i64, fallback: &str) -> String {
    if timestamp <= 0 {
        return fallback.to_string();
    }
    match Local.timestamp_opt(timestamp, 0) {
        chrono::LocalResult::Single(moment) => moment.format(CLOCK_FORMAT).to_string(),
        _ => fallback.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_mirror_reports_out_of_sync() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("source.db");
        fs::write(&source, b"catalog").expect("source");

        let mirror = SourceMirror::new(&source, dir.path().join("cache").join("local.db"));
        let status = mirror.check_synced().expect("check");
        assert!(!status.is_synced);
        assert_eq!(status.local_clock, "Never");
        assert_ne!(status.source_clock, "Unknown");
    }

    #[test]
    fn force_sync_copies_source_and_records_marker() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("source.db");
        fs::write(&source, b"catalog-v2").expect("source");

        let mirror = SourceMirror::new(&source, dir.path().join("cache").join("local.db"));
        mirror.force_sync().expect("sync");

        assert_eq!(
            fs::read(mirror.local_path()).expect("local copy"),
            b"catalog-v2"
        );
        assert!(mirror.check_synced().expect("check").is_synced);
    }

    #[test]
    fn stale_marker_reports_out_of_sync_again() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("source.db");
        fs::write(&source, b"catalog").expect("source");

        let mirror = SourceMirror::new(&source, dir.path().join("local.db"));
        mirror.force_sync().expect("sync");
        // Wind the marker back behind the source mtime.
        mirror.record_sync(mirror.source_mtime() - 60).expect("marker");

        assert!(!mirror.check_synced().expect("check").is_synced);
    }

    #[test]
    fn unreachable_source_counts_as_synced() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mirror = SourceMirror::new(dir.path().join("missing.db"), dir.path().join("local.db"));

        let status = mirror.check_synced().expect("check");
        assert!(status.is_synced);
        assert_eq!(status.source_clock, "Unknown");
        assert!(mirror.force_sync().is_err());
    }
}
