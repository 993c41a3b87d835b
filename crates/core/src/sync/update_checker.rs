//! One-shot installed-version check for a single application tile.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::warn;

use crate::errors::Result;
use crate::launcher::LauncherRepositoryTrait;

use super::LauncherObserver;

/// Sidecar file in the install directory holding the installed version
/// string verbatim.
pub const VERSION_MARKER_FILE: &str = "version.txt";

/// Compares the locally persisted version marker against the catalog's
/// current version and raises `update_available` when they diverge. Spawned
/// ad hoc, one per installed tile; runs once and terminates.
pub struct UpdateChecker {
    repository: Arc<dyn LauncherRepositoryTrait>,
    application_name: String,
    install_dir: PathBuf,
}

impl UpdateChecker {
    pub fn new(
        repository: Arc<dyn LauncherRepositoryTrait>,
        application_name: impl Into<String>,
        install_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            repository,
            application_name: application_name.into(),
            install_dir: install_dir.into(),
        }
    }

    /// Run the check on a background thread. Failures are logged and emit
    /// nothing; the tile simply shows no banner until the next check.
    pub fn spawn(self, observer: Arc<dyn LauncherObserver>) -> JoinHandle<()> {
        thread::Builder::new()
            .name("launchpad-update-check".into())
            .spawn(move || match self.check() {
                Ok(Some(new_version)) => {
                    observer.update_available(&self.application_name, &new_version);
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(
                        "[UpdateCheck] check failed for {}: {err}",
                        self.application_name
                    );
                }
            })
            .expect("spawn launchpad-update-check thread")
    }

    /// The catalog version to surface, or `None` when up to date or not
    /// installed.
    pub(crate) fn check(&self) -> Result<Option<String>> {
        let Some(remote) = self.repository.application_version(&self.application_name)? else {
            return Ok(None);
        };
        match self.local_version() {
            Some(local) if local != remote => Ok(Some(remote)),
            Some(_) => Ok(None),
            // No marker but the binary is present: ambiguous, resolved
            // conservatively toward "needs update".
            None if self.installed_binary_present() => Ok(Some(remote)),
            None => Ok(None),
        }
    }

    fn local_version(&self) -> Option<String> {
        let marker = self.install_dir.join(VERSION_MARKER_FILE);
        let raw = fs::read_to_string(marker).ok()?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    fn installed_binary_present(&self) -> bool {
        self.install_dir
            .join(format!("{}.exe", self.application_name))
            .exists()
    }
}
