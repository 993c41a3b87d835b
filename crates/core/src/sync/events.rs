//! Observer contract for events raised by background workers.

use serde::{Deserialize, Serialize};

use crate::launcher::Application;

/// Sync state observed by one poller iteration, with both clocks rendered
/// for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub is_synced: bool,
    pub local_clock: String,
    pub source_clock: String,
}

/// Event sink registered on a worker before it starts.
///
/// Handlers run on the worker's own thread; UI-side implementations are
/// responsible for marshalling to their rendering thread. All methods
/// default to no-ops so observers implement only what they consume.
pub trait LauncherObserver: Send + Sync {
    /// The visible application set is available (first read) or has changed.
    fn applications_changed(&self, _applications: &[Application]) {}

    /// Raised every poller iteration, independent of data changes.
    fn sync_status_changed(&self, _status: &SyncStatus) {}

    /// A newer version of an installed application is available.
    fn update_available(&self, _application_name: &str, _new_version: &str) {}
}
