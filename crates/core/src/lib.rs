//! Store-agnostic core for the Launchpad application catalog.
//!
//! Domain models and the repository contract live in [`launcher`]; the
//! background refresh poller, update checker and observer contract live in
//! [`sync`]. Storage backends implement [`launcher::LauncherRepositoryTrait`]
//! and [`sync::SyncSource`].

pub mod errors;
pub mod launcher;
pub mod sync;

pub use errors::{Error, Result};
