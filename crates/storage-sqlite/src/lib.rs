//! SQLite implementation of the launchpad storage layer: connection
//! management with a fixed durability profile, schema bootstrap, the
//! launcher and folder repositories, and the shared-source file mirror.

pub mod db;
pub mod errors;
pub mod folders;
pub mod launcher;
pub mod mirror;
mod schema;

// Re-export for convenience
pub use db::ConnectionManager;
pub use errors::StorageError;
pub use folders::FolderRepository;
pub use launcher::LauncherRepository;
pub use mirror::SourceMirror;
