//! SQLite launcher repository.

mod repository;

pub use repository::LauncherRepository;
