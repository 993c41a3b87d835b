//! SQLite folder repository (knowledge-base ingest grouping).

mod repository;

pub use repository::FolderRepository;
