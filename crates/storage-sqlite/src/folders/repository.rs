//! Typed CRUD over folders and their conversion status machine.

use std::path::Path;

use log::error;
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use launchpad_core::errors::Result;
use launchpad_core::launcher::{Folder, FolderStatus, NewFolder};

use crate::db::ConnectionManager;
use crate::errors::StorageError;
use crate::schema;

fn enum_to_db<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?.trim_matches('"').to_string())
}

fn enum_from_db<T: serde::de::DeserializeOwned>(value: &str) -> Result<T> {
    Ok(serde_json::from_str(&format!("\"{value}\""))?)
}

pub struct FolderRepository {
    manager: ConnectionManager,
}

impl FolderRepository {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_manager(ConnectionManager::new(path))
    }

    pub fn with_manager(manager: ConnectionManager) -> Result<Self> {
        let conn = manager.acquire().map_err(StorageError::from)?;
        schema::initialize(&conn)?;
        Ok(Self { manager })
    }

    pub fn insert_knowledge_base(&self, name: &str, directory: &str) -> Option<String> {
        let id = Uuid::new_v4().to_string();
        let inserted = self
            .manager
            .acquire()
            .map_err(StorageError::from)
            .and_then(|conn| {
                conn.execute(
                    "INSERT INTO knowledge_bases (id, name, directory)
                     VALUES (?1, ?2, ?3)",
                    params![id, name, directory],
                )
                .map_err(StorageError::from)
            });
        match inserted {
            Ok(_) => Some(id),
            Err(err) => {
                error!("[Storage] insert_knowledge_base failed for '{name}': {err}");
                None
            }
        }
    }

    pub fn insert_folder(&self, folder: &NewFolder) -> Option<String> {
        let id = Uuid::new_v4().to_string();
        let pending = match enum_to_db(&FolderStatus::Pending) {
            Ok(value) => value,
            Err(err) => {
                error!("[Storage] insert_folder failed to encode status: {err}");
                return None;
            }
        };
        let inserted = self
            .manager
            .acquire()
            .map_err(StorageError::from)
            .and_then(|conn| {
                conn.execute(
                    "INSERT INTO folders
                         (id, kb_id, folder_path, folder_name, file_count,
                          processed_files, conversion_status, conversion_progress)
                     VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, 0)",
                    params![
                        id,
                        folder.kb_id,
                        folder.folder_path,
                        folder.folder_name,
                        folder.file_count,
                        pending,
                    ],
                )
                .map_err(StorageError::from)
            });
        match inserted {
            Ok(_) => Some(id),
            Err(err) => {
                error!(
                    "[Storage] insert_folder failed for '{}': {err}",
                    folder.folder_name
                );
                None
            }
        }
    }

    pub fn folders_of_kb(&self, kb_id: &str) -> Result<Vec<Folder>> {
        let conn = self.manager.acquire().map_err(StorageError::from)?;
        let mut stmt = conn
            .prepare(
                "SELECT id, kb_id, folder_path, folder_name, file_count,
                        processed_files, conversion_status, conversion_progress,
                        created_at, updated_at
                 FROM folders
                 WHERE kb_id = ?1
                 ORDER BY folder_name",
            )
            .map_err(StorageError::from)?;
        let rows = stmt
            .query_map(params![kb_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, i64>(7)?,
                    row.get::<_, String>(8)?,
                    row.get::<_, String>(9)?,
                ))
            })
            .map_err(StorageError::from)?;

        let mut folders = Vec::new();
        for row in rows {
            let (
                id,
                kb_id,
                folder_path,
                folder_name,
                file_count,
                processed_files,
                status,
                conversion_progress,
                created_at,
                updated_at,
            ) = row.map_err(StorageError::from)?;
            folders.push(Folder {
                id,
                kb_id,
                folder_path,
                folder_name,
                file_count,
                processed_files,
                conversion_status: enum_from_db(&status)?,
                conversion_progress,
                created_at,
                updated_at,
            });
        }
        Ok(folders)
    }

    pub fn folder(&self, id: &str) -> Result<Option<Folder>> {
        let folders = self.folders_matching_id(id)?;
        Ok(folders.into_iter().next())
    }

    pub fn set_conversion_status(&self, id: &str, status: FolderStatus, progress: i64) -> bool {
        let encoded = match enum_to_db(&status) {
            Ok(value) => value,
            Err(err) => {
                error!("[Storage] set_conversion_status failed to encode status: {err}");
                return false;
            }
        };
        let updated = self
            .manager
            .acquire()
            .map_err(StorageError::from)
            .and_then(|conn| {
                conn.execute(
                    "UPDATE folders
                     SET conversion_status = ?2, conversion_progress = ?3,
                         updated_at = CURRENT_TIMESTAMP
                     WHERE id = ?1",
                    params![id, encoded, progress],
                )
                .map_err(StorageError::from)
            });
        match updated {
            Ok(affected) => affected > 0,
            Err(err) => {
                error!("[Storage] set_conversion_status failed for folder {id}: {err}");
                false
            }
        }
    }

    /// Count one more processed file and derive the progress percentage from
    /// the folder's file count.
    pub fn record_processed_file(&self, id: &str) -> bool {
        let updated = self
            .manager
            .acquire()
            .map_err(StorageError::from)
            .and_then(|conn| {
                conn.execute(
                    "UPDATE folders
                     SET processed_files = processed_files + 1,
                         conversion_progress = CASE
                             WHEN file_count > 0
                                 THEN MIN(100, (processed_files + 1) * 100 / file_count)
                             ELSE 100
                         END,
                         updated_at = CURRENT_TIMESTAMP
                     WHERE id = ?1",
                    params![id],
                )
                .map_err(StorageError::from)
            });
        match updated {
            Ok(affected) => affected > 0,
            Err(err) => {
                error!("[Storage] record_processed_file failed for folder {id}: {err}");
                false
            }
        }
    }

    fn folders_matching_id(&self, id: &str) -> Result<Vec<Folder>> {
        let conn = self.manager.acquire().map_err(StorageError::from)?;
        let kb_id: Option<String> = conn
            .query_row(
                "SELECT kb_id FROM folders WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(StorageError::from)?;
        match kb_id {
            Some(kb_id) => Ok(self
                .folders_of_kb(&kb_id)?
                .into_iter()
                .filter(|folder| folder.id == id)
                .collect()),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repository_with_kb() -> (tempfile::TempDir, FolderRepository, String) {
        let dir = tempfile::tempdir().expect("tempdir");
        let repository =
            FolderRepository::open(dir.path().join("cache.db")).expect("open repository");
        let kb_id = repository
            .insert_knowledge_base("handbooks", r"\\share\kb\handbooks")
            .expect("insert kb");
        (dir, repository, kb_id)
    }

    fn new_folder(kb_id: &str, name: &str, file_count: i64) -> NewFolder {
        NewFolder {
            kb_id: kb_id.to_string(),
            folder_path: format!(r"\\share\kb\handbooks\{name}"),
            folder_name: name.to_string(),
            file_count,
        }
    }

    #[test]
    fn new_folders_start_pending_with_zero_progress() {
        let (_dir, repository, kb_id) = repository_with_kb();
        let id = repository
            .insert_folder(&new_folder(&kb_id, "policies", 4))
            .expect("insert folder");

        let folder = repository.folder(&id).expect("lookup").expect("present");
        assert_eq!(folder.conversion_status, FolderStatus::Pending);
        assert_eq!(folder.conversion_progress, 0);
        assert_eq!(folder.processed_files, 0);
    }

    #[test]
    fn status_machine_walks_to_completed() {
        let (_dir, repository, kb_id) = repository_with_kb();
        let id = repository
            .insert_folder(&new_folder(&kb_id, "policies", 2))
            .expect("insert folder");

        assert!(repository.set_conversion_status(&id, FolderStatus::Processing, 0));
        assert!(repository.record_processed_file(&id));
        assert!(repository.record_processed_file(&id));
        assert!(repository.set_conversion_status(&id, FolderStatus::Completed, 100));

        let folder = repository.folder(&id).expect("lookup").expect("present");
        assert_eq!(folder.conversion_status, FolderStatus::Completed);
        assert_eq!(folder.processed_files, 2);
        assert_eq!(folder.conversion_progress, 100);
    }

    #[test]
    fn progress_is_derived_from_file_count() {
        let (_dir, repository, kb_id) = repository_with_kb();
        let id = repository
            .insert_folder(&new_folder(&kb_id, "policies", 4))
            .expect("insert folder");

        assert!(repository.record_processed_file(&id));
        let folder = repository.folder(&id).expect("lookup").expect("present");
        assert_eq!(folder.processed_files, 1);
        assert_eq!(folder.conversion_progress, 25);
    }

    #[test]
    fn listing_is_scoped_to_the_knowledge_base() {
        let (_dir, repository, kb_id) = repository_with_kb();
        let other_kb = repository
            .insert_knowledge_base("runbooks", r"\\share\kb\runbooks")
            .expect("insert kb");
        repository
            .insert_folder(&new_folder(&kb_id, "policies", 1))
            .expect("insert folder");
        repository
            .insert_folder(&new_folder(&other_kb, "oncall", 1))
            .expect("insert folder");

        let names: Vec<String> = repository
            .folders_of_kb(&kb_id)
            .expect("list")
            .into_iter()
            .map(|folder| folder.folder_name)
            .collect();
        assert_eq!(names, vec!["policies".to_string()]);
    }

    #[test]
    fn unknown_folder_updates_report_failure() {
        let (_dir, repository, _kb_id) = repository_with_kb();
        assert!(!repository.set_conversion_status("missing", FolderStatus::Failed, 0));
        assert!(!repository.record_processed_file("missing"));
    }
}
