//! Connection management: durability profile and transient-error retry.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use log::debug;
use rusqlite::{Connection, ErrorCode};

use crate::errors::StorageError;

/// Maximum connection attempts before giving up.
const CONNECT_ATTEMPTS: u32 = 3;

/// Fixed delay between connection attempts.
const CONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// Durability/concurrency profile, applied on every successful open.
/// Reapplying is idempotent. WAL with a small autocheckpoint is the one
/// consistent policy; writes use plain IMMEDIATE transactions and no manual
/// checkpoints.
const PRAGMA_PROFILE: &str = "\
    PRAGMA journal_mode=WAL;\n\
    PRAGMA busy_timeout=5000;\n\
    PRAGMA foreign_keys=ON;\n\
    PRAGMA synchronous=NORMAL;\n\
    PRAGMA cache_size=-64000;\n\
    PRAGMA wal_autocheckpoint=100;\n";

/// Opens connections to one store location. Cheap to clone; holds no open
/// handle of its own, so every acquisition starts from a fresh handle.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    path: PathBuf,
}

impl ConnectionManager {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a connection with the durability profile applied, retrying
    /// transient failures with a fixed backoff. No partial state survives a
    /// failed attempt.
    pub fn acquire(&self) -> Result<Connection, StorageError> {
        let path = self.path.clone();
        self.acquire_with(|| Connection::open(&path))
    }

    fn acquire_with<F>(&self, mut connect: F) -> Result<Connection, StorageError>
    where
        F: FnMut() -> rusqlite::Result<Connection>,
    {
        let mut attempt = 0;
        loop {
            match connect() {
                Ok(conn) => {
                    conn.execute_batch(PRAGMA_PROFILE)?;
                    return Ok(conn);
                }
                Err(err) if is_transient(&err) => {
                    attempt += 1;
                    if attempt >= CONNECT_ATTEMPTS {
                        return Err(StorageError::ConnectionUnavailable {
                            attempts: attempt,
                            source: err,
                        });
                    }
                    debug!(
                        "[Storage] connect attempt {attempt} to {} failed: {err}",
                        self.path.display()
                    );
                    thread::sleep(CONNECT_BACKOFF);
                }
                Err(err) => return Err(StorageError::Sqlite(err)),
            }
        }
    }
}

/// The error class worth retrying: the store exists but is momentarily
/// unreachable or contended.
fn is_transient(error: &rusqlite::Error) -> bool {
    match error {
        rusqlite::Error::SqliteFailure(code, _) => matches!(
            code.code,
            ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::CannotOpen
                | ErrorCode::SystemIoFailure
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    use super::*;

    fn busy_error() -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            Some("database is locked".to_string()),
        )
    }

    #[test]
    fn retries_transient_failures_then_succeeds() {
        let manager = ConnectionManager::new(":memory:");
        let attempts = AtomicU32::new(0);

        let started = Instant::now();
        let conn = manager
            .acquire_with(|| {
                if attempts.fetch_add(1, Ordering::Relaxed) < 2 {
                    Err(busy_error())
                } else {
                    Connection::open_in_memory()
                }
            })
            .expect("third attempt succeeds");

        assert_eq!(attempts.load(Ordering::Relaxed), 3);
        // Two fixed one-second backoffs between the three attempts.
        assert!(started.elapsed() >= Duration::from_secs(2));
        conn.execute_batch("CREATE TABLE t (id INTEGER)")
            .expect("usable connection");
    }

    #[test]
    fn exhaustion_reports_connection_unavailable_with_last_error() {
        let manager = ConnectionManager::new(":memory:");
        let result = manager.acquire_with(|| Err(busy_error()));
        match result {
            Err(StorageError::ConnectionUnavailable { attempts, source }) => {
                assert_eq!(attempts, 3);
                assert!(source.to_string().contains("locked"));
            }
            other => panic!("expected ConnectionUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn non_transient_failures_are_not_retried() {
        let manager = ConnectionManager::new(":memory:");
        let attempts = AtomicU32::new(0);
        let result = manager.acquire_with(|| {
            attempts.fetch_add(1, Ordering::Relaxed);
            Err(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_NOTADB),
                Some("file is not a database".to_string()),
            ))
        });
        assert_eq!(attempts.load(Ordering::Relaxed), 1);
        assert!(matches!(result, Err(StorageError::Sqlite(_))));
    }

    #[test]
    fn profile_is_applied_on_open() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = ConnectionManager::new(dir.path().join("cache.db"));
        let conn = manager.acquire().expect("open");
        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .expect("journal_mode");
        assert_eq!(journal_mode.to_lowercase(), "wal");
        let foreign_keys: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .expect("foreign_keys");
        assert_eq!(foreign_keys, 1);
    }
}
