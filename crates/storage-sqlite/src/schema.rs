//! Schema bootstrap for the launcher cache database. Safe to run on every
//! startup; everything is `IF NOT EXISTS`.

use rusqlite::Connection;

use crate::errors::StorageError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS lobs (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS statuses (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS cost_centers (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS applications (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    executable_path TEXT NOT NULL,
    lob_id INTEGER NOT NULL,
    status_id INTEGER NOT NULL,
    cost_center_id INTEGER NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    version TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_by TEXT,
    FOREIGN KEY (lob_id) REFERENCES lobs (id),
    FOREIGN KEY (status_id) REFERENCES statuses (id),
    FOREIGN KEY (cost_center_id) REFERENCES cost_centers (id)
);

-- The UNIQUE pair constraint is load-bearing: it closes the race between two
-- simultaneous grants for the same (principal, application) pair.
CREATE TABLE IF NOT EXISTS user_application_access (
    id INTEGER PRIMARY KEY,
    user_sid TEXT NOT NULL,
    application_id INTEGER NOT NULL,
    granted_by TEXT,
    granted_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    is_active INTEGER NOT NULL DEFAULT 1,
    UNIQUE (user_sid, application_id),
    FOREIGN KEY (application_id) REFERENCES applications (id)
);

CREATE TABLE IF NOT EXISTS users (
    sid TEXT PRIMARY KEY,
    cost_center_id INTEGER,
    is_active INTEGER NOT NULL DEFAULT 1,
    FOREIGN KEY (cost_center_id) REFERENCES cost_centers (id)
);

CREATE TABLE IF NOT EXISTS sto_members (
    sid TEXT NOT NULL,
    cost_center_id INTEGER NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    FOREIGN KEY (cost_center_id) REFERENCES cost_centers (id)
);

CREATE TABLE IF NOT EXISTS fields (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    field_type TEXT NOT NULL,
    is_required INTEGER NOT NULL DEFAULT 0,
    is_active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS application_field_values (
    application_id INTEGER NOT NULL,
    field_id INTEGER NOT NULL,
    field_value TEXT,
    FOREIGN KEY (application_id) REFERENCES applications (id),
    FOREIGN KEY (field_id) REFERENCES fields (id)
);

CREATE TABLE IF NOT EXISTS knowledge_bases (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    directory TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS folders (
    id TEXT PRIMARY KEY,
    kb_id TEXT NOT NULL,
    folder_path TEXT NOT NULL,
    folder_name TEXT NOT NULL,
    file_count INTEGER NOT NULL DEFAULT 0,
    processed_files INTEGER NOT NULL DEFAULT 0,
    conversion_status TEXT NOT NULL DEFAULT 'pending',
    conversion_progress INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (kb_id) REFERENCES knowledge_bases (id)
);

CREATE INDEX IF NOT EXISTS idx_user_access_sid
    ON user_application_access (user_sid);
CREATE INDEX IF NOT EXISTS idx_sto_members_sid
    ON sto_members (sid);
CREATE INDEX IF NOT EXISTS idx_folders_kb_id
    ON folders (kb_id);
"#;

pub(crate) fn initialize(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
