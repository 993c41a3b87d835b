//! Typed query/command operations over the launcher cache entities.
//!
//! Every operation acquires a connection, executes and releases; none holds
//! a connection past its own return. Store failures never escape the
//! `bool`/`Option` operations: they are logged with operation context and
//! converted at this boundary.

use std::path::Path;

use log::{debug, error, warn};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use serde_json::Value as JsonValue;

use launchpad_core::errors::Result;
use launchpad_core::launcher::{
    Application, CostCenter, FieldWithValue, LauncherRepositoryTrait, NewApplication,
};

use crate::db::ConnectionManager;
use crate::errors::StorageError;
use crate::schema;

/// Tables accepted by `bulk_insert`.
const BULK_INSERT_TABLES: [&str; 11] = [
    "applications",
    "user_application_access",
    "lobs",
    "statuses",
    "cost_centers",
    "users",
    "sto_members",
    "fields",
    "application_field_values",
    "knowledge_bases",
    "folders",
];

pub struct LauncherRepository {
    manager: ConnectionManager,
}

impl LauncherRepository {
    /// Open the repository against a cache database, bootstrapping the
    /// schema when missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_manager(ConnectionManager::new(path))
    }

    pub fn with_manager(manager: ConnectionManager) -> Result<Self> {
        let conn = manager.acquire().map_err(StorageError::from)?;
        schema::initialize(&conn)?;
        Ok(Self { manager })
    }

    pub fn connection_manager(&self) -> &ConnectionManager {
        &self.manager
    }

    fn acquire(&self) -> Result<Connection> {
        Ok(self.manager.acquire().map_err(StorageError::from)?)
    }

    fn grant_access_impl(
        &self,
        principal_sid: &str,
        application_id: i64,
        granted_by: &str,
    ) -> Result<()> {
        let mut conn = self.acquire()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StorageError::from)?;
        // Reactivate the existing pair row if there is one; the UNIQUE
        // constraint backstops the insert arm against a concurrent grant.
        let reactivated = tx
            .execute(
                "UPDATE user_application_access
                 SET is_active = 1, granted_by = ?3, granted_at = CURRENT_TIMESTAMP
                 WHERE user_sid = ?1 AND application_id = ?2",
                params![principal_sid, application_id, granted_by],
            )
            .map_err(StorageError::from)?;
        if reactivated == 0 {
            tx.execute(
                "INSERT INTO user_application_access
                     (user_sid, application_id, granted_by, is_active)
                 VALUES (?1, ?2, ?3, 1)",
                params![principal_sid, application_id, granted_by],
            )
            .map_err(StorageError::from)?;
        }
        tx.commit().map_err(StorageError::from)?;
        Ok(())
    }

    fn insert_application_impl(&self, application: &NewApplication) -> Result<i64> {
        let conn = self.acquire()?;
        conn.execute(
            "INSERT INTO applications
                 (name, description, executable_path, lob_id, status_id,
                  cost_center_id, version, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)",
            params![
                application.name,
                application.description,
                application.executable_path,
                application.lob_id,
                application.status_id,
                application.cost_center_id,
                application.version,
            ],
        )
        .map_err(StorageError::from)?;
        Ok(conn.last_insert_rowid())
    }

    fn bulk_insert_impl(
        &self,
        table: &str,
        columns: &[&str],
        records: &[JsonValue],
    ) -> Result<usize> {
        if !BULK_INSERT_TABLES.contains(&table) {
            return Err(StorageError::UnsupportedTable(table.to_string()).into());
        }
        for column in columns {
            if !is_identifier(column) {
                return Err(StorageError::InvalidColumn((*column).to_string()).into());
            }
        }

        let placeholders = (1..=columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({placeholders})",
            columns.join(", ")
        );

        let mut conn = self.acquire()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StorageError::from)?;
        {
            let mut stmt = tx.prepare(&sql).map_err(StorageError::from)?;
            for record in records {
                let values = columns
                    .iter()
                    .map(|column| json_to_sql(record.get(*column)))
                    .collect::<Vec<_>>();
                stmt.execute(rusqlite::params_from_iter(values))
                    .map_err(StorageError::from)?;
            }
        }
        tx.commit().map_err(StorageError::from)?;
        Ok(records.len())
    }
}

impl LauncherRepositoryTrait for LauncherRepository {
    fn applications_for_principal(&self, principal_sid: &str) -> Result<Vec<Application>> {
        let conn = self.acquire()?;
        let mut stmt = conn
            .prepare(
                "SELECT a.id, a.name, a.description, a.executable_path,
                        a.lob_id, a.status_id, a.cost_center_id, a.is_active,
                        a.version, a.created_at, a.updated_at, a.updated_by,
                        l.name AS lob_name, s.name AS status_name,
                        cc.name AS cost_center_name
                 FROM applications a
                 JOIN user_application_access uaa ON a.id = uaa.application_id
                 LEFT JOIN lobs l ON a.lob_id = l.id
                 LEFT JOIN statuses s ON a.status_id = s.id
                 LEFT JOIN cost_centers cc ON a.cost_center_id = cc.id
                 WHERE uaa.user_sid = ?1 AND uaa.is_active = 1 AND a.is_active = 1
                 ORDER BY a.name",
            )
            .map_err(StorageError::from)?;
        let rows = stmt
            .query_map(params![principal_sid], map_application)
            .map_err(StorageError::from)?;
        let applications = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StorageError::from)?;
        Ok(applications)
    }

    fn application_version(&self, name: &str) -> Result<Option<String>> {
        let conn = self.acquire()?;
        let version = conn
            .query_row(
                "SELECT version FROM applications WHERE name = ?1 AND is_active = 1",
                params![name],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()
            .map_err(StorageError::from)?;
        Ok(version.flatten())
    }

    fn is_operator(&self, principal_sid: &str, cost_center_id: i64) -> Result<bool> {
        let conn = self.acquire()?;
        let exists = conn
            .query_row(
                "SELECT EXISTS (
                     SELECT 1 FROM sto_members
                     WHERE sid = ?1 AND cost_center_id = ?2 AND is_active = 1
                 )",
                params![principal_sid, cost_center_id],
                |row| row.get(0),
            )
            .map_err(StorageError::from)?;
        Ok(exists)
    }

    fn cost_center_of(&self, principal_sid: &str) -> Result<Option<CostCenter>> {
        let conn = self.acquire()?;
        let cost_center = conn
            .query_row(
                "SELECT cc.id, cc.name
                 FROM cost_centers cc
                 JOIN users u ON cc.id = u.cost_center_id
                 WHERE u.sid = ?1 AND u.is_active = 1",
                params![principal_sid],
                |row| {
                    Ok(CostCenter {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()
            .map_err(StorageError::from)?;
        Ok(cost_center)
    }

    fn fields_of(&self, application_id: i64) -> Result<Vec<FieldWithValue>> {
        let conn = self.acquire()?;
        let mut stmt = conn
            .prepare(
                "SELECT f.name, f.field_type, f.is_required, afv.field_value
                 FROM fields f
                 LEFT JOIN application_field_values afv
                     ON f.id = afv.field_id AND afv.application_id = ?1
                 WHERE f.is_active = 1
                 ORDER BY f.name",
            )
            .map_err(StorageError::from)?;
        let rows = stmt
            .query_map(params![application_id], |row| {
                Ok(FieldWithValue {
                    name: row.get(0)?,
                    field_type: row.get(1)?,
                    is_required: row.get(2)?,
                    value: row.get(3)?,
                })
            })
            .map_err(StorageError::from)?;
        let fields = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StorageError::from)?;
        Ok(fields)
    }

    fn grant_access(&self, principal_sid: &str, application_id: i64, granted_by: &str) -> bool {
        match self.grant_access_impl(principal_sid, application_id, granted_by) {
            Ok(()) => true,
            Err(err) => {
                error!(
                    "[Storage] grant_access failed for {principal_sid} / application {application_id}: {err}"
                );
                false
            }
        }
    }

    fn revoke_access(&self, principal_sid: &str, application_id: i64) -> bool {
        let revoked = self.acquire().and_then(|conn| {
            conn.execute(
                "UPDATE user_application_access
                 SET is_active = 0
                 WHERE user_sid = ?1 AND application_id = ?2",
                params![principal_sid, application_id],
            )
            .map_err(StorageError::from)
            .map_err(Into::into)
        });
        match revoked {
            Ok(affected) => affected > 0,
            Err(err) => {
                error!(
                    "[Storage] revoke_access failed for {principal_sid} / application {application_id}: {err}"
                );
                false
            }
        }
    }

    fn insert_application(&self, application: &NewApplication) -> Option<i64> {
        if let Err(err) = application.validate() {
            warn!("[Storage] insert_application rejected: {err}");
            return None;
        }
        match self.insert_application_impl(application) {
            Ok(id) => Some(id),
            Err(err) => {
                error!(
                    "[Storage] insert_application failed for '{}': {err}",
                    application.name
                );
                None
            }
        }
    }

    fn set_application_status(
        &self,
        application_id: i64,
        status_id: i64,
        updated_by: &str,
    ) -> bool {
        let updated = self.acquire().and_then(|conn| {
            conn.execute(
                "UPDATE applications
                 SET status_id = ?2, updated_at = CURRENT_TIMESTAMP, updated_by = ?3
                 WHERE id = ?1",
                params![application_id, status_id, updated_by],
            )
            .map_err(StorageError::from)
            .map_err(Into::into)
        });
        match updated {
            Ok(affected) => affected > 0,
            Err(err) => {
                error!(
                    "[Storage] set_application_status failed for application {application_id}: {err}"
                );
                false
            }
        }
    }

    fn set_application_version(
        &self,
        application_id: i64,
        version: &str,
        updated_by: &str,
    ) -> bool {
        let updated = self.acquire().and_then(|conn| {
            conn.execute(
                "UPDATE applications
                 SET version = ?2, updated_at = CURRENT_TIMESTAMP, updated_by = ?3
                 WHERE id = ?1",
                params![application_id, version, updated_by],
            )
            .map_err(StorageError::from)
            .map_err(Into::into)
        });
        match updated {
            Ok(affected) => affected > 0,
            Err(err) => {
                error!(
                    "[Storage] set_application_version failed for application {application_id}: {err}"
                );
                false
            }
        }
    }

    fn bulk_insert(&self, table: &str, columns: &[&str], records: &[JsonValue]) -> bool {
        match self.bulk_insert_impl(table, columns, records) {
            Ok(inserted) => {
                debug!("[Storage] bulk_insert wrote {inserted} rows into {table}");
                true
            }
            Err(err) => {
                error!("[Storage] bulk_insert into {table} failed, batch rolled back: {err}");
                false
            }
        }
    }
}

fn map_application(row: &Row<'_>) -> rusqlite::Result<Application> {
    Ok(Application {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        executable_path: row.get(3)?,
        lob_id: row.get(4)?,
        status_id: row.get(5)?,
        cost_center_id: row.get(6)?,
        is_active: row.get(7)?,
        version: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
        updated_by: row.get(11)?,
        lob_name: row.get(12)?,
        status_name: row.get(13)?,
        cost_center_name: row.get(14)?,
    })
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Bind a JSON field as a SQLite parameter; a column absent from the record
/// binds NULL so the store's own constraints decide whether that is valid.
fn json_to_sql(value: Option<&JsonValue>) -> rusqlite::types::Value {
    use rusqlite::types::Value;
    match value {
        None | Some(JsonValue::Null) => Value::Null,
        Some(JsonValue::Bool(flag)) => Value::Integer(i64::from(*flag)),
        Some(JsonValue::Number(number)) => number
            .as_i64()
            .map(Value::Integer)
            .or_else(|| number.as_f64().map(Value::Real))
            .unwrap_or(Value::Null),
        Some(JsonValue::String(text)) => Value::Text(text.clone()),
        Some(other) => Value::Text(other.to_string()),
    }
}
