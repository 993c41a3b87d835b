//! Repository contract implemented by storage backends.

use crate::errors::Result;

use super::{Application, CostCenter, FieldWithValue, NewApplication};

/// Narrow, parameterized operations over the launcher cache entities.
///
/// Read operations return `Result` so background workers can catch, log and
/// retry. Command operations return a `bool`/`Option` sentinel instead: the
/// implementation logs the underlying store failure and the caller only
/// branches on whether the operation completed. A `false`/`None` result never
/// implies which layer failed.
pub trait LauncherRepositoryTrait: Send + Sync {
    /// Applications visible to a principal: active grants joined to active
    /// applications. An unknown principal yields an empty list, not an error.
    fn applications_for_principal(&self, principal_sid: &str) -> Result<Vec<Application>>;

    /// Current catalog version of an application, by name.
    fn application_version(&self, name: &str) -> Result<Option<String>>;

    /// Whether the principal is an operator for the cost center.
    fn is_operator(&self, principal_sid: &str, cost_center_id: i64) -> Result<bool>;

    /// The principal's cost center; absence is a normal outcome.
    fn cost_center_of(&self, principal_sid: &str) -> Result<Option<CostCenter>>;

    /// Dynamic fields for an application; fields with no recorded value
    /// still appear, with `value: None`.
    fn fields_of(&self, application_id: i64) -> Result<Vec<FieldWithValue>>;

    /// Upsert a grant: reactivate an existing pair row (recording the new
    /// granter) or insert a fresh active one. Never duplicates the pair.
    fn grant_access(&self, principal_sid: &str, application_id: i64, granted_by: &str) -> bool;

    /// Soft-revoke a grant; the row stays behind for the audit trail.
    fn revoke_access(&self, principal_sid: &str, application_id: i64) -> bool;

    /// Insert a validated application record, returning its new id.
    fn insert_application(&self, application: &NewApplication) -> Option<i64>;

    /// Update an application's status along with the audit timestamp/actor.
    fn set_application_status(&self, application_id: i64, status_id: i64, updated_by: &str)
        -> bool;

    /// Bump an application's version marker along with the audit fields.
    fn set_application_version(&self, application_id: i64, version: &str, updated_by: &str)
        -> bool;

    /// Insert `records` (JSON objects keyed by column name) into `table`
    /// inside a single transaction; any failure rolls back the whole batch.
    fn bulk_insert(&self, table: &str, columns: &[&str], records: &[serde_json::Value]) -> bool;
}
