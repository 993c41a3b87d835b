//! Domain records for the launcher cache entities.
//!
//! Each record has a fixed shape; storage backends map rows into these via
//! one mapping function per entity rather than relying on result-set
//! introspection.

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// A launchable application as seen by one principal, including the
/// display names joined in from its reference tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub executable_path: String,
    pub lob_id: i64,
    pub status_id: i64,
    pub cost_center_id: i64,
    pub is_active: bool,
    pub version: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub updated_by: Option<String>,
    pub lob_name: Option<String>,
    pub status_name: Option<String>,
    pub cost_center_name: Option<String>,
}

/// Input record for registering a new application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewApplication {
    pub name: String,
    pub description: Option<String>,
    pub executable_path: String,
    pub lob_id: i64,
    pub status_id: i64,
    pub cost_center_id: i64,
    pub version: Option<String>,
}

impl NewApplication {
    /// Required members must be present before the record reaches the store.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("application name is required"));
        }
        if self.executable_path.trim().is_empty() {
            return Err(Error::validation("executable path is required"));
        }
        if self.lob_id <= 0 || self.status_id <= 0 || self.cost_center_id <= 0 {
            return Err(Error::validation(
                "lob, status and cost center references are required",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostCenter {
    pub id: i64,
    pub name: String,
}

/// One dynamic attribute joined against its per-application value.
/// `value` is `None` when the field has no recorded value for the
/// application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldWithValue {
    pub name: String,
    pub field_type: String,
    pub is_required: bool,
    pub value: Option<String>,
}

/// Conversion lifecycle of an ingestible folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// A grouping of ingestible documents under a knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub kb_id: String,
    pub folder_path: String,
    pub folder_name: String,
    pub file_count: i64,
    pub processed_files: i64,
    pub conversion_status: FolderStatus,
    pub conversion_progress: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFolder {
    pub kb_id: String,
    pub folder_path: String,
    pub folder_name: String,
    pub file_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_application() -> NewApplication {
        NewApplication {
            name: "Ledger".to_string(),
            description: None,
            executable_path: r"\\share\apps\ledger.exe".to_string(),
            lob_id: 1,
            status_id: 1,
            cost_center_id: 1,
            version: Some("1.0.0".to_string()),
        }
    }

    #[test]
    fn validate_accepts_complete_record() {
        assert!(valid_application().validate().is_ok());
    }

    #[test]
    fn validate_rejects_blank_name() {
        let mut app = valid_application();
        app.name = "  ".to_string();
        assert!(app.validate().is_err());
    }

    #[test]
    fn validate_rejects_missing_references() {
        let mut app = valid_application();
        app.cost_center_id = 0;
        assert!(app.validate().is_err());
    }

    #[test]
    fn folder_status_serializes_snake_case() {
        let encoded = serde_json::to_string(&FolderStatus::Processing).expect("serialize status");
        assert_eq!(encoded, "\"processing\"");
    }
}
