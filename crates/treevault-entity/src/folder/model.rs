//! Folder entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use treevault_core::types::{FolderId, UserId};

use super::path::MaterializedPath;
use crate::lifecycle::ResourceState;

/// A folder in a user's tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    /// Internal key, also the folder's segment in materialized paths.
    pub id: FolderId,
    /// Client-facing identifier.
    pub public_id: Uuid,
    /// Folder name, unique per (owner, parent) across active and trashed rows.
    pub name: String,
    /// Parent folder (None for root folders).
    pub parent_id: Option<FolderId>,
    /// The folder owner.
    pub owner_id: UserId,
    /// Materialized path, `parent.path + id + "/"`.
    pub path: MaterializedPath,
    /// Lifecycle state.
    pub state: ResourceState,
    /// When the folder was created.
    pub created_at: DateTime<Utc>,
    /// When the folder was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Folder {
    /// Check if this is a root folder (no parent).
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Check if the folder is in the trash.
    pub fn is_trashed(&self) -> bool {
        self.state.is_trashed()
    }
}

impl<'r> FromRow<'r, PgRow> for Folder {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let raw_path: String = row.try_get("path")?;
        let path = MaterializedPath::parse(&raw_path).map_err(|e| sqlx::Error::ColumnDecode {
            index: "path".to_string(),
            source: Box::new(e),
        })?;
        let state = ResourceState::from_columns(
            row.try_get("deleted_at")?,
            row.try_get("deleted_by")?,
            row.try_get("purge_at")?,
            row.try_get("trash_cascade")?,
        )
        .ok_or_else(|| sqlx::Error::ColumnDecode {
            index: "deleted_at".to_string(),
            source: "partial trash marker".into(),
        })?;

        Ok(Self {
            id: row.try_get("id")?,
            public_id: row.try_get("public_id")?,
            name: row.try_get("name")?,
            parent_id: row.try_get("parent_id")?,
            owner_id: row.try_get("owner_id")?,
            path,
            state,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Data required to create a new folder.
///
/// The path is not part of the request: it depends on the key the database
/// assigns and is computed right after the insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFolder {
    /// Folder name.
    pub name: String,
    /// Parent folder (None for root).
    pub parent_id: Option<FolderId>,
    /// The folder owner.
    pub owner_id: UserId,
}
