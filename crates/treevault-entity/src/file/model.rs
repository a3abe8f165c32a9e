//! File entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

use treevault_core::types::{FileId, FolderId, UserId};

use crate::lifecycle::ResourceState;

/// A file stored in TreeVault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    /// Unique file identifier.
    pub id: FileId,
    /// The file name (including extension).
    pub name: String,
    /// The folder containing this file (None = the owner's root).
    pub folder_id: Option<FolderId>,
    /// The file owner.
    pub owner_id: UserId,
    /// File size in bytes, charged to the owner's quota.
    pub size_bytes: i64,
    /// MIME type of the file.
    pub mime_type: Option<String>,
    /// Content-addressing checksum; doubles as the object storage key.
    pub checksum: String,
    /// Incremented on every rename, move, delete, and restore.
    pub version: i32,
    /// Lifecycle state.
    pub state: ResourceState,
    /// When the file was created.
    pub created_at: DateTime<Utc>,
    /// When the file was last updated.
    pub updated_at: DateTime<Utc>,
}

impl File {
    /// Key of the stored object.
    pub fn storage_key(&self) -> &str {
        &self.checksum
    }

    /// Check if the file is in the trash.
    pub fn is_trashed(&self) -> bool {
        self.state.is_trashed()
    }

    /// Get the file extension (lowercase), if any.
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit('.')
            .next()
            .filter(|ext| *ext != self.name)
            .map(|ext| ext.to_lowercase())
    }
}

impl<'r> FromRow<'r, PgRow> for File {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
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
            name: row.try_get("name")?,
            folder_id: row.try_get("folder_id")?,
            owner_id: row.try_get("owner_id")?,
            size_bytes: row.try_get("size_bytes")?,
            mime_type: row.try_get("mime_type")?,
            checksum: row.try_get("checksum")?,
            version: row.try_get("version")?,
            state,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Data required to register a new file after its upload completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFile {
    /// The folder to place the file in (None = root).
    pub folder_id: Option<FolderId>,
    /// The file name.
    pub name: String,
    /// The file owner.
    pub owner_id: UserId,
    /// File size in bytes.
    pub size_bytes: i64,
    /// MIME type.
    pub mime_type: Option<String>,
    /// Content-addressing checksum of the uploaded object.
    pub checksum: String,
}
