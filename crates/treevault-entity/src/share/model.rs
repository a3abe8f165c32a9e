//! Share entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

use treevault_core::types::{FileId, FolderId, ShareId, UserId};

use super::permission::SharePermission;
use crate::permission::ResourceType;

/// The resource a share points at. Exactly one of file or folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum ShareTarget {
    /// A single file.
    File(FileId),
    /// A folder and everything below it.
    Folder(FolderId),
}

impl ShareTarget {
    /// Kind of the shared resource.
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Self::File(_) => ResourceType::File,
            Self::Folder(_) => ResourceType::Folder,
        }
    }

    /// Split into the two nullable columns.
    pub fn to_columns(&self) -> (Option<FileId>, Option<FolderId>) {
        match self {
            Self::File(id) => (Some(*id), None),
            Self::Folder(id) => (None, Some(*id)),
        }
    }

    /// Rebuild from the two nullable columns.
    pub fn from_columns(file_id: Option<FileId>, folder_id: Option<FolderId>) -> Option<Self> {
        match (file_id, folder_id) {
            (Some(file), None) => Some(Self::File(file)),
            (None, Some(folder)) => Some(Self::Folder(folder)),
            _ => None,
        }
    }
}

/// A share granting access to a file or folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Share {
    /// Unique share identifier.
    pub id: ShareId,
    /// The shared resource.
    pub target: ShareTarget,
    /// User who created the share.
    pub shared_by: UserId,
    /// Recipient user; `None` for a guest link.
    pub recipient_id: Option<UserId>,
    /// SHA-256 hex digest of the guest link token.
    #[serde(skip_serializing)]
    pub token_hash: Option<String>,
    /// Permission level granted.
    pub permission: SharePermission,
    /// When the share expires (None = never).
    pub expires_at: Option<DateTime<Utc>>,
    /// Free-form notes from the sharer.
    pub notes: Option<String>,
    /// When the share was created.
    pub created_at: DateTime<Utc>,
    /// When the share was last changed.
    pub updated_at: DateTime<Utc>,
}

impl Share {
    /// Whether this share is a guest link (no recipient).
    pub fn is_guest_link(&self) -> bool {
        self.recipient_id.is_none()
    }

    /// Check if the share has expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| exp <= now).unwrap_or(false)
    }
}

impl<'r> FromRow<'r, PgRow> for Share {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let target = ShareTarget::from_columns(row.try_get("file_id")?, row.try_get("folder_id")?)
            .ok_or_else(|| sqlx::Error::ColumnDecode {
                index: "file_id".to_string(),
                source: "share must target exactly one resource".into(),
            })?;

        Ok(Self {
            id: row.try_get("id")?,
            target,
            shared_by: row.try_get("shared_by")?,
            recipient_id: row.try_get("recipient_id")?,
            token_hash: row.try_get("token_hash")?,
            permission: row.try_get("permission")?,
            expires_at: row.try_get("expires_at")?,
            notes: row.try_get("notes")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Data for creating or updating the share of a (resource, sharer, recipient) tuple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertShare {
    /// The shared resource.
    pub target: ShareTarget,
    /// User creating the share.
    pub shared_by: UserId,
    /// Recipient (None for a guest link).
    pub recipient_id: Option<UserId>,
    /// SHA-256 hex digest of a guest link token.
    pub token_hash: Option<String>,
    /// Permission level.
    pub permission: SharePermission,
    /// Expiry time (None = never).
    pub expires_at: Option<DateTime<Utc>>,
    /// Notes.
    pub notes: Option<String>,
}
