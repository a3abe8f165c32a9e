//! Sync event model.
//!
//! One event is written per affected resource, inside the same transaction
//! as the mutation it describes. Desktop and mobile clients replay the log
//! to stay in sync; auditors read the same rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use treevault_core::types::{FileId, FolderId, SyncEventId, UserId};

use crate::permission::ResourceType;

/// What happened to the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "sync_action", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    /// Resource created.
    Create,
    /// Resource renamed.
    Rename,
    /// Resource moved to a new parent.
    Move,
    /// Resource moved to the trash.
    Delete,
    /// Resource restored from the trash.
    Restore,
    /// Resource hard-deleted.
    Purge,
}

impl SyncAction {
    /// Return the action as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Rename => "rename",
            Self::Move => "move",
            Self::Delete => "delete",
            Self::Restore => "restore",
            Self::Purge => "purge",
        }
    }
}

impl std::fmt::Display for SyncAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted sync event.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SyncEvent {
    /// Unique event identifier.
    pub id: SyncEventId,
    /// The acting user.
    pub user_id: UserId,
    /// What happened.
    pub action: SyncAction,
    /// Kind of resource.
    pub resource_type: ResourceType,
    /// File UUID or folder key, as text.
    pub resource_id: String,
    /// Action-specific details (old/new parent, names, sizes).
    pub metadata: serde_json::Value,
    /// When the event was recorded.
    pub created_at: DateTime<Utc>,
}

/// Data required to record a sync event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSyncEvent {
    /// The acting user.
    pub user_id: UserId,
    /// What happened.
    pub action: SyncAction,
    /// Kind of resource.
    pub resource_type: ResourceType,
    /// File UUID or folder key, as text.
    pub resource_id: String,
    /// Action-specific details.
    pub metadata: serde_json::Value,
}

impl NewSyncEvent {
    /// Event about a file.
    pub fn file(
        user_id: UserId,
        action: SyncAction,
        file_id: FileId,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            user_id,
            action,
            resource_type: ResourceType::File,
            resource_id: file_id.to_string(),
            metadata,
        }
    }

    /// Event about a folder.
    pub fn folder(
        user_id: UserId,
        action: SyncAction,
        folder_id: FolderId,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            user_id,
            action,
            resource_type: ResourceType::Folder,
            resource_id: folder_id.to_string(),
            metadata,
        }
    }
}
