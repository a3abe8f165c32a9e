//! Resource lifecycle state shared by files and folders.
//!
//! ```text
//! Active ──soft-delete──▶ Trashed ──restore──▶ Active
//!                            │
//!                            └──force-delete / purge──▶ Purged (terminal)
//! ```
//!
//! The database keeps four nullable columns (`deleted_at`, `deleted_by`,
//! `purge_at`, `trash_cascade`); rows are converted into [`ResourceState`]
//! when decoded.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use treevault_core::types::UserId;

/// Who trashed a resource, when, and when it becomes eligible for purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrashMarker {
    /// When the resource was moved to the trash.
    pub since: DateTime<Utc>,
    /// The user who trashed it.
    pub by: UserId,
    /// When the scheduled purge may hard-delete it.
    pub purge_at: DateTime<Utc>,
    /// Identifies one soft-delete operation. Every item it trashed carries
    /// the same value; restore brings back exactly that set.
    pub cascade: Uuid,
}

impl TrashMarker {
    /// Build a marker for a soft-delete happening at `now`, with a fresh
    /// cascade id.
    pub fn new(by: UserId, now: DateTime<Utc>, retention_days: u32) -> Self {
        Self {
            since: now,
            by,
            purge_at: now + Duration::days(i64::from(retention_days)),
            cascade: Uuid::now_v7(),
        }
    }

    /// Whether `other` was set by the same soft-delete operation.
    pub fn same_cascade(&self, other: &TrashMarker) -> bool {
        self.cascade == other.cascade
    }

    /// Whether the retention period has elapsed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.purge_at <= now
    }
}

/// Lifecycle state of a file or folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ResourceState {
    /// Visible in the tree.
    Active,
    /// In the trash, restorable until purged.
    Trashed(TrashMarker),
    /// Hard-deleted. Returned by force-delete; no stored row carries it.
    Purged,
}

impl ResourceState {
    /// Fold the nullable lifecycle columns into a state.
    ///
    /// Returns `None` when the columns are only partially set, which the
    /// schema's CHECK constraint forbids.
    pub fn from_columns(
        deleted_at: Option<DateTime<Utc>>,
        deleted_by: Option<UserId>,
        purge_at: Option<DateTime<Utc>>,
        cascade: Option<Uuid>,
    ) -> Option<Self> {
        match (deleted_at, deleted_by, purge_at, cascade) {
            (None, None, None, None) => Some(Self::Active),
            (Some(since), Some(by), Some(purge_at), Some(cascade)) => {
                Some(Self::Trashed(TrashMarker {
                    since,
                    by,
                    purge_at,
                    cascade,
                }))
            }
            _ => None,
        }
    }

    /// Split the state back into column values for binding.
    pub fn to_columns(
        &self,
    ) -> (
        Option<DateTime<Utc>>,
        Option<UserId>,
        Option<DateTime<Utc>>,
        Option<Uuid>,
    ) {
        match self {
            Self::Trashed(marker) => (
                Some(marker.since),
                Some(marker.by),
                Some(marker.purge_at),
                Some(marker.cascade),
            ),
            Self::Active | Self::Purged => (None, None, None, None),
        }
    }

    /// Whether the resource is active.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Whether the resource is in the trash.
    pub fn is_trashed(&self) -> bool {
        matches!(self, Self::Trashed(_))
    }

    /// The trash marker, if trashed.
    pub fn trash_marker(&self) -> Option<&TrashMarker> {
        match self {
            Self::Trashed(marker) => Some(marker),
            _ => None,
        }
    }
}
