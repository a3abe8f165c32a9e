//! Store traits the tree core reads and writes through.
//!
//! Reads are plain queries. Every write that must be all-or-nothing is
//! expressed as a [`Changeset`] and handed to [`TreeStore::apply`], which
//! runs it inside one transaction together with its sync events.

pub mod changeset;
pub mod memory;
pub mod postgres;

use std::collections::HashSet;
use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use treevault_core::result::AppResult;
use treevault_core::types::{FileId, FolderId, ShareId, UserId};
use treevault_entity::event::SyncEvent;
use treevault_entity::file::{File, NewFile};
use treevault_entity::folder::{Folder, NewFolder};
use treevault_entity::permission::ResourceType;
use treevault_entity::share::{
    FileShareGrant, FolderShareGrant, Share, SharePermission, ShareTarget, UpsertShare,
};

pub use changeset::{Applied, Changeset, Mutation};
pub use memory::{MemoryQuotaLedger, MemoryStore};
pub use postgres::PgStore;

/// Folder and file persistence.
#[async_trait]
pub trait TreeStore: Send + Sync + Debug + 'static {
    /// Find a folder by key, whatever its state.
    async fn find_folder(&self, id: FolderId) -> AppResult<Option<Folder>>;

    /// Find several folders by key. Missing keys are skipped.
    async fn find_folders(&self, ids: &[FolderId]) -> AppResult<Vec<Folder>>;

    /// Keys of the direct children of every folder in `parents`, whatever
    /// their state. One query per BFS level.
    async fn find_child_folder_ids(&self, parents: &[FolderId]) -> AppResult<Vec<FolderId>>;

    /// Whether `owner` already has a folder called `name` under `parent`,
    /// counting trashed folders and ignoring `exclude`.
    async fn folder_name_taken(
        &self,
        owner: UserId,
        parent: Option<FolderId>,
        name: &str,
        exclude: Option<FolderId>,
    ) -> AppResult<bool>;

    /// Insert a folder, compute its path from the assigned key, and record
    /// the `create` event, in one transaction.
    async fn create_folder(&self, data: &NewFolder, actor: UserId) -> AppResult<Folder>;

    /// Find a file by ID, whatever its state.
    async fn find_file(&self, id: FileId) -> AppResult<Option<File>>;

    /// Find several files by ID. Missing IDs are skipped.
    async fn find_files(&self, ids: &[FileId]) -> AppResult<Vec<File>>;

    /// Every file whose folder is one of `folders`, whatever its state.
    async fn find_files_in_folders(&self, folders: &[FolderId]) -> AppResult<Vec<File>>;

    /// Whether `owner` already has a file called `name` in `folder`,
    /// counting trashed files and ignoring `exclude`.
    async fn file_name_taken(
        &self,
        owner: UserId,
        folder: Option<FolderId>,
        name: &str,
        exclude: Option<FileId>,
    ) -> AppResult<bool>;

    /// Insert a file row and record the `create` event, in one transaction.
    async fn create_file(&self, data: &NewFile, actor: UserId) -> AppResult<File>;

    /// Number of file rows referencing the stored object `checksum`.
    async fn count_files_with_checksum(&self, checksum: &str) -> AppResult<i64>;

    /// Trashed files whose retention has elapsed, oldest first.
    async fn find_expired_files(&self, now: DateTime<Utc>, limit: u32) -> AppResult<Vec<File>>;

    /// Trashed folders whose retention has elapsed, shallowest first.
    async fn find_expired_folders(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> AppResult<Vec<Folder>>;

    /// Apply every mutation of `changeset` atomically and report the rows
    /// it deleted.
    async fn apply(&self, changeset: Changeset) -> AppResult<Applied>;

    /// Sync events recorded for one resource, oldest first.
    async fn find_events(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
    ) -> AppResult<Vec<SyncEvent>>;
}

/// Role permissions and share persistence.
#[async_trait]
pub trait ShareStore: Send + Sync + Debug + 'static {
    /// Distinct permission slugs reachable through the user's roles.
    async fn find_permission_slugs(&self, user: UserId) -> AppResult<HashSet<String>>;

    /// Non-expired direct file shares targeting the user.
    async fn find_file_grants(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<FileShareGrant>>;

    /// Non-expired folder shares targeting the user, with folder paths.
    async fn find_folder_grants(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<FolderShareGrant>>;

    /// Create the share for (target, sharer, recipient) or update it in place.
    async fn upsert_share(&self, data: &UpsertShare) -> AppResult<Share>;

    /// Find a share by ID.
    async fn find_share(&self, id: ShareId) -> AppResult<Option<Share>>;

    /// Find a guest link by the hash of its token.
    async fn find_share_by_token_hash(&self, token_hash: &str) -> AppResult<Option<Share>>;

    /// Every share on a resource.
    async fn find_shares_for_target(&self, target: ShareTarget) -> AppResult<Vec<Share>>;

    /// Change the permission, expiry, and notes of a share.
    async fn update_share(
        &self,
        id: ShareId,
        permission: SharePermission,
        expires_at: Option<DateTime<Utc>>,
        notes: Option<String>,
    ) -> AppResult<Share>;

    /// Delete a share. Returns whether a row was removed.
    async fn delete_share(&self, id: ShareId) -> AppResult<bool>;
}
