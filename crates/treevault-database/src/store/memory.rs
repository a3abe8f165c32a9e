//! In-memory store using a Tokio mutex for tests and single-node development.
//!
//! A changeset is applied to a copy of the state under one guard and
//! swapped in only when every mutation succeeded, which mirrors the
//! all-or-nothing visibility of a database transaction. The unique and
//! foreign-key rules of the Postgres schema are checked on the copy.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use treevault_core::error::AppError;
use treevault_core::result::AppResult;
use treevault_core::traits::QuotaLedger;
use treevault_core::types::{FileId, FolderId, ShareId, SyncEventId, UserId};
use treevault_entity::event::{NewSyncEvent, SyncAction, SyncEvent};
use treevault_entity::file::{File, NewFile};
use treevault_entity::folder::{Folder, MaterializedPath, NewFolder};
use treevault_entity::lifecycle::ResourceState;
use treevault_entity::permission::ResourceType;
use treevault_entity::share::{
    FileShareGrant, FolderShareGrant, Share, SharePermission, ShareTarget, UpsertShare,
};

use super::{Applied, Changeset, Mutation, ShareStore, TreeStore};

/// Everything the store holds.
#[derive(Debug, Clone, Default)]
struct InnerState {
    folders: BTreeMap<FolderId, Folder>,
    files: HashMap<FileId, File>,
    shares: HashMap<ShareId, Share>,
    /// Permission slugs granted to each user through roles.
    role_slugs: HashMap<UserId, HashSet<String>>,
    events: Vec<SyncEvent>,
    last_folder_key: i64,
}

impl InnerState {
    fn folder_mut(&mut self, id: FolderId) -> AppResult<&mut Folder> {
        self.folders
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))
    }

    fn file_mut(&mut self, id: FileId) -> AppResult<&mut File> {
        self.files
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))
    }

    fn path_of(&self, id: FolderId) -> AppResult<MaterializedPath> {
        self.folders
            .get(&id)
            .map(|f| f.path.clone())
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))
    }

    fn record(&mut self, event: NewSyncEvent, now: DateTime<Utc>) {
        self.events.push(SyncEvent {
            id: SyncEventId(Uuid::now_v7()),
            user_id: event.user_id,
            action: event.action,
            resource_type: event.resource_type,
            resource_id: event.resource_id,
            metadata: event.metadata,
            created_at: now,
        });
    }

    fn apply(
        &mut self,
        mutation: Mutation,
        now: DateTime<Utc>,
        applied: &mut Applied,
    ) -> AppResult<()> {
        match mutation {
            Mutation::MoveFile { file_id, folder_id } => {
                let file = self.file_mut(file_id)?;
                file.folder_id = folder_id;
                file.version += 1;
                file.updated_at = now;
            }
            Mutation::RenameFile { file_id, name } => {
                let file = self.file_mut(file_id)?;
                file.name = name;
                file.version += 1;
                file.updated_at = now;
            }
            Mutation::RenameFolder { folder_id, name } => {
                let folder = self.folder_mut(folder_id)?;
                folder.name = name;
                folder.updated_at = now;
            }
            Mutation::MoveFolder {
                folder_id,
                parent_id,
            } => {
                let old_path = self.path_of(folder_id)?;
                let parent_path = parent_id.map(|p| self.path_of(p)).transpose()?;
                let new_path = MaterializedPath::compute(parent_path.as_ref(), folder_id);

                for folder in self.folders.values_mut() {
                    if folder.id == folder_id {
                        folder.parent_id = parent_id;
                        folder.path = new_path.clone();
                        folder.updated_at = now;
                    } else if let Some(rebased) = folder.path.rebase(&old_path, &new_path) {
                        folder.path = rebased;
                        folder.updated_at = now;
                    }
                }
            }
            Mutation::SetFolderState { ids, state } => {
                for id in ids {
                    if let Some(folder) = self.folders.get_mut(&id) {
                        folder.state = state;
                        folder.updated_at = now;
                    }
                }
            }
            Mutation::SetFileState { ids, state } => {
                for id in ids {
                    if let Some(file) = self.files.get_mut(&id) {
                        file.state = state;
                        file.version += 1;
                        file.updated_at = now;
                    }
                }
            }
            Mutation::DeleteFiles(ids) => {
                let ids: HashSet<FileId> = ids.into_iter().collect();
                applied
                    .deleted_files
                    .extend(ids.iter().copied().filter(|id| self.files.remove(id).is_some()));
                self.shares
                    .retain(|_, s| !matches!(s.target, ShareTarget::File(id) if ids.contains(&id)));
            }
            Mutation::DeleteFolders(ids) => {
                let ids: HashSet<FolderId> = ids.into_iter().collect();
                applied
                    .deleted_folders
                    .extend(ids.iter().copied().filter(|id| self.folders.remove(id).is_some()));
                self.shares.retain(
                    |_, s| !matches!(s.target, ShareTarget::Folder(id) if ids.contains(&id)),
                );
                let orphaned_folder = self
                    .folders
                    .values()
                    .any(|f| f.parent_id.is_some_and(|p| ids.contains(&p)));
                let orphaned_file = self
                    .files
                    .values()
                    .any(|f| f.folder_id.is_some_and(|p| ids.contains(&p)));
                if orphaned_folder || orphaned_file {
                    return Err(AppError::database(
                        "Foreign key violation: deleted folder still has children",
                    ));
                }
            }
            Mutation::RecordEvent(event) => self.record(event, now),
        }
        Ok(())
    }

    /// The `(owner, parent, name)` unique indexes of the schema.
    fn check_unique_names(&self) -> AppResult<()> {
        let mut seen = HashSet::new();
        for folder in self.folders.values() {
            if !seen.insert((folder.owner_id, folder.parent_id, folder.name.as_str())) {
                return Err(AppError::conflict(format!(
                    "Folder name '{}' already taken",
                    folder.name
                )));
            }
        }
        let mut seen = HashSet::new();
        for file in self.files.values() {
            if !seen.insert((file.owner_id, file.folder_id, file.name.as_str())) {
                return Err(AppError::conflict(format!(
                    "File name '{}' already taken",
                    file.name
                )));
            }
        }
        Ok(())
    }
}

/// Process-local implementation of [`TreeStore`] and [`ShareStore`].
///
/// Suitable for tests and single-node development only.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<InnerState>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant a permission slug to a user, as if through one of their roles.
    pub async fn grant_permission(&self, user: UserId, slug: &str) {
        let mut state = self.state.lock().await;
        state
            .role_slugs
            .entry(user)
            .or_default()
            .insert(slug.to_string());
    }

    /// Every recorded event, oldest first.
    pub async fn events(&self) -> Vec<SyncEvent> {
        self.state.lock().await.events.clone()
    }

    /// Number of folder and file rows, whatever their state.
    pub async fn row_counts(&self) -> (usize, usize) {
        let state = self.state.lock().await;
        (state.folders.len(), state.files.len())
    }
}

#[async_trait]
impl TreeStore for MemoryStore {
    async fn find_folder(&self, id: FolderId) -> AppResult<Option<Folder>> {
        Ok(self.state.lock().await.folders.get(&id).cloned())
    }

    async fn find_folders(&self, ids: &[FolderId]) -> AppResult<Vec<Folder>> {
        let state = self.state.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.folders.get(id).cloned())
            .collect())
    }

    async fn find_child_folder_ids(&self, parents: &[FolderId]) -> AppResult<Vec<FolderId>> {
        let parents: HashSet<&FolderId> = parents.iter().collect();
        let state = self.state.lock().await;
        Ok(state
            .folders
            .values()
            .filter(|f| f.parent_id.as_ref().is_some_and(|p| parents.contains(p)))
            .map(|f| f.id)
            .collect())
    }

    async fn folder_name_taken(
        &self,
        owner: UserId,
        parent: Option<FolderId>,
        name: &str,
        exclude: Option<FolderId>,
    ) -> AppResult<bool> {
        let state = self.state.lock().await;
        Ok(state.folders.values().any(|f| {
            f.owner_id == owner
                && f.parent_id == parent
                && f.name == name
                && Some(f.id) != exclude
        }))
    }

    async fn create_folder(&self, data: &NewFolder, actor: UserId) -> AppResult<Folder> {
        let now = Utc::now();
        let mut state = self.state.lock().await;
        let mut working = state.clone();

        working.last_folder_key += 1;
        let id = FolderId(working.last_folder_key);
        let parent_path = data
            .parent_id
            .map(|p| {
                working.path_of(p).map_err(|_| {
                    AppError::not_found(format!("Parent folder {p} not found"))
                })
            })
            .transpose()?;

        let folder = Folder {
            id,
            public_id: Uuid::new_v4(),
            name: data.name.clone(),
            parent_id: data.parent_id,
            owner_id: data.owner_id,
            path: MaterializedPath::compute(parent_path.as_ref(), id),
            state: ResourceState::Active,
            created_at: now,
            updated_at: now,
        };
        working.folders.insert(id, folder.clone());
        working.check_unique_names()?;
        working.record(
            NewSyncEvent::folder(
                actor,
                SyncAction::Create,
                id,
                json!({ "name": folder.name, "parent_id": folder.parent_id, "path": folder.path }),
            ),
            now,
        );

        *state = working;
        Ok(folder)
    }

    async fn find_file(&self, id: FileId) -> AppResult<Option<File>> {
        Ok(self.state.lock().await.files.get(&id).cloned())
    }

    async fn find_files(&self, ids: &[FileId]) -> AppResult<Vec<File>> {
        let state = self.state.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.files.get(id).cloned())
            .collect())
    }

    async fn find_files_in_folders(&self, folders: &[FolderId]) -> AppResult<Vec<File>> {
        let folders: HashSet<&FolderId> = folders.iter().collect();
        let state = self.state.lock().await;
        Ok(state
            .files
            .values()
            .filter(|f| f.folder_id.as_ref().is_some_and(|id| folders.contains(id)))
            .cloned()
            .collect())
    }

    async fn file_name_taken(
        &self,
        owner: UserId,
        folder: Option<FolderId>,
        name: &str,
        exclude: Option<FileId>,
    ) -> AppResult<bool> {
        let state = self.state.lock().await;
        Ok(state.files.values().any(|f| {
            f.owner_id == owner && f.folder_id == folder && f.name == name && Some(f.id) != exclude
        }))
    }

    async fn create_file(&self, data: &NewFile, actor: UserId) -> AppResult<File> {
        let now = Utc::now();
        let mut state = self.state.lock().await;
        if let Some(folder_id) = data.folder_id {
            if !state.folders.contains_key(&folder_id) {
                return Err(AppError::not_found(format!("Folder {folder_id} not found")));
            }
        }

        let mut working = state.clone();
        let file = File {
            id: FileId::new(),
            name: data.name.clone(),
            folder_id: data.folder_id,
            owner_id: data.owner_id,
            size_bytes: data.size_bytes,
            mime_type: data.mime_type.clone(),
            checksum: data.checksum.clone(),
            version: 1,
            state: ResourceState::Active,
            created_at: now,
            updated_at: now,
        };
        working.files.insert(file.id, file.clone());
        working.check_unique_names()?;
        working.record(
            NewSyncEvent::file(
                actor,
                SyncAction::Create,
                file.id,
                json!({ "name": file.name, "folder_id": file.folder_id, "size": file.size_bytes }),
            ),
            now,
        );

        *state = working;
        Ok(file)
    }

    async fn count_files_with_checksum(&self, checksum: &str) -> AppResult<i64> {
        let state = self.state.lock().await;
        Ok(state.files.values().filter(|f| f.checksum == checksum).count() as i64)
    }

    async fn find_expired_files(&self, now: DateTime<Utc>, limit: u32) -> AppResult<Vec<File>> {
        let state = self.state.lock().await;
        let mut expired: Vec<File> = state
            .files
            .values()
            .filter(|f| f.state.trash_marker().is_some_and(|m| m.is_expired(now)))
            .cloned()
            .collect();
        expired.sort_by_key(|f| f.state.trash_marker().map(|m| m.purge_at));
        expired.truncate(limit as usize);
        Ok(expired)
    }

    async fn find_expired_folders(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> AppResult<Vec<Folder>> {
        let state = self.state.lock().await;
        let mut expired: Vec<Folder> = state
            .folders
            .values()
            .filter(|f| f.state.trash_marker().is_some_and(|m| m.is_expired(now)))
            .cloned()
            .collect();
        expired.sort_by_key(|f| (f.path.as_str().len(), f.state.trash_marker().map(|m| m.purge_at)));
        expired.truncate(limit as usize);
        Ok(expired)
    }

    async fn apply(&self, changeset: Changeset) -> AppResult<Applied> {
        let mut applied = Applied::default();
        if changeset.is_empty() {
            return Ok(applied);
        }
        let count = changeset.len();
        let now = Utc::now();
        let mut state = self.state.lock().await;
        let mut working = state.clone();

        for mutation in changeset {
            working.apply(mutation, now, &mut applied)?;
        }
        working.check_unique_names()?;

        *state = working;
        debug!(mutations = count, "Changeset applied to memory store");
        Ok(applied)
    }

    async fn find_events(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
    ) -> AppResult<Vec<SyncEvent>> {
        let state = self.state.lock().await;
        Ok(state
            .events
            .iter()
            .filter(|e| e.resource_type == resource_type && e.resource_id == resource_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ShareStore for MemoryStore {
    async fn find_permission_slugs(&self, user: UserId) -> AppResult<HashSet<String>> {
        let state = self.state.lock().await;
        Ok(state.role_slugs.get(&user).cloned().unwrap_or_default())
    }

    async fn find_file_grants(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<FileShareGrant>> {
        let state = self.state.lock().await;
        Ok(state
            .shares
            .values()
            .filter(|s| s.recipient_id == Some(user) && !s.is_expired(now))
            .filter_map(|s| match s.target {
                ShareTarget::File(file_id) => Some(FileShareGrant {
                    file_id,
                    permission: s.permission,
                }),
                ShareTarget::Folder(_) => None,
            })
            .collect())
    }

    async fn find_folder_grants(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<FolderShareGrant>> {
        let state = self.state.lock().await;
        Ok(state
            .shares
            .values()
            .filter(|s| s.recipient_id == Some(user) && !s.is_expired(now))
            .filter_map(|s| match s.target {
                ShareTarget::Folder(folder_id) => state
                    .folders
                    .get(&folder_id)
                    .filter(|f| !f.is_trashed())
                    .map(|f| FolderShareGrant {
                        folder_id,
                        path: f.path.clone(),
                        permission: s.permission,
                    }),
                ShareTarget::File(_) => None,
            })
            .collect())
    }

    async fn upsert_share(&self, data: &UpsertShare) -> AppResult<Share> {
        let now = Utc::now();
        let mut state = self.state.lock().await;

        let existing = state.shares.values_mut().find(|s| {
            s.target == data.target
                && s.shared_by == data.shared_by
                && s.recipient_id == data.recipient_id
        });
        if let Some(share) = existing {
            share.token_hash = data.token_hash.clone();
            share.permission = data.permission;
            share.expires_at = data.expires_at;
            share.notes = data.notes.clone();
            share.updated_at = now;
            return Ok(share.clone());
        }

        let share = Share {
            id: ShareId::new(),
            target: data.target,
            shared_by: data.shared_by,
            recipient_id: data.recipient_id,
            token_hash: data.token_hash.clone(),
            permission: data.permission,
            expires_at: data.expires_at,
            notes: data.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        state.shares.insert(share.id, share.clone());
        Ok(share)
    }

    async fn find_share(&self, id: ShareId) -> AppResult<Option<Share>> {
        Ok(self.state.lock().await.shares.get(&id).cloned())
    }

    async fn find_share_by_token_hash(&self, token_hash: &str) -> AppResult<Option<Share>> {
        let state = self.state.lock().await;
        Ok(state
            .shares
            .values()
            .find(|s| s.token_hash.as_deref() == Some(token_hash))
            .cloned())
    }

    async fn find_shares_for_target(&self, target: ShareTarget) -> AppResult<Vec<Share>> {
        let state = self.state.lock().await;
        let mut shares: Vec<Share> = state
            .shares
            .values()
            .filter(|s| s.target == target)
            .cloned()
            .collect();
        shares.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(shares)
    }

    async fn update_share(
        &self,
        id: ShareId,
        permission: SharePermission,
        expires_at: Option<DateTime<Utc>>,
        notes: Option<String>,
    ) -> AppResult<Share> {
        let mut state = self.state.lock().await;
        let share = state
            .shares
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Share {id} not found")))?;
        share.permission = permission;
        share.expires_at = expires_at;
        share.notes = notes;
        share.updated_at = Utc::now();
        Ok(share.clone())
    }

    async fn delete_share(&self, id: ShareId) -> AppResult<bool> {
        Ok(self.state.lock().await.shares.remove(&id).is_some())
    }
}

/// Process-local implementation of [`QuotaLedger`].
#[derive(Debug, Clone, Default)]
pub struct MemoryQuotaLedger {
    usage: Arc<Mutex<HashMap<UserId, i64>>>,
}

impl MemoryQuotaLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuotaLedger for MemoryQuotaLedger {
    async fn increment(&self, user_id: UserId, bytes: i64) -> AppResult<()> {
        *self.usage.lock().await.entry(user_id).or_insert(0) += bytes;
        Ok(())
    }

    async fn decrement(&self, user_id: UserId, bytes: i64) -> AppResult<()> {
        let mut usage = self.usage.lock().await;
        let used = usage.entry(user_id).or_insert(0);
        *used = (*used - bytes).max(0);
        Ok(())
    }

    async fn usage(&self, user_id: UserId) -> AppResult<i64> {
        Ok(self.usage.lock().await.get(&user_id).copied().unwrap_or(0))
    }
}
