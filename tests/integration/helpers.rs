//! Shared test helpers for integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};

use treevault_core::config::{StorageConfig, TrashConfig};
use treevault_core::types::{FileId, FolderId, UserId};
use treevault_database::store::{MemoryQuotaLedger, MemoryStore, TreeStore};
use treevault_entity::file::File;
use treevault_entity::folder::Folder;
use treevault_entity::share::{Share, SharePermission, ShareTarget};
use treevault_service::{RegisterFileRequest, RequestContext, ShareRequest, Services};
use treevault_storage::{MemoryObjectStore, StorageJanitor};

/// Owner of most fixtures.
pub const ALICE: UserId = UserId(1);
/// Usual share recipient.
pub const BOB: UserId = UserId(2);
/// Second recipient.
pub const CAROL: UserId = UserId(3);
/// A user with no shares and no roles.
pub const STRANGER: UserId = UserId(9);

/// Test application context
pub struct TestApp {
    /// Tree and share store
    pub store: MemoryStore,
    /// Quota ledger
    pub quota: MemoryQuotaLedger,
    /// Object store behind the janitor
    pub objects: MemoryObjectStore,
    /// Janitor handle, for flushing queued deletions
    pub janitor: StorageJanitor,
    /// Every service, wired over the stores above
    pub services: Services,
}

impl TestApp {
    /// Create a new test application with the default trash settings
    pub async fn new() -> Self {
        Self::with_trash(TrashConfig::default()).await
    }

    /// Create a new test application with custom trash settings
    pub async fn with_trash(trash: TrashConfig) -> Self {
        let store = MemoryStore::new();
        let quota = MemoryQuotaLedger::new();
        let objects = MemoryObjectStore::new();
        let (janitor, _handle) =
            StorageJanitor::spawn(Arc::new(objects.clone()), &StorageConfig::default());

        let services = Services::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(quota.clone()),
            janitor.clone(),
            &trash,
        );

        Self {
            store,
            quota,
            objects,
            janitor,
            services,
        }
    }

    /// Load a fresh request context for `user` as of now
    pub async fn ctx(&self, user: UserId) -> RequestContext {
        self.services.context(user).await.expect("load context")
    }

    /// Load a fresh request context for `user` as of `now`
    pub async fn ctx_at(&self, user: UserId, now: DateTime<Utc>) -> RequestContext {
        self.services
            .context_at(user, now)
            .await
            .expect("load context")
    }

    /// Give `user` a role permission slug
    pub async fn grant(&self, user: UserId, slug: &str) {
        self.store.grant_permission(user, slug).await;
    }

    /// Create a folder as `user`
    pub async fn mkdir(&self, user: UserId, name: &str, parent: Option<FolderId>) -> Folder {
        let ctx = self.ctx(user).await;
        self.services
            .folders
            .create_folder(&ctx, name, parent)
            .await
            .expect("create folder")
    }

    /// Register an upload as `user`, with a checksum unique to this upload
    pub async fn upload(
        &self,
        user: UserId,
        folder: Option<FolderId>,
        name: &str,
        size: i64,
    ) -> File {
        let checksum = format!("u{}-{:?}-{name}", user.0, folder);
        self.upload_object(user, folder, name, size, &checksum)
            .await
    }

    /// Register an upload as `user` pointing at the object `checksum`
    pub async fn upload_object(
        &self,
        user: UserId,
        folder: Option<FolderId>,
        name: &str,
        size: i64,
        checksum: &str,
    ) -> File {
        self.objects.put(checksum).await;
        let ctx = self.ctx(user).await;
        self.services
            .files
            .register_file(
                &ctx,
                RegisterFileRequest {
                    folder_id: folder,
                    name: name.to_string(),
                    size_bytes: size,
                    mime_type: None,
                    checksum: checksum.to_string(),
                },
            )
            .await
            .expect("register file")
    }

    /// Share a folder from `owner` to `recipient`
    pub async fn share_folder(
        &self,
        owner: UserId,
        folder: FolderId,
        recipient: UserId,
        permission: SharePermission,
    ) -> Share {
        self.share(owner, ShareTarget::Folder(folder), recipient, permission)
            .await
    }

    /// Share a file from `owner` to `recipient`
    pub async fn share_file(
        &self,
        owner: UserId,
        file: FileId,
        recipient: UserId,
        permission: SharePermission,
    ) -> Share {
        self.share(owner, ShareTarget::File(file), recipient, permission)
            .await
    }

    async fn share(
        &self,
        owner: UserId,
        target: ShareTarget,
        recipient: UserId,
        permission: SharePermission,
    ) -> Share {
        let ctx = self.ctx(owner).await;
        self.services
            .shares
            .share(
                &ctx,
                ShareRequest {
                    target,
                    recipient_id: recipient,
                    permission,
                    expires_at: None,
                    notes: None,
                },
            )
            .await
            .expect("share")
    }

    /// Current row of a folder, whatever its state
    pub async fn folder(&self, id: FolderId) -> Option<Folder> {
        self.store.find_folder(id).await.expect("find folder")
    }

    /// Current row of a file, whatever its state
    pub async fn file(&self, id: FileId) -> Option<File> {
        self.store.find_file(id).await.expect("find file")
    }

    /// Bytes charged to `user`
    pub async fn usage(&self, user: UserId) -> i64 {
        use treevault_core::traits::QuotaLedger;
        self.quota.usage(user).await.expect("usage")
    }
}
