//! Wiring of every service over one set of collaborators.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use treevault_auth::PermissionContextBuilder;
use treevault_core::config::TrashConfig;
use treevault_core::result::AppResult;
use treevault_core::traits::QuotaLedger;
use treevault_core::types::UserId;
use treevault_database::store::{ShareStore, TreeStore};
use treevault_storage::janitor::StorageJanitor;

use crate::context::RequestContext;
use crate::file::FileService;
use crate::folder::{FolderService, PathTree};
use crate::mover::MoveEngine;
use crate::share::ShareService;
use crate::trash::TrashEngine;

/// Every service, constructed once at startup and shared behind `Arc`.
#[derive(Debug, Clone)]
pub struct Services {
    /// Loads per-request permission contexts.
    pub permissions: PermissionContextBuilder,
    /// Tree traversal.
    pub tree: PathTree,
    /// Folder lifecycle.
    pub folders: FolderService,
    /// File lifecycle.
    pub files: FileService,
    /// Shares and guest links.
    pub shares: ShareService,
    /// Moves.
    pub mover: MoveEngine,
    /// Trash and purge.
    pub trash: TrashEngine,
}

impl Services {
    /// Build every service.
    pub fn new(
        tree_store: Arc<dyn TreeStore>,
        share_store: Arc<dyn ShareStore>,
        quota: Arc<dyn QuotaLedger>,
        janitor: StorageJanitor,
        trash: &TrashConfig,
    ) -> Self {
        Self {
            permissions: PermissionContextBuilder::new(Arc::clone(&share_store)),
            tree: PathTree::new(Arc::clone(&tree_store)),
            folders: FolderService::new(Arc::clone(&tree_store)),
            files: FileService::new(Arc::clone(&tree_store), Arc::clone(&quota)),
            shares: ShareService::new(share_store, Arc::clone(&tree_store)),
            mover: MoveEngine::new(Arc::clone(&tree_store)),
            trash: TrashEngine::new(tree_store, quota, janitor, trash),
        }
    }

    /// Load the request context for `user_id` as of now.
    pub async fn context(&self, user_id: UserId) -> AppResult<RequestContext> {
        RequestContext::load(&self.permissions, user_id).await
    }

    /// Load the request context for `user_id` as of `now`.
    pub async fn context_at(&self, user_id: UserId, now: DateTime<Utc>) -> AppResult<RequestContext> {
        RequestContext::load_at(&self.permissions, user_id, now).await
    }
}
