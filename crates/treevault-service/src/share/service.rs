//! Share management: user shares, guest links, and revocation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use treevault_auth::{FilePolicy, FolderPolicy};
use treevault_core::AppError;
use treevault_core::result::AppResult;
use treevault_core::types::{ShareId, UserId};
use treevault_database::store::{ShareStore, TreeStore};
use treevault_entity::permission::SystemPermission;
use treevault_entity::share::{Share, SharePermission, ShareTarget, UpsertShare};

use super::link::{generate_token, hash_token};
use crate::context::RequestContext;
use crate::folder::PathTree;

/// Creates, updates, revokes, and resolves shares.
#[derive(Debug, Clone)]
pub struct ShareService {
    /// Share store.
    shares: Arc<dyn ShareStore>,
    /// Tree store, for the shared resources themselves.
    tree_store: Arc<dyn TreeStore>,
    /// Tree queries.
    tree: PathTree,
}

/// Request to share a resource with a user.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ShareRequest {
    /// The shared file or folder.
    pub target: ShareTarget,
    /// The user receiving access.
    pub recipient_id: UserId,
    /// Access level.
    pub permission: SharePermission,
    /// Expiration time (optional).
    pub expires_at: Option<DateTime<Utc>>,
    /// Free-form note from the sharer.
    pub notes: Option<String>,
}

/// Request to update an existing share.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UpdateShareRequest {
    /// New access level.
    pub permission: SharePermission,
    /// New expiration (None = never).
    pub expires_at: Option<DateTime<Utc>>,
    /// New note.
    pub notes: Option<String>,
}

/// A freshly created guest link.
///
/// `token` is the only copy of the plain token; it cannot be recovered
/// later.
#[derive(Debug, Clone, serde::Serialize)]
pub struct GuestLink {
    /// The stored share row.
    pub share: Share,
    /// Plain token to hand to the guest.
    pub token: String,
}

/// What a share operation needs to know about its target.
#[derive(Debug, Clone, Copy)]
struct TargetInfo {
    owner_id: UserId,
    trashed: bool,
    visible: bool,
}

impl ShareService {
    /// Creates a new share service.
    pub fn new(shares: Arc<dyn ShareStore>, tree_store: Arc<dyn TreeStore>) -> Self {
        Self {
            tree: PathTree::new(Arc::clone(&tree_store)),
            shares,
            tree_store,
        }
    }

    /// Shares a resource with another user, or updates the existing share
    /// from the same sharer to the same recipient.
    pub async fn share(&self, ctx: &RequestContext, req: ShareRequest) -> AppResult<Share> {
        let target = self.load_target(ctx, req.target).await?;
        Self::require_share_right(ctx, req.target, &target)?;
        Self::check_shareable(req.target, &target)?;

        if req.recipient_id == target.owner_id {
            return Err(AppError::invalid_field(
                "recipient_id",
                "Cannot share a resource with its owner",
            ));
        }
        Self::check_expiry(req.expires_at, ctx.request_time)?;

        let share = self
            .shares
            .upsert_share(&UpsertShare {
                target: req.target,
                shared_by: ctx.user_id,
                recipient_id: Some(req.recipient_id),
                token_hash: None,
                permission: req.permission,
                expires_at: req.expires_at,
                notes: req.notes,
            })
            .await?;

        info!(
            user_id = %ctx.user_id,
            share_id = %share.id,
            recipient_id = %req.recipient_id,
            permission = %share.permission,
            "Share granted"
        );

        Ok(share)
    }

    /// Changes the permission, expiry, and notes of a share.
    pub async fn update_share(
        &self,
        ctx: &RequestContext,
        share_id: ShareId,
        req: UpdateShareRequest,
    ) -> AppResult<Share> {
        let share = self.find_managed(ctx, share_id).await?;
        Self::check_expiry(req.expires_at, ctx.request_time)?;

        let updated = self
            .shares
            .update_share(share.id, req.permission, req.expires_at, req.notes)
            .await?;

        info!(
            user_id = %ctx.user_id,
            share_id = %share_id,
            permission = %updated.permission,
            "Share updated"
        );

        Ok(updated)
    }

    /// Deletes a share. The recipient loses access from their next request.
    pub async fn revoke(&self, ctx: &RequestContext, share_id: ShareId) -> AppResult<()> {
        let share = self.find_managed(ctx, share_id).await?;
        if !self.shares.delete_share(share.id).await? {
            return Err(AppError::not_found(format!("Share {share_id} not found")));
        }

        info!(user_id = %ctx.user_id, share_id = %share_id, "Share revoked");
        Ok(())
    }

    /// Creates an anonymous guest link, or rotates the token of the link the
    /// user already made for this resource.
    pub async fn create_guest_link(
        &self,
        ctx: &RequestContext,
        target: ShareTarget,
        permission: SharePermission,
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<GuestLink> {
        let info = self.load_target(ctx, target).await?;
        Self::require_share_right(ctx, target, &info)?;
        Self::check_shareable(target, &info)?;
        Self::check_expiry(expires_at, ctx.request_time)?;

        let token = generate_token();
        let share = self
            .shares
            .upsert_share(&UpsertShare {
                target,
                shared_by: ctx.user_id,
                recipient_id: None,
                token_hash: Some(hash_token(&token)),
                permission,
                expires_at,
                notes: None,
            })
            .await?;

        info!(user_id = %ctx.user_id, share_id = %share.id, "Guest link created");

        Ok(GuestLink { share, token })
    }

    /// Looks up the share behind a guest token.
    ///
    /// Unknown, expired, and trashed-target links all read as not found.
    pub async fn resolve_guest_link(&self, token: &str, now: DateTime<Utc>) -> AppResult<Share> {
        let not_found = || AppError::not_found("Share link not found");

        let share = self
            .shares
            .find_share_by_token_hash(&hash_token(token))
            .await?
            .ok_or_else(not_found)?;

        if share.is_expired(now) {
            debug!(share_id = %share.id, "Guest link expired");
            return Err(not_found());
        }

        let live = match share.target {
            ShareTarget::File(id) => self
                .tree_store
                .find_file(id)
                .await?
                .is_some_and(|f| f.state.is_active()),
            ShareTarget::Folder(id) => self
                .tree_store
                .find_folder(id)
                .await?
                .is_some_and(|f| f.state.is_active()),
        };
        if !live {
            return Err(not_found());
        }

        Ok(share)
    }

    /// Lists the shares on a resource.
    ///
    /// Owners and `share-any` holders see every share; anyone else who can
    /// see the resource only sees shares they created or received.
    pub async fn list_shares(
        &self,
        ctx: &RequestContext,
        target: ShareTarget,
    ) -> AppResult<Vec<Share>> {
        let info = self.load_target(ctx, target).await?;
        if !info.visible {
            return Err(Self::hidden(target));
        }

        let shares = self.shares.find_shares_for_target(target).await?;
        if Self::may_manage_all(ctx, &info) {
            return Ok(shares);
        }
        Ok(shares
            .into_iter()
            .filter(|s| s.shared_by == ctx.user_id || s.recipient_id == Some(ctx.user_id))
            .collect())
    }

    async fn load_target(&self, ctx: &RequestContext, target: ShareTarget) -> AppResult<TargetInfo> {
        match target {
            ShareTarget::File(id) => {
                let file = self
                    .tree_store
                    .find_file(id)
                    .await?
                    .ok_or_else(|| Self::hidden(target))?;
                let folder_path = self.tree.folder_path_of(&file).await?;
                Ok(TargetInfo {
                    owner_id: file.owner_id,
                    trashed: file.is_trashed(),
                    visible: FilePolicy::new(&ctx.permissions).can_view(&file, folder_path.as_ref()),
                })
            }
            ShareTarget::Folder(id) => {
                let folder = self
                    .tree_store
                    .find_folder(id)
                    .await?
                    .ok_or_else(|| Self::hidden(target))?;
                Ok(TargetInfo {
                    owner_id: folder.owner_id,
                    trashed: folder.is_trashed(),
                    visible: FolderPolicy::new(&ctx.permissions).can_view(&folder),
                })
            }
        }
    }

    /// Load a share the acting user may modify: its sharer, the resource
    /// owner, or a `share-any` holder. Anyone else is told it does not exist.
    async fn find_managed(&self, ctx: &RequestContext, share_id: ShareId) -> AppResult<Share> {
        let not_found = || AppError::not_found(format!("Share {share_id} not found"));
        let share = self.shares.find_share(share_id).await?.ok_or_else(not_found)?;
        if share.shared_by == ctx.user_id {
            return Ok(share);
        }

        let info = self.load_target(ctx, share.target).await?;
        if Self::may_manage_all(ctx, &info) {
            Ok(share)
        } else {
            Err(not_found())
        }
    }

    fn may_manage_all(ctx: &RequestContext, info: &TargetInfo) -> bool {
        ctx.permissions.owns(info.owner_id) || ctx.permissions.has(SystemPermission::ShareAny)
    }

    fn require_share_right(
        ctx: &RequestContext,
        target: ShareTarget,
        info: &TargetInfo,
    ) -> AppResult<()> {
        if Self::may_manage_all(ctx, info) {
            Ok(())
        } else if info.visible {
            Err(AppError::forbidden("Only the owner can share this resource"))
        } else {
            Err(Self::hidden(target))
        }
    }

    fn check_shareable(target: ShareTarget, info: &TargetInfo) -> AppResult<()> {
        if info.trashed {
            return Err(AppError::validation(format!(
                "{} is in the trash and cannot be shared",
                Self::describe(target)
            )));
        }
        Ok(())
    }

    fn check_expiry(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> AppResult<()> {
        match expires_at {
            Some(at) if at <= now => Err(AppError::invalid_field(
                "expires_at",
                "Expiration must be in the future",
            )),
            _ => Ok(()),
        }
    }

    fn hidden(target: ShareTarget) -> AppError {
        AppError::not_found(format!("{} not found", Self::describe(target)))
    }

    fn describe(target: ShareTarget) -> String {
        match target {
            ShareTarget::File(id) => format!("File {id}"),
            ShareTarget::Folder(id) => format!("Folder {id}"),
        }
    }
}
