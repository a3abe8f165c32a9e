//! Loads a [`PermissionContext`] in exactly three reads.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use treevault_core::result::AppResult;
use treevault_core::types::UserId;
use treevault_database::store::ShareStore;

use super::permission::PermissionContext;

/// Builds permission contexts from the share store.
#[derive(Debug, Clone)]
pub struct PermissionContextBuilder {
    store: Arc<dyn ShareStore>,
}

impl PermissionContextBuilder {
    /// Creates a new builder.
    pub fn new(store: Arc<dyn ShareStore>) -> Self {
        Self { store }
    }

    /// Load the user's role permissions, direct file shares, and folder
    /// shares (with paths) as of `now`.
    ///
    /// The three reads run concurrently. Shares expiring after `now` but
    /// before the request ends stay valid for the rest of the request.
    pub async fn build(&self, user_id: UserId, now: DateTime<Utc>) -> AppResult<PermissionContext> {
        let (slugs, file_grants, folder_grants) = tokio::try_join!(
            self.store.find_permission_slugs(user_id),
            self.store.find_file_grants(user_id, now),
            self.store.find_folder_grants(user_id, now),
        )?;

        debug!(
            user_id = %user_id,
            permissions = slugs.len(),
            file_shares = file_grants.len(),
            folder_shares = folder_grants.len(),
            "Permission context loaded"
        );

        Ok(PermissionContext::new(
            user_id,
            slugs,
            file_grants,
            folder_grants,
        ))
    }
}
