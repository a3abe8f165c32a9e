//! Request context carrying the acting user and their resolved permissions.

use chrono::{DateTime, Utc};

use treevault_auth::{PermissionContext, PermissionContextBuilder};
use treevault_core::result::AppResult;
use treevault_core::types::UserId;

/// Context for the current request.
///
/// Built once when the request enters and passed by reference into every
/// service call, so all checks of one request see the same permissions and
/// the same clock.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The acting user.
    pub user_id: UserId,
    /// When the request was received. Used for trash markers and share expiry.
    pub request_time: DateTime<Utc>,
    /// The user's permissions, loaded once for this request.
    pub permissions: PermissionContext,
}

impl RequestContext {
    /// Wrap an already built permission context.
    pub fn new(permissions: PermissionContext, request_time: DateTime<Utc>) -> Self {
        Self {
            user_id: permissions.user_id(),
            request_time,
            permissions,
        }
    }

    /// Load the user's permissions as of now.
    pub async fn load(builder: &PermissionContextBuilder, user_id: UserId) -> AppResult<Self> {
        Self::load_at(builder, user_id, Utc::now()).await
    }

    /// Load the user's permissions as of `now`.
    pub async fn load_at(
        builder: &PermissionContextBuilder,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let permissions = builder.build(user_id, now).await?;
        Ok(Self::new(permissions, now))
    }
}
