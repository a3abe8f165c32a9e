//! Object storage collaborator trait.

use async_trait::async_trait;

use crate::result::AppResult;

/// Narrow contract with the object storage backend.
///
/// The tree core only ever removes objects; uploads and downloads live in
/// other services. Implementations exist for the local filesystem and for
/// an in-process map (tests).
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local", "memory").
    fn provider_type(&self) -> &str;

    /// Delete the object stored under `key`.
    ///
    /// Must be idempotent: a missing object is not an error.
    async fn delete_object(&self, key: &str) -> AppResult<()>;

    /// Check whether the provider is healthy and reachable.
    async fn health_check(&self) -> AppResult<bool>;
}
