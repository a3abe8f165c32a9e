//! Sync event repository implementation.

use sqlx::{PgConnection, PgPool};

use treevault_core::result::AppResult;
use treevault_core::types::SyncEventId;
use treevault_entity::event::{NewSyncEvent, SyncEvent};
use treevault_entity::permission::ResourceType;

use super::{read_error, write_error};

/// Repository for the append-only sync event log.
#[derive(Debug, Clone)]
pub struct SyncEventRepository {
    pool: PgPool,
}

impl SyncEventRepository {
    /// Create a new sync event repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Events for one resource, oldest first.
    pub async fn find_by_resource(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
    ) -> AppResult<Vec<SyncEvent>> {
        sqlx::query_as::<_, SyncEvent>(
            "SELECT * FROM sync_events WHERE resource_type = $1 AND resource_id = $2 \
             ORDER BY created_at ASC, id ASC",
        )
        .bind(resource_type)
        .bind(resource_id)
        .fetch_all(&self.pool)
        .await
        .map_err(read_error("Failed to list sync events"))
    }

    /// Append an event inside the caller's transaction.
    pub async fn insert(conn: &mut PgConnection, event: &NewSyncEvent) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO sync_events (id, user_id, action, resource_type, resource_id, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(SyncEventId(uuid::Uuid::now_v7()))
        .bind(event.user_id)
        .bind(event.action)
        .bind(event.resource_type)
        .bind(&event.resource_id)
        .bind(&event.metadata)
        .execute(&mut *conn)
        .await
        .map_err(write_error("Failed to record sync event"))?;
        Ok(())
    }
}
