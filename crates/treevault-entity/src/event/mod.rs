//! Sync/audit event entities.

pub mod model;

pub use model::{NewSyncEvent, SyncAction, SyncEvent};
