//! Concrete PostgreSQL repositories, one per table group.
//!
//! Reads go through the pool held by each repository. Writes that take part
//! in a changeset are associated functions taking a `&mut PgConnection`, so
//! the caller decides the transaction boundary.

pub mod file;
pub mod folder;
pub mod permission;
pub mod quota;
pub mod share;
pub mod sync_event;

pub use file::FileRepository;
pub use folder::FolderRepository;
pub use permission::PermissionRepository;
pub use quota::QuotaRepository;
pub use share::ShareRepository;
pub use sync_event::SyncEventRepository;

use treevault_core::error::{AppError, ErrorKind};

/// Map a write failure, turning unique violations into conflicts.
pub(crate) fn write_error(message: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| {
        let unique = e
            .as_database_error()
            .map(|db| db.is_unique_violation())
            .unwrap_or(false);
        if unique {
            AppError::with_source(ErrorKind::Conflict, format!("{message}: name already taken"), e)
        } else {
            AppError::with_source(ErrorKind::Database, message, e)
        }
    }
}

/// Map a read failure.
pub(crate) fn read_error(message: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, message, e)
}
