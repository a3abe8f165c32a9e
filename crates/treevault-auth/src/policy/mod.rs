//! Resource policies.
//!
//! | Action         | Requirement                                          |
//! |----------------|------------------------------------------------------|
//! | `view`         | view access                                          |
//! | `update`       | edit access                                          |
//! | `delete`       | edit access or `delete-any`                          |
//! | `restore`      | ownership or `restore-any` (shares never grant it)   |
//! | `force_delete` | ownership or `force-delete-any` (shares never grant) |
//!
//! A user who cannot even see the resource is told it does not exist. So
//! is anyone denied `restore` or `force_delete`, since trashed resources
//! are private to their owner.

pub mod file;
pub mod folder;

pub use file::FilePolicy;
pub use folder::FolderPolicy;

use treevault_core::AppError;

/// Error for a resource the user may not know about.
pub(crate) fn hidden(kind: &str, id: impl std::fmt::Display) -> AppError {
    AppError::not_found(format!("{kind} {id} not found"))
}

/// Error for a visible resource the user may not change.
pub(crate) fn denied(action: &str, kind: &str, id: impl std::fmt::Display) -> AppError {
    AppError::forbidden(format!("Not allowed to {action} {kind} {id}"))
}
