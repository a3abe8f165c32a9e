//! # treevault-service
//!
//! Use cases of the TreeVault core. Each service orchestrates the tree and
//! share stores, the resource policies, quota accounting, and the storage
//! janitor.
//!
//! Services follow constructor injection: all collaborators are provided
//! at construction time as `Arc` trait objects, and every operation takes
//! the caller's [`RequestContext`].

pub mod context;
pub mod file;
pub mod folder;
pub mod mover;
pub mod naming;
pub mod registry;
pub mod share;
pub mod trash;

pub use context::RequestContext;
pub use file::{FileService, RegisterFileRequest};
pub use folder::{FolderService, MAX_ANCESTOR_DEPTH, PathTree, Subtree};
pub use mover::{MoveEngine, MoveItem, MoveReport};
pub use registry::Services;
pub use share::{GuestLink, ShareRequest, ShareService, UpdateShareRequest};
pub use trash::{PurgeReport, TrashEngine, TrashItem};
