//! Folder management and tree traversal.

pub mod service;
pub mod tree;

pub use service::FolderService;
pub use tree::{MAX_ANCESTOR_DEPTH, PathTree, Subtree};
