//! # treevault-auth
//!
//! Authorization for TreeVault.
//!
//! ## Modules
//!
//! - `context`: the immutable per-request [`PermissionContext`] and the
//!   builder that loads it in three reads
//! - `policy`: file and folder policies mapping actions onto context queries

pub mod context;
pub mod policy;

pub use context::{AccessSource, PermissionContext, PermissionContextBuilder};
pub use policy::{FilePolicy, FolderPolicy};
