//! # treevault-storage
//!
//! Object storage for TreeVault. The tree core only removes objects, so
//! the providers here implement the narrow
//! [`ObjectStore`](treevault_core::traits::ObjectStore) contract, and the
//! [`janitor`] runs those deletions off the request path.

pub mod janitor;
pub mod providers;

pub use janitor::StorageJanitor;
pub use providers::{LocalObjectStore, MemoryObjectStore};
