//! # treevault-database
//!
//! PostgreSQL connection management, the [`store`] traits the tree core
//! reads and writes through, and two implementations of them: the sqlx
//! repositories in [`repositories`] and the in-process [`store::memory`]
//! store used by tests and single-node development.

pub mod connection;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use store::{Changeset, Mutation, ShareStore, TreeStore};
