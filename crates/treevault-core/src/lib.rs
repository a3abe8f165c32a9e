//! # treevault-core
//!
//! Core crate for TreeVault. Contains the collaborator traits (object
//! storage, quota accounting), configuration schemas, typed identifiers,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other TreeVault crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
