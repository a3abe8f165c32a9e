//! Core type definitions used across the TreeVault workspace.

pub mod id;

pub use id::*;
