//! File registration, renaming, and lookup.

pub mod service;

pub use service::{FileService, RegisterFileRequest};
