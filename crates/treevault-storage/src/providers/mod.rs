//! Object store implementations.

pub mod local;
pub mod memory;

pub use local::LocalObjectStore;
pub use memory::MemoryObjectStore;

use treevault_core::AppError;

/// Reject keys that could escape the storage root.
pub(crate) fn validate_key(key: &str) -> Result<(), AppError> {
    let valid = !key.is_empty()
        && key.len() <= 255
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(AppError::invalid_field(
            "key",
            format!("Invalid object key '{key}'"),
        ))
    }
}
