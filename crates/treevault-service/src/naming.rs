//! Name rules shared by files and folders.

use treevault_core::AppError;
use treevault_core::result::AppResult;

/// Longest accepted file or folder name, in characters.
pub const MAX_NAME_LENGTH: usize = 255;

/// Validate a file or folder name and return it trimmed.
pub fn validate_name(name: &str) -> AppResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_field("name", "Name cannot be empty"));
    }
    if trimmed.contains('/') {
        return Err(AppError::invalid_field("name", "Name cannot contain '/'"));
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(AppError::invalid_field(
            "name",
            format!("Name exceeds {MAX_NAME_LENGTH} characters"),
        ));
    }
    if trimmed == "." || trimmed == ".." {
        return Err(AppError::invalid_field("name", format!("'{trimmed}' is reserved")));
    }
    Ok(trimmed.to_string())
}

/// Error for a name already used by a sibling, trashed or not.
pub fn name_taken(name: &str) -> AppError {
    AppError::invalid_field(
        "name",
        format!("An item named '{name}' already exists in the destination"),
    )
}
