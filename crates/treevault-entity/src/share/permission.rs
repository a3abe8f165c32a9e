//! Share permission levels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Permission level granted by a share.
///
/// Declaration order is privilege order: `Edit` is strictly more
/// permissive than `View`, so `Ord` can be used to compare levels.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "share_permission", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SharePermission {
    /// Read-only access.
    View,
    /// Read and write access.
    Edit,
}

impl SharePermission {
    /// Check if this permission grants at least the given level.
    pub fn satisfies(&self, required: SharePermission) -> bool {
        *self >= required
    }

    /// Return the permission as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Edit => "edit",
        }
    }
}

impl fmt::Display for SharePermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SharePermission {
    type Err = treevault_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "view" => Ok(Self::View),
            "edit" => Ok(Self::Edit),
            _ => Err(treevault_core::AppError::invalid_field(
                "permission",
                format!("Invalid share permission: '{s}'"),
            )),
        }
    }
}
