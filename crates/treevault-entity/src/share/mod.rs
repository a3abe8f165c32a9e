//! Share domain entities.

pub mod grant;
pub mod model;
pub mod permission;

pub use grant::{FileShareGrant, FolderShareGrant};
pub use model::{Share, ShareTarget, UpsertShare};
pub use permission::SharePermission;
