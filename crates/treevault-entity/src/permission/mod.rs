//! System-wide permissions and resource kinds.

pub mod resource;
pub mod slug;

pub use resource::ResourceType;
pub use slug::SystemPermission;
