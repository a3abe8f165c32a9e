//! Request-scoped permission context.

pub mod builder;
pub mod permission;

pub use builder::PermissionContextBuilder;
pub use permission::{AccessSource, PermissionContext};
