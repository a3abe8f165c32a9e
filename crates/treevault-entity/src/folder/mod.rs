//! Folder domain entities.

pub mod model;
pub mod path;

pub use model::{Folder, NewFolder};
pub use path::MaterializedPath;
