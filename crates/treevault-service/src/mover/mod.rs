//! Moving files and folders within the tree.

pub mod boundary;
pub mod engine;

pub use boundary::assert_subtree_boundary;
pub use engine::{MoveEngine, MoveItem, MoveReport};
