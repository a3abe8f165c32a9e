//! Trash lifecycle and space reclamation.

pub mod engine;
pub mod reclaim;

pub use engine::{PurgeReport, TrashEngine, TrashItem};
pub use reclaim::Reclaimer;
