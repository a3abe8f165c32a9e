//! Job implementations run by the scheduler.

pub mod trash_purge;

pub use trash_purge::TrashPurgeJob;
