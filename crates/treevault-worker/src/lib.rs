//! Scheduled background tasks for TreeVault.
//!
//! This crate provides:
//! - A cron scheduler that registers the periodic tasks
//! - The trash purge job run by the scheduler

pub mod jobs;
pub mod scheduler;

pub use jobs::TrashPurgeJob;
pub use scheduler::CronScheduler;
