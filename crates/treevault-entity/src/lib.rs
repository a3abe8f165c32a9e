//! # treevault-entity
//!
//! Domain entity models for TreeVault. Every struct in this crate
//! represents a database table row or a domain value object. Row types
//! implement `sqlx::FromRow`; lifecycle columns are folded into the
//! [`lifecycle::ResourceState`] variant at the row boundary.

pub mod event;
pub mod file;
pub mod folder;
pub mod lifecycle;
pub mod permission;
pub mod share;
