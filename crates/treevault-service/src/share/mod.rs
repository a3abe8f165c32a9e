//! Share management: user shares, guest links, and revocation.

pub mod link;
pub mod service;

pub use service::{GuestLink, ShareRequest, ShareService, UpdateShareRequest};
