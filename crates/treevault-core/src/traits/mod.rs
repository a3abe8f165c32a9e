//! Collaborator traits defined in `treevault-core` and implemented by other crates.

pub mod quota;
pub mod storage;

pub use quota::QuotaLedger;
pub use storage::ObjectStore;
