//! # Persistent Storage
//!
//! Disk-backed implementations of `ProgressStore`.

pub mod file_store;
pub mod redb_store;

pub use file_store::FileStore;
pub use redb_store::RedbStore;
