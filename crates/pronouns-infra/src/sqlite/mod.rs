//! SQLite storage layer.
//!
//! Repository implementations backed by SQLite with WAL mode and split
//! read/write connection pools.

pub mod error;
pub mod identity;
pub mod pool;
pub mod preference;
