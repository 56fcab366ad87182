//! Durable storage for the response cache.
//!
//! The cache only needs a narrow key-value interface
//! ([`CacheStore`](crate::cache::CacheStore)); this module provides the
//! libsql-backed implementation used by the binary. Local files and
//! in-memory databases are both supported.

/// libsql (SQLite) cache store.
pub mod cache_store;

pub use cache_store::LibsqlStore;
