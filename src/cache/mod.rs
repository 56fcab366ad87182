//! Response Cache for External Calls
//!
//! This module memoizes the results of expensive, non-deterministic external
//! calls (oracle completions, search queries, page extraction) so that an
//! identical request is dispatched at most once.
//!
//! # Layers
//!
//! - **Hot layer**: an in-memory map guarded by `parking_lot::RwLock`. It is
//!   authoritative for the lifetime of the process.
//! - **Durable layer**: any [`CacheStore`] (normally
//!   [`LibsqlStore`](crate::db::LibsqlStore)). Writes reach it through a
//!   single background writer task in the order `put` was called.
//!
//! A `put` returns as soon as the hot layer is updated; a subsequent `get` with
//! the same key sees the new value even if the durable commit has not landed.
//! Durable failures are logged and swallowed, so persistence across restarts
//! is best-effort.
//!
//! # Cache Key Strategy
//!
//! Keys are SHA-256 hashes over the operation kind and every parameter that
//! defines the request, separated by a unit separator byte so that
//! `("ab", "c")` and `("a", "bc")` never collide.
//!
//! # Example
//!
//! ```ignore
//! use deepsearch::cache::{ResponseCache, compute_key};
//!
//! let cache = ResponseCache::open(store);
//! let key = compute_key("search", &["duckduckgo", "rust async", "3"]);
//! if cache.get(&key).await.is_none() {
//!     cache.put(&key, serde_json::json!(["https://tokio.rs"]));
//! }
//! cache.close().await;
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::types::Result;

// ============================================================================
// Durable Store Trait
// ============================================================================

/// Narrow interface to persistent key-value storage.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Load the value stored under `key`, if any
    async fn load(&self, key: &str) -> Result<Option<Value>>;

    /// Insert or replace the value stored under `key`
    async fn store(&self, key: &str, value: &Value, written_at: DateTime<Utc>) -> Result<()>;
}

/// A store that persists nothing. Used when durability is disabled.
#[derive(Debug, Default)]
pub struct NullStore;

#[async_trait]
impl CacheStore for NullStore {
    async fn load(&self, _key: &str) -> Result<Option<Value>> {
        Ok(None)
    }

    async fn store(&self, _key: &str, _value: &Value, _written_at: DateTime<Utc>) -> Result<()> {
        Ok(())
    }
}

/// Compute a cache key from an operation kind and its parameters.
pub fn compute_key(kind: &str, parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_bytes());
    for part in parts {
        hasher.update([0x1f]);
        hasher.update(part.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// Cache Types
// ============================================================================

/// A memoized result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: Value,
    pub written_at: DateTime<Utc>,
}

/// Statistics for cache performance monitoring
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups answered from the hot or durable layer
    pub hits: u64,
    /// Lookups that found nothing
    pub misses: u64,
    /// Entries in the hot layer
    pub entry_count: usize,
    /// Puts not yet committed to the durable layer
    pub pending_writes: u64,
    /// Durable commits that failed and were dropped
    pub failed_writes: u64,
}

impl CacheStats {
    /// Calculate hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

enum WriterMsg {
    Write(CacheEntry),
    Flush(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    pending: AtomicU64,
    failed: AtomicU64,
}

// ============================================================================
// Write-Behind Cache
// ============================================================================

/// Process-wide memoization cache with write-behind persistence.
///
/// Cheap to share: wrap in `Arc` and hand the same instance to every session.
pub struct ResponseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    store: Arc<dyn CacheStore>,
    writer: Option<mpsc::UnboundedSender<WriterMsg>>,
    counters: Arc<Counters>,
}

impl ResponseCache {
    /// Open a cache over `store` and start its background writer.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(store: Arc<dyn CacheStore>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());
        tokio::spawn(run_writer(Arc::clone(&store), rx, Arc::clone(&counters)));

        Self {
            entries: RwLock::new(HashMap::new()),
            store,
            writer: Some(tx),
            counters,
        }
    }

    /// A cache with only the hot layer. Nothing survives the process.
    pub fn in_memory() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            store: Arc::new(NullStore),
            writer: None,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Look up `key`, falling through to the durable layer on a hot miss.
    pub async fn get(&self, key: &str) -> Option<Value> {
        if let Some(entry) = self.entries.read().get(key) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            return Some(entry.value.clone());
        }

        match self.store.load(key).await {
            Ok(Some(value)) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                // A put racing with this load wins; never clobber a newer value.
                let mut entries = self.entries.write();
                let entry = entries.entry(key.to_string()).or_insert_with(|| CacheEntry {
                    key: key.to_string(),
                    value,
                    written_at: Utc::now(),
                });
                Some(entry.value.clone())
            }
            Ok(None) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                warn!(error = %e, "Durable cache read failed, treating as miss");
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Record `value` under `key`. Returns once the hot layer holds it.
    pub fn put(&self, key: &str, value: Value) {
        let entry = CacheEntry {
            key: key.to_string(),
            value,
            written_at: Utc::now(),
        };
        self.entries.write().insert(key.to_string(), entry.clone());

        if let Some(writer) = &self.writer {
            self.counters.pending.fetch_add(1, Ordering::Relaxed);
            if writer.send(WriterMsg::Write(entry)).is_err() {
                self.counters.pending.fetch_sub(1, Ordering::Relaxed);
                debug!(key, "Cache writer closed, value kept in memory only");
            }
        }
    }

    /// Wait until every put issued so far has been committed (or dropped).
    pub async fn flush(&self) {
        let Some(writer) = &self.writer else {
            return;
        };
        let (ack_tx, ack_rx) = oneshot::channel();
        if writer.send(WriterMsg::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Drain pending writes and stop the background writer.
    ///
    /// Puts after `close` still update the hot layer.
    pub async fn close(&self) {
        let Some(writer) = &self.writer else {
            return;
        };
        let (ack_tx, ack_rx) = oneshot::channel();
        if writer.send(WriterMsg::Shutdown(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            entry_count: self.entries.read().len(),
            pending_writes: self.counters.pending.load(Ordering::Relaxed),
            failed_writes: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Number of entries in the hot layer
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the hot layer is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

async fn run_writer(
    store: Arc<dyn CacheStore>,
    mut rx: mpsc::UnboundedReceiver<WriterMsg>,
    counters: Arc<Counters>,
) {
    while let Some(msg) = rx.recv().await {
        match msg {
            WriterMsg::Write(entry) => commit(store.as_ref(), &counters, entry).await,
            WriterMsg::Flush(ack) => {
                let _ = ack.send(());
            }
            WriterMsg::Shutdown(ack) => {
                rx.close();
                // Commit whatever raced in before the channel closed.
                while let Some(msg) = rx.recv().await {
                    match msg {
                        WriterMsg::Write(entry) => commit(store.as_ref(), &counters, entry).await,
                        WriterMsg::Flush(other) | WriterMsg::Shutdown(other) => {
                            let _ = other.send(());
                        }
                    }
                }
                let _ = ack.send(());
                break;
            }
        }
    }
    debug!("Cache writer stopped");
}

async fn commit(store: &dyn CacheStore, counters: &Counters, entry: CacheEntry) {
    if let Err(e) = store.store(&entry.key, &entry.value, entry.written_at).await {
        error!(key = %entry.key, error = %e, "Failed to persist cache entry");
        counters.failed.fetch_add(1, Ordering::Relaxed);
    }
    counters.pending.fetch_sub(1, Ordering::Relaxed);
}
