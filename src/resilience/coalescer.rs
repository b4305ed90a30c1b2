//! Single-flight request coalescing.
//!
//! Concurrent callers that ask for the same key share one in-flight
//! computation. The computation runs on its own task, so dropping the caller
//! that started it does not abort the work other callers are waiting on; the
//! task removes the pending entry itself once it settles.

use crate::{Error, ErrorContext, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

type SharedOutcome<V> = Shared<BoxFuture<'static, Result<V>>>;

struct Pending<V: Clone> {
    id: u64,
    outcome: SharedOutcome<V>,
}

type PendingTable<K, V> = Arc<Mutex<HashMap<K, Pending<V>>>>;

/// Removes the pending entry when the computation finishes, fails or unwinds.
struct PendingGuard<K: Eq + Hash, V: Clone> {
    table: PendingTable<K, V>,
    key: K,
    id: u64,
}

impl<K: Eq + Hash, V: Clone> Drop for PendingGuard<K, V> {
    fn drop(&mut self) {
        // a poisoned table has nothing left to clean up
        if let Ok(mut table) = self.table.lock() {
            if table.get(&self.key).map(|p| p.id) == Some(self.id) {
                table.remove(&self.key);
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoalescerStats {
    /// Computations actually started.
    pub started: u64,
    /// Calls that joined an existing computation.
    pub joined: u64,
}

/// At most one in-flight computation per key.
pub struct Coalescer<K: Eq + Hash, V: Clone> {
    pending: PendingTable<K, V>,
    next_id: AtomicU64,
    started: AtomicU64,
    joined: AtomicU64,
}

impl<K: Eq + Hash, V: Clone> Default for Coalescer<K, V> {
    fn default() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
            started: AtomicU64::new(0),
            joined: AtomicU64::new(0),
        }
    }
}

impl<K, V> Coalescer<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> Result<MutexGuard<'_, HashMap<K, Pending<V>>>> {
        self.pending.lock().map_err(|_| {
            Error::runtime_with_context(
                "coalescer table poisoned",
                ErrorContext::new().with_source("coalescer"),
            )
        })
    }

    /// Run `work` for `key`, or wait for the run already in flight.
    ///
    /// Every caller attached to one run receives a clone of the same outcome.
    /// `work` is invoked only by the caller that creates the pending entry,
    /// on a spawned task (a tokio runtime is required).
    pub async fn handle<F, Fut>(&self, key: K, work: F) -> Result<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let outcome = {
            // check-and-insert: no await while the table is held
            let mut table = self.table()?;
            if let Some(pending) = table.get(&key) {
                debug!(key = ?key, "joining in-flight request");
                self.joined.fetch_add(1, Ordering::Relaxed);
                pending.outcome.clone()
            } else {
                debug!(key = ?key, "starting new request");
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let guard = PendingGuard {
                    table: Arc::clone(&self.pending),
                    key: key.clone(),
                    id,
                };
                let task = tokio::spawn(async move {
                    let _guard = guard;
                    work().await
                });
                let outcome: SharedOutcome<V> = async move {
                    match task.await {
                        Ok(result) => result,
                        Err(e) => Err(Error::runtime_with_context(
                            "coalesced computation did not complete",
                            ErrorContext::new()
                                .with_details(e.to_string())
                                .with_source("coalescer"),
                        )),
                    }
                }
                .boxed()
                .shared();
                table.insert(
                    key,
                    Pending {
                        id,
                        outcome: outcome.clone(),
                    },
                );
                self.started.fetch_add(1, Ordering::Relaxed);
                outcome
            }
        };
        outcome.await
    }

    /// Whether a computation for `key` is currently in flight.
    pub fn is_pending(&self, key: &K) -> bool {
        self.table().map(|t| t.contains_key(key)).unwrap_or(false)
    }

    pub fn pending_count(&self) -> usize {
        self.table().map(|t| t.len()).unwrap_or(0)
    }

    pub fn stats(&self) -> CoalescerStats {
        CoalescerStats {
            started: self.started.load(Ordering::Relaxed),
            joined: self.joined.load(Ordering::Relaxed),
        }
    }
}
