//! Process-wide named locks for cache namespaces
//!
//! Every namespace id maps to one async mutex for the lifetime of the
//! process. This serializes pipelines within one process only; separate
//! processes sharing a cache directory are not coordinated.

use parking_lot::{const_mutex, Mutex};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

/// Lock guarding one cache namespace
pub type NamespaceLock = Arc<AsyncMutex<()>>;

static NAMESPACE_LOCKS: Mutex<BTreeMap<String, NamespaceLock>> = const_mutex(BTreeMap::new());

/// Get the lock for a namespace id, creating it on first use
pub fn namespace_lock(id: &str) -> NamespaceLock {
    let mut locks = NAMESPACE_LOCKS.lock();
    locks
        .entry(id.to_string())
        .or_insert_with(|| Arc::new(AsyncMutex::new(())))
        .clone()
}
