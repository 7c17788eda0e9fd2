//! In-process per-instance locks.
//!
//! Start/stop commands for one provider instance run one at a time, whether
//! they come from a request handler or a lifecycle job.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Map of provider instance id to its command lock.
#[derive(Debug, Clone, Default)]
pub struct InstanceLocks {
    inner: Arc<DashMap<i64, Arc<Mutex<()>>>>,
}

impl InstanceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `instance_id`; released when the guard drops.
    pub async fn acquire(&self, instance_id: i64) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the shard lock is not held across the await
        let lock = self
            .inner
            .entry(instance_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Number of instances that have been locked at least once.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
