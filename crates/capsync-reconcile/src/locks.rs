use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-subscription async mutexes.
///
/// Reconciles of the same subscription id run one at a time; different ids
/// never contend. Entries are dropped once no task holds or awaits them.
#[derive(Debug, Default)]
pub struct SubscriptionLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl SubscriptionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, subscription_id: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
            // Only the map holds a reference: nobody is waiting on it.
            map.retain(|_, m| Arc::strong_count(m) > 1);
            Arc::clone(map.entry(subscription_id.to_string()).or_default())
        };
        slot.lock_owned().await
    }

    /// Ids currently held or awaited.
    pub fn in_use(&self) -> usize {
        let map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        map.values().filter(|m| Arc::strong_count(m) > 1).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_id_is_serialized() {
        let locks = Arc::new(SubscriptionLocks::new());
        let guard = locks.lock("S1").await;

        let l2 = Arc::clone(&locks);
        let waiter = tokio::spawn(async move {
            let _g = l2.lock("S1").await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter acquires after release")
            .unwrap();
    }

    #[tokio::test]
    async fn different_ids_do_not_contend() {
        let locks = SubscriptionLocks::new();
        let _a = locks.lock("S1").await;
        let _b = tokio::time::timeout(Duration::from_secs(1), locks.lock("S2"))
            .await
            .expect("independent id must not block");
        assert_eq!(locks.in_use(), 2);
    }

    #[tokio::test]
    async fn released_entries_are_pruned() {
        let locks = SubscriptionLocks::new();
        drop(locks.lock("S1").await);
        let _b = locks.lock("S2").await;
        assert_eq!(locks.in_use(), 1);
        assert_eq!(locks.inner.lock().unwrap().len(), 1);
    }
}
