//! Per-record request lanes.
//!
//! Writes against one book id queue on a fair async mutex, so their
//! apply / confirm / rollback cycles run one at a time in the order they were
//! issued. Different ids never wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use catalog_kernel::BookId;

#[derive(Debug, Default)]
pub(crate) struct RecordLanes {
    lanes: Mutex<HashMap<BookId, Arc<AsyncMutex<()>>>>,
}

impl RecordLanes {
    fn map(&self) -> MutexGuard<'_, HashMap<BookId, Arc<AsyncMutex<()>>>> {
        self.lanes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Waits for every earlier writer on `id`, then holds the lane until the
    /// returned guard drops.
    pub(crate) async fn acquire(&self, id: BookId) -> LaneGuard<'_> {
        let lane = {
            let mut lanes = self.map();
            Arc::clone(
                lanes
                    .entry(id)
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };
        let guard = lane.lock_owned().await;

        LaneGuard {
            id,
            lanes: self,
            guard: Some(guard),
        }
    }

    /// True while a write on `id` is running or queued.
    pub(crate) fn is_pending(&self, id: BookId) -> bool {
        self.map()
            .get(&id)
            .is_some_and(|lane| Arc::strong_count(lane) > 1)
    }
}

pub(crate) struct LaneGuard<'a> {
    id: BookId,
    lanes: &'a RecordLanes,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for LaneGuard<'_> {
    fn drop(&mut self) {
        // Release the lane before inspecting the count so the last holder
        // sees only the map's reference.
        self.guard.take();

        let mut lanes = self.lanes.map();
        if lanes
            .get(&self.id)
            .is_some_and(|lane| Arc::strong_count(lane) == 1)
        {
            lanes.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lane_is_pending_only_while_held() {
        let lanes = RecordLanes::default();
        assert!(!lanes.is_pending(1));

        let guard = lanes.acquire(1).await;
        assert!(lanes.is_pending(1));
        assert!(!lanes.is_pending(2));

        drop(guard);
        assert!(!lanes.is_pending(1));
        assert!(lanes.map().is_empty());
    }

    #[tokio::test]
    async fn different_ids_do_not_block() {
        let lanes = RecordLanes::default();
        let _one = lanes.acquire(1).await;
        let _two = lanes.acquire(2).await;
        assert!(lanes.is_pending(1));
        assert!(lanes.is_pending(2));
    }

    #[tokio::test]
    async fn same_id_waits_in_issue_order() {
        let lanes = Arc::new(RecordLanes::default());
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = lanes.acquire(7).await;

        let mut waiters = Vec::new();
        for n in 0..3 {
            let lanes = Arc::clone(&lanes);
            let order = Arc::clone(&order);
            waiters.push(tokio::spawn(async move {
                let _guard = lanes.acquire(7).await;
                order.lock().unwrap().push(n);
            }));
            // Let each waiter enqueue before the next is spawned.
            tokio::task::yield_now().await;
        }

        assert!(order.lock().unwrap().is_empty());
        drop(first);

        for waiter in waiters {
            waiter.await.unwrap();
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
        assert!(!lanes.is_pending(7));
    }
}
