//! Project-scoped broadcast signal, §4.2.3 / §4.6 / §9.
//!
//! "Publish never blocks, multiple subscribers" — backed by
//! `tokio::sync::broadcast`, one channel per project, created lazily. Publish
//! is fire-and-forget: if there are no subscribers the send is simply
//! dropped, which is correct since broadcast is best-effort and waiters
//! always re-query state on wake (spurious-wake-tolerant, §9).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, Semaphore};

const CHANNEL_CAPACITY: usize = 256;

struct ProjectChannel {
    sender: broadcast::Sender<()>,
    /// Caps concurrent waiters per project so the server can shed load by
    /// returning immediately instead of queuing indefinitely (§9).
    waiter_permits: Arc<Semaphore>,
}

/// Shared, cloneable handle to the process-wide wake hub.
#[derive(Clone)]
pub struct WakeHub {
    inner: Arc<std::sync::Mutex<HashMap<i64, ProjectChannel>>>,
    waiter_cap: usize,
}

/// A permit proving this waiter was admitted under the per-project cap; drop
/// to release the slot.
pub struct WaitPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}

impl WakeHub {
    pub fn new(waiter_cap: usize) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(HashMap::new())),
            waiter_cap,
        }
    }

    fn channel(&self, project_id: i64) -> (broadcast::Sender<()>, Arc<Semaphore>) {
        let mut guard = self.inner.lock().expect("wake hub mutex poisoned");
        let entry = guard.entry(project_id).or_insert_with(|| {
            let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
            ProjectChannel {
                sender,
                waiter_permits: Arc::new(Semaphore::new(self.waiter_cap)),
            }
        });
        (entry.sender.clone(), entry.waiter_permits.clone())
    }

    /// Notify all current subscribers of `project_id` that something may
    /// have changed. Never blocks; lagging/absent subscribers are fine.
    pub fn publish(&self, project_id: i64) {
        let (sender, _) = self.channel(project_id);
        let _ = sender.send(());
    }

    /// Attempt to reserve a waiter slot for `project_id`. Returns `None` if
    /// the project is already at its waiter cap — the caller should shed
    /// load by returning an immediate empty/"waiting" result.
    pub fn try_admit(&self, project_id: i64) -> Option<(broadcast::Receiver<()>, WaitPermit)> {
        let (sender, permits) = self.channel(project_id);
        let permit = permits.try_acquire_owned().ok()?;
        Some((
            sender.subscribe(),
            WaitPermit { _permit: permit },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn subscriber_wakes_on_publish() {
        let hub = WakeHub::new(10);
        let (mut rx, _permit) = hub.try_admit(1).unwrap();
        hub.publish(1);
        tokio::time::timeout(Duration::from_millis(200), rx.recv())
            .await
            .expect("should wake promptly")
            .unwrap();
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_block_or_panic() {
        let hub = WakeHub::new(10);
        hub.publish(42);
    }

    #[tokio::test]
    async fn waiter_cap_sheds_load() {
        let hub = WakeHub::new(1);
        let _first = hub.try_admit(1).unwrap();
        assert!(hub.try_admit(1).is_none());
        // a different project is unaffected
        assert!(hub.try_admit(2).is_some());
    }
}
