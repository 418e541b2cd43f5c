//! Background sweep of expired entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::kv::KeyValueStore;

/// Periodic sweep task that prunes strictly-expired entries from a store.
///
/// The sweep runs on its own timer, decoupled from the request path, and
/// only ever removes entries whose expiry has already passed, so it is safe
/// to run concurrently with live reads and writes. The task is owned by the
/// returned [`SweeperHandle`]; dropping the handle without calling
/// [`SweeperHandle::shutdown`] aborts the task.
#[derive(Debug)]
pub struct Sweeper;

impl Sweeper {
    /// Default sweep interval.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

    /// Start sweeping `store` every `interval`.
    #[must_use]
    pub fn start(store: Arc<dyn KeyValueStore>, interval: Duration) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so a fresh store
            // isn't swept at startup.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match store.purge_expired() {
                            Ok(removed) if removed > 0 => {
                                debug!(removed, "sweep removed expired entries");
                            }
                            Ok(_) => {}
                            Err(error) => {
                                warn!(error = %error, "sweep failed, will retry next interval");
                            }
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        debug!("sweeper shutting down");
                        break;
                    }
                }
            }
        });

        SweeperHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Handle owning a running sweep task.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweep task and wait for it to finish.
    pub async fn shutdown(self) {
        // Receiver dropping also ends the loop; the send result is
        // irrelevant either way.
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }

    /// Whether the sweep task is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[tokio::test]
    async fn test_sweeper_removes_expired_entries() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        store
            .set_with_ttl("gone", "v", Duration::from_millis(10))
            .unwrap();
        store.set("stays", "v").unwrap();

        let handle = Sweeper::start(Arc::clone(&store), Duration::from_millis(30));
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(store.len().unwrap(), 1);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_sweeper_shutdown_stops_task() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let handle = Sweeper::start(store, Duration::from_millis(10));

        assert!(handle.is_running());
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_sweeper_leaves_live_entries() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        store
            .set_with_ttl("live", "v", Duration::from_secs(300))
            .unwrap();

        let handle = Sweeper::start(Arc::clone(&store), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(store.get("live").unwrap(), Some("v".to_string()));
        handle.shutdown().await;
    }
}
