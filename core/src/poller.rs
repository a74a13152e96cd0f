/// Poller scheduler — runs independent periodic fetch loops keyed by channel
///
/// Scheduling is settle-to-settle: the interval is measured from the end of
/// the previous tick, so a slow fetch can never overlap itself on the same
/// channel. Tick failures are logged and swallowed; the next tick fires
/// regardless, with no backoff.
use crate::error::Result;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::sleep;
use tracing::{debug, warn};

/// Liveness token handed to each tick. A fetch that was in flight when the
/// loop stopped completes, but its merge must be gated on this token so the
/// result is discarded instead of landing in torn-down state.
#[derive(Clone)]
pub struct Liveness {
    stop: Arc<RwLock<bool>>,
}

impl Liveness {
    pub async fn is_live(&self) -> bool {
        !*self.stop.read().await
    }
}

struct PollerHandle {
    stop: Arc<RwLock<bool>>,
}

/// Keyed poll loops. At most one loop per key runs at a time; starting a key
/// that is already running stops the old loop first.
pub struct PollerScheduler {
    loops: Mutex<HashMap<String, PollerHandle>>,
}

impl PollerScheduler {
    pub fn new() -> Self {
        Self {
            loops: Mutex::new(HashMap::new()),
        }
    }

    pub async fn start<F, Fut>(&self, key: &str, interval: Duration, tick: F)
    where
        F: Fn(Liveness) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let mut loops = self.loops.lock().await;
        if let Some(old) = loops.remove(key) {
            debug!("Replacing running poller {}", key);
            *old.stop.write().await = true;
        }

        let stop = Arc::new(RwLock::new(false));
        let live = Liveness { stop: stop.clone() };
        let loop_key = key.to_string();

        tokio::spawn(async move {
            debug!("Poller {} started ({:?})", loop_key, interval);
            loop {
                if !live.is_live().await {
                    break;
                }
                if let Err(e) = tick(live.clone()).await {
                    warn!("Poller {} tick failed: {}", loop_key, e);
                }
                if !live.is_live().await {
                    break;
                }
                sleep(interval).await;
            }
            debug!("Poller {} stopped", loop_key);
        });

        loops.insert(key.to_string(), PollerHandle { stop });
    }

    /// Stop a loop. No further ticks fire after this returns; an already
    /// in-flight fetch finishes and its result is dropped by the liveness
    /// gate.
    pub async fn stop(&self, key: &str) {
        if let Some(handle) = self.loops.lock().await.remove(key) {
            *handle.stop.write().await = true;
            debug!("Stopping poller {}", key);
        }
    }

    pub async fn stop_all(&self) {
        let mut loops = self.loops.lock().await;
        for (key, handle) in loops.drain() {
            *handle.stop.write().await = true;
            debug!("Stopping poller {}", key);
        }
    }

    pub async fn is_running(&self, key: &str) -> bool {
        self.loops.lock().await.contains_key(key)
    }
}

impl Default for PollerScheduler {
    fn default() -> Self {
        Self::new()
    }
}
