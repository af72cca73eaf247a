//! Pending incoming calls, retained briefly so clients can reject them.
//!
//! Call handles cannot be re-resolved from an id later, so the handle from
//! the engine's call event is parked here under the call id. Entries expire
//! after the configured TTL; a background sweeper reclaims memory for
//! entries nobody ever takes, and `take` double-checks the deadline so an
//! expired entry is never returned even between sweeps.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use chatwire_core::provider::CallRef;

struct PendingEntry {
    handle: Arc<dyn CallRef>,
    expires_at: Instant,
}

struct Inner {
    ttl: Duration,
    entries: Mutex<HashMap<String, PendingEntry>>,
}

/// TTL-bounded map of call id to rejectable call handle.
pub struct PendingCalls {
    inner: Arc<Inner>,
}

impl PendingCalls {
    pub fn new(ttl: Duration, sweep_interval: Duration) -> Self {
        let inner = Arc::new(Inner {
            ttl,
            entries: Mutex::new(HashMap::new()),
        });

        let weak: Weak<Inner> = Arc::downgrade(&inner);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(sweep_interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tick.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let now = Instant::now();
                let mut entries = inner.entries.lock().unwrap();
                let before = entries.len();
                entries.retain(|_, entry| entry.expires_at > now);
                let swept = before - entries.len();
                if swept > 0 {
                    debug!(swept, "expired pending calls");
                }
            }
        });

        Self { inner }
    }

    /// Park a call handle under its id. A second call with the same id
    /// replaces the entry and resets the deadline.
    pub fn put(&self, call_id: String, handle: Arc<dyn CallRef>) {
        let entry = PendingEntry {
            handle,
            expires_at: Instant::now() + self.inner.ttl,
        };
        self.inner.entries.lock().unwrap().insert(call_id, entry);
    }

    /// Remove and return the handle for `call_id`, if present and not yet
    /// expired.
    pub fn take(&self, call_id: &str) -> Option<Arc<dyn CallRef>> {
        let mut entries = self.inner.entries.lock().unwrap();
        let entry = entries.remove(call_id)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some(entry.handle)
    }

    pub fn len(&self) -> usize {
        self.inner.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FakeCall;

    #[async_trait]
    impl CallRef for FakeCall {
        async fn reject(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_put_take() {
        let calls = PendingCalls::new(Duration::from_secs(60), Duration::from_secs(30));
        calls.put("call-1".into(), Arc::new(FakeCall));

        assert!(calls.take("call-1").is_some());
        // consumed on take
        assert!(calls.take("call-1").is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_take_consumes_once() {
        let calls = Arc::new(PendingCalls::new(
            Duration::from_secs(60),
            Duration::from_secs(30),
        ));
        calls.put("call-1".into(), Arc::new(FakeCall));

        let first = {
            let calls = calls.clone();
            tokio::spawn(async move { calls.take("call-1").is_some() })
        };
        let second = {
            let calls = calls.clone();
            tokio::spawn(async move { calls.take("call-1").is_some() })
        };

        let hits = [first.await.unwrap(), second.await.unwrap()]
            .into_iter()
            .filter(|hit| *hit)
            .count();
        assert_eq!(hits, 1);
    }

    #[tokio::test]
    async fn test_take_unknown() {
        let calls = PendingCalls::new(Duration::from_secs(60), Duration::from_secs(30));
        assert!(calls.take("nope").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_not_returned() {
        let calls = PendingCalls::new(Duration::from_secs(60), Duration::from_secs(3600));
        calls.put("call-1".into(), Arc::new(FakeCall));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(calls.take("call-1").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_reclaims() {
        let calls = PendingCalls::new(Duration::from_secs(60), Duration::from_secs(30));
        calls.put("call-1".into(), Arc::new(FakeCall));
        assert_eq!(calls.len(), 1);

        tokio::time::advance(Duration::from_secs(120)).await;
        // let the sweeper task run
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(calls.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_resets_deadline() {
        let calls = PendingCalls::new(Duration::from_secs(60), Duration::from_secs(3600));
        calls.put("call-1".into(), Arc::new(FakeCall));

        tokio::time::advance(Duration::from_secs(50)).await;
        calls.put("call-1".into(), Arc::new(FakeCall));

        tokio::time::advance(Duration::from_secs(50)).await;
        assert!(calls.take("call-1").is_some());
    }
}
