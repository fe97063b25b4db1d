// Time-to-live snapshot cache in front of a `SnapshotProvider`.
//
// Readers share the current `Arc<Snapshot>` through an RwLock. Refreshes are
// serialized by a separate mutex and re-check freshness after acquiring it,
// so concurrent callers that find the cache stale trigger a single fetch.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::model::{EntrySquad, Snapshot};
use crate::provider::{ProviderError, SnapshotProvider};

struct CachedSnapshot {
    snapshot: Arc<Snapshot>,
    loaded_at: Instant,
}

pub struct SnapshotCache {
    provider: Box<dyn SnapshotProvider>,
    ttl: Duration,
    state: RwLock<Option<CachedSnapshot>>,
    refresh: Mutex<()>,
}

impl SnapshotCache {
    pub fn new(provider: Box<dyn SnapshotProvider>, ttl: Duration) -> Self {
        Self {
            provider,
            ttl,
            state: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    /// Return the cached snapshot, fetching a new one if it is missing or
    /// older than the TTL.
    pub async fn get(&self) -> Result<Arc<Snapshot>, ProviderError> {
        if let Some(snapshot) = self.fresh().await {
            return Ok(snapshot);
        }

        let _guard = self.refresh.lock().await;
        // Another caller may have refreshed while we waited for the lock.
        if let Some(snapshot) = self.fresh().await {
            debug!("snapshot refreshed by a concurrent caller");
            return Ok(snapshot);
        }
        self.reload().await
    }

    /// Fetch a new snapshot regardless of age. Callers that were already
    /// waiting when another forced refresh completed reuse its result.
    pub async fn force_refresh(&self) -> Result<Arc<Snapshot>, ProviderError> {
        let requested_at = Instant::now();
        let _guard = self.refresh.lock().await;
        {
            let state = self.state.read().await;
            if let Some(cached) = state.as_ref().filter(|c| c.loaded_at > requested_at) {
                return Ok(Arc::clone(&cached.snapshot));
            }
        }
        self.reload().await
    }

    /// Entries are per-user and fetched on every call.
    pub async fn fetch_entry(&self, entry_id: u64, round: u32) -> Result<EntrySquad, ProviderError> {
        self.provider.fetch_entry(entry_id, round).await
    }

    async fn fresh(&self) -> Option<Arc<Snapshot>> {
        let state = self.state.read().await;
        state
            .as_ref()
            .filter(|c| c.loaded_at.elapsed() < self.ttl)
            .map(|c| Arc::clone(&c.snapshot))
    }

    async fn reload(&self) -> Result<Arc<Snapshot>, ProviderError> {
        let snapshot = Arc::new(self.provider.fetch_snapshot().await?);
        info!(
            "Snapshot cache refreshed (round {}, fetched at {})",
            snapshot.current_round(),
            snapshot.fetched_at()
        );
        *self.state.write().await = Some(CachedSnapshot {
            snapshot: Arc::clone(&snapshot),
            loaded_at: Instant::now(),
        });
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider that counts fetches and takes 50ms per fetch.
    struct CountingProvider {
        fetches: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl SnapshotProvider for CountingProvider {
        async fn fetch_snapshot(&self) -> Result<Snapshot, ProviderError> {
            let n = self.fetches.fetch_add(1, Ordering::SeqCst) as u32;
            tokio::time::sleep(Duration::from_millis(50)).await;
            if self.fail {
                return Err(ProviderError::MissingData("source down".into()));
            }
            Ok(Snapshot::new(vec![], vec![], vec![], n + 1, Utc::now()))
        }

        async fn fetch_entry(&self, entry_id: u64, round: u32) -> Result<EntrySquad, ProviderError> {
            Ok(EntrySquad {
                entry_id,
                round,
                player_ids: vec![],
                bank: 0,
                chips_used: vec![],
            })
        }
    }

    fn cache(ttl_secs: u64, fail: bool) -> (Arc<SnapshotCache>, Arc<AtomicUsize>) {
        let fetches = Arc::new(AtomicUsize::new(0));
        let provider = CountingProvider {
            fetches: Arc::clone(&fetches),
            fail,
        };
        (
            Arc::new(SnapshotCache::new(
                Box::new(provider),
                Duration::from_secs(ttl_secs),
            )),
            fetches,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_gets_coalesce_into_one_fetch() {
        let (cache, fetches) = cache(60, false);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.get().await.map(|s| s.current_round()) })
            })
            .collect();
        let results = futures_util::future::join_all(handles).await;

        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        for r in results {
            assert_eq!(r.unwrap().unwrap(), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stale_snapshot_is_refetched_after_ttl() {
        let (cache, fetches) = cache(60, false);

        assert_eq!(cache.get().await.unwrap().current_round(), 1);
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(cache.get().await.unwrap().current_round(), 1);
        assert_eq!(fetches.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(cache.get().await.unwrap().current_round(), 2);
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn force_refresh_bypasses_ttl() {
        let (cache, fetches) = cache(3600, false);

        cache.get().await.unwrap();
        let refreshed = cache.force_refresh().await.unwrap();
        assert_eq!(refreshed.current_round(), 2);
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
        // The forced result is what later readers see.
        assert_eq!(cache.get().await.unwrap().current_round(), 2);
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn provider_errors_propagate_and_nothing_is_cached() {
        let (cache, fetches) = cache(60, true);

        let err = cache.get().await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingData(_)));

        // No retry inside the cache: the next call fetches again.
        assert!(cache.get().await.is_err());
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }
}
