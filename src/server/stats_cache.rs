//! Memoized all-time statistics for `GET /stats`.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::protocol::AllTimeStats;
use crate::store::{GameStore, StoreError};

/// Single-writer cache: concurrent readers during a refresh wait on the one
/// in-flight query instead of stampeding the store.
pub(super) struct StatsCache {
    ttl: Duration,
    inner: Mutex<Option<(Instant, AllTimeStats)>>,
}

impl StatsCache {
    pub(super) fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(None),
        }
    }

    pub(super) async fn get_or_refresh(
        &self,
        store: &dyn GameStore,
    ) -> Result<AllTimeStats, StoreError> {
        let mut guard = self.inner.lock().await;
        if let Some((fetched_at, stats)) = *guard {
            if fetched_at.elapsed() < self.ttl {
                return Ok(stats);
            }
        }
        let stats = store.all_time_stats().await?;
        *guard = Some((Instant::now(), stats));
        Ok(stats)
    }
}

impl super::GameServer {
    /// All-time statistics, memoized for the cache TTL.
    pub async fn all_time_stats(&self) -> Result<AllTimeStats, StoreError> {
        self.stats_cache.get_or_refresh(self.store.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::config::RootConfig;
    use crate::domain::DeathmatchRules;
    use crate::store::MemStore;

    use super::*;

    fn make_store() -> Arc<MemStore> {
        Arc::new(MemStore::new(RootConfig {
            root_id: uuid::Uuid::new_v4(),
            root_name: "root".into(),
            lobby_id: 1,
            lobby_name: "lobby".into(),
        }))
    }

    #[tokio::test]
    async fn test_cached_value_served_within_ttl() {
        let store = make_store();
        store.initialize().await.unwrap();
        let cache = StatsCache::new(Duration::from_secs(30));

        let before = cache.get_or_refresh(store.as_ref()).await.unwrap();
        assert_eq!(before.total_games, 0);

        // A game finishing does not show up until the TTL lapses.
        let player = store.create_player("alice").await.unwrap();
        let room = store.create_room("quick").await.unwrap();
        let game_id = store
            .create_game(room.id, &DeathmatchRules::default(), &[player.id])
            .await
            .unwrap();
        store
            .finalize_game(game_id, &[], chrono::Utc::now())
            .await
            .unwrap();

        let cached = cache.get_or_refresh(store.as_ref()).await.unwrap();
        assert_eq!(cached.total_games, 0);
    }

    #[tokio::test]
    async fn test_zero_ttl_always_refreshes() {
        let store = make_store();
        store.initialize().await.unwrap();
        let cache = StatsCache::new(Duration::ZERO);

        assert_eq!(
            cache.get_or_refresh(store.as_ref()).await.unwrap().total_games,
            0
        );

        let player = store.create_player("alice").await.unwrap();
        let room = store.create_room("quick").await.unwrap();
        let game_id = store
            .create_game(room.id, &DeathmatchRules::default(), &[player.id])
            .await
            .unwrap();
        store
            .finalize_game(game_id, &[], chrono::Utc::now())
            .await
            .unwrap();

        assert_eq!(
            cache.get_or_refresh(store.as_ref()).await.unwrap().total_games,
            1
        );
    }
}
