use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::cache::token::CachedToken;

/// Audience-keyed token cache shared across cycles.
///
/// Reads take the shared lock, every insert takes the exclusive lock. Entries
/// are only ever replaced or dropped all together by [`TokenCache::clear`].
/// Cloning the cache clones the handle, not the entries.
#[derive(Debug, Clone, Default)]
pub struct TokenCache {
    inner: Arc<RwLock<HashMap<String, CachedToken>>>
}

impl TokenCache {
    pub fn new() -> Self {
        Self { inner: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Insert or replace the token for an audience. Empty tokens are not stored.
    pub async fn set(&self, audience: &str, token: CachedToken) -> bool {
        if token.value.is_empty() {
            return false;
        }
        let mut map = self.inner.write().await;
        map.insert(audience.to_string(), token);
        true
    }

    /// Get token if it exists and is not expired at `now`
    pub async fn get_at(&self, audience: &str, now: DateTime<Utc>) -> Option<CachedToken> {
        let map = self.inner.read().await;
        map.get(audience)
            .filter(|token| token.is_valid_at(now))
            .cloned()
    }

    pub async fn get(&self, audience: &str) -> Option<CachedToken> {
        self.get_at(audience, Utc::now()).await
    }

    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// (total, expired) at `now`
    pub async fn stats_at(&self, now: DateTime<Utc>) -> (usize, usize) {
        let map = self.inner.read().await;
        let expired = map.values().filter(|token| !token.is_valid_at(now)).count();
        (map.len(), expired)
    }
}
