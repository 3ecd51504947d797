//! OAuth token cache
//!
//! The PM system issues client-credential tokens; acquisition is owned by
//! the client object and the cached token lives here, behind a lock, not in
//! any module-level state. The token is reused until a safety margin before
//! expiry, then refreshed lazily on the next access.

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

/// Seconds before nominal expiry at which a token is treated as expired
const EXPIRY_MARGIN_SECONDS: i64 = 60;

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Process-wide token cache, owned by the PM client
#[derive(Debug, Default)]
pub struct TokenCache {
    inner: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(None),
        }
    }

    /// Returns the cached token if it is still comfortably inside its
    /// lifetime
    pub async fn current(&self) -> Option<String> {
        let guard = self.inner.read().await;
        guard.as_ref().and_then(|cached| {
            let margin = Duration::seconds(EXPIRY_MARGIN_SECONDS);
            if Utc::now() + margin < cached.expires_at {
                Some(cached.token.clone())
            } else {
                None
            }
        })
    }

    /// Stores a freshly acquired token with its lifetime in seconds
    pub async fn store(&self, token: String, expires_in: u64) {
        let expires_at = Utc::now() + Duration::seconds(expires_in as i64);
        let mut guard = self.inner.write().await;
        *guard = Some(CachedToken { token, expires_at });
    }

    /// Drops the cached token (after a 401, forcing re-acquisition)
    pub async fn clear(&self) {
        let mut guard = self.inner.write().await;
        *guard = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_cache_returns_none() {
        let cache = TokenCache::new();
        assert!(cache.current().await.is_none());
    }

    #[tokio::test]
    async fn test_store_and_retrieve() {
        let cache = TokenCache::new();
        cache.store("tok-1".to_string(), 3600).await;
        assert_eq!(cache.current().await.as_deref(), Some("tok-1"));
    }

    #[tokio::test]
    async fn test_token_within_margin_treated_as_expired() {
        let cache = TokenCache::new();
        // Lifetime shorter than the refresh margin
        cache.store("tok-1".to_string(), 30).await;
        assert!(cache.current().await.is_none());
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = TokenCache::new();
        cache.store("tok-1".to_string(), 3600).await;
        cache.clear().await;
        assert!(cache.current().await.is_none());
    }
}
