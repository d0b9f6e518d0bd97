//! Bearer-token caching for the service account, with single-flight
//! re-authentication across concurrent callers.

use std::future::Future;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::Mutex;

/// A cached bearer token and when it should be considered stale.
#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Holds the current service-account token. Every caller that needs a
/// fresh token awaits the same mutex, so only one re-authentication HTTP
/// call is ever in flight at a time.
pub struct TokenCache {
    lifetime: ChronoDuration,
    cushion: ChronoDuration,
    slot: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    /// `lifetime_hours` is how long a freshly issued token is cached for
    /// (spec default ~23h, one hour short of a typical 24h token to avoid
    /// using one right at expiry).
    #[must_use]
    pub fn new(lifetime_hours: u64) -> Self {
        Self {
            lifetime: ChronoDuration::hours(i64::try_from(lifetime_hours).unwrap_or(23)),
            cushion: ChronoDuration::minutes(1),
            slot: Mutex::new(None),
        }
    }

    /// Return a valid cached token, or `None` if one must be fetched.
    ///
    /// Holds the cache lock only long enough to read the slot; the actual
    /// re-authentication call happens in [`TokenCache::replace`], which is
    /// also guarded by this same lock so concurrent misses collapse into a
    /// single HTTP call.
    pub async fn get(&self) -> Option<String> {
        let guard = self.slot.lock().await;
        match &*guard {
            Some(cached) if Utc::now() + self.cushion < cached.expires_at => {
                Some(cached.token.clone())
            }
            _ => None,
        }
    }

    /// Re-check the cache under lock, and if it is still stale, call
    /// `authenticate` to obtain a fresh token. Concurrent callers that
    /// arrive while one is already authenticating block on the same lock
    /// and observe the freshly cached token instead of re-authenticating
    /// themselves.
    pub async fn get_or_refresh<F, Fut, E>(&self, authenticate: F) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        let mut guard = self.slot.lock().await;
        if let Some(cached) = &*guard {
            if Utc::now() + self.cushion < cached.expires_at {
                return Ok(cached.token.clone());
            }
        }
        let token = authenticate().await?;
        *guard = Some(CachedToken {
            token: token.clone(),
            expires_at: Utc::now() + self.lifetime,
        });
        Ok(token)
    }

    /// Drop the cached token, forcing the next call to re-authenticate
    /// (used after a 401 on an otherwise-cached token).
    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn caches_token_across_calls() {
        let cache = TokenCache::new(23);
        let calls = AtomicU32::new(0);
        for _ in 0..3 {
            let token = cache
                .get_or_refresh(|| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok::<_, ()>("tok-1".to_owned()) }
                })
                .await
                .unwrap();
            assert_eq!(token, "tok-1");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_reauth() {
        let cache = TokenCache::new(23);
        let _ = cache
            .get_or_refresh(|| async { Ok::<_, ()>("tok-1".to_owned()) })
            .await;
        cache.invalidate().await;
        let token = cache
            .get_or_refresh(|| async { Ok::<_, ()>("tok-2".to_owned()) })
            .await
            .unwrap();
        assert_eq!(token, "tok-2");
    }
}
