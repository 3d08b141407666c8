//! Single-value cache with explicit expiry.

use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Default lifetime of cached tokens, seller ids and cost tables.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Holds at most one value together with its expiry instant.
///
/// The lock is held while a loader runs, so concurrent callers that find the
/// slot expired wait for one refresh instead of all hitting the source.
#[derive(Debug)]
pub struct TtlCache<T> {
    ttl: Duration,
    slot: Mutex<Option<(T, Instant)>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached value if present and not expired.
    pub async fn peek(&self) -> Option<T> {
        let slot = self.slot.lock().await;
        match slot.as_ref() {
            Some((value, expires_at)) if Instant::now() < *expires_at => Some(value.clone()),
            _ => None,
        }
    }

    /// Return the cached value, or run `load` and cache its result.
    ///
    /// A failed load leaves the slot untouched and returns the error.
    pub async fn get_or_try_load<F, Fut, E>(&self, load: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some((value, expires_at)) = slot.as_ref() {
            if Instant::now() < *expires_at {
                return Ok(value.clone());
            }
        }
        let value = load().await?;
        *slot = Some((value.clone(), Instant::now() + self.ttl));
        Ok(value)
    }

    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }
}

impl<T: Clone> Default for TtlCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}
