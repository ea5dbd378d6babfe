use headers::CacheControl;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// How long a successful upstream response may be reused before the next
/// request revalidates it upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub ttl: Duration,
    pub max_entries: usize,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600), 1024)
    }
}

impl CachePolicy {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self { ttl, max_entries }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, 0)
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero() && self.max_entries > 0
    }

    /// Directive sent to browsers alongside a successful proxy response.
    pub fn cache_control(&self) -> CacheControl {
        if self.ttl.is_zero() {
            CacheControl::new().with_no_cache()
        } else {
            CacheControl::new().with_public().with_max_age(self.ttl)
        }
    }
}

#[derive(Debug)]
struct CachedBody {
    fetched_at: Instant,
    body: Arc<str>,
}

/// Response bodies keyed by upstream path and query, never by credential.
#[derive(Debug)]
pub struct ResponseCache {
    policy: CachePolicy,
    entries: Mutex<HashMap<String, CachedBody>>,
}

impl ResponseCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub async fn get(&self, key: &str) -> Option<Arc<str>> {
        if !self.policy.is_enabled() {
            return None;
        }
        let mut guard = self.entries.lock().await;
        let lookup = guard
            .get(key)
            .map(|entry| (entry.fetched_at.elapsed() < self.policy.ttl, entry.body.clone()));
        match lookup {
            Some((true, body)) => Some(body),
            Some((false, _)) => {
                debug!("Cached response for {} expired, revalidating", key);
                guard.remove(key);
                None
            }
            None => None,
        }
    }

    pub async fn insert(&self, key: String, body: Arc<str>) {
        if !self.policy.is_enabled() {
            return;
        }
        let ttl = self.policy.ttl;
        let mut guard = self.entries.lock().await;
        if guard.len() >= self.policy.max_entries && !guard.contains_key(&key) {
            guard.retain(|_, v| v.fetched_at.elapsed() < ttl);
            if guard.len() >= self.policy.max_entries {
                guard.clear();
            }
        }
        guard.insert(
            key,
            CachedBody {
                fetched_at: Instant::now(),
                body,
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
