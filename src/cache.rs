use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use crate::error::FetchError;
use crate::fetcher::PageFetcher;

/// How a [`PageCache`] makes room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Keep everything for the lifetime of the cache.
    Unbounded,
    /// Keep at most `n` pages, dropping the oldest insertion first.
    Capacity(usize),
    /// Store nothing.
    Disabled,
}

impl EvictionPolicy {
    /// `0` disables caching, `None` means unbounded.
    pub fn from_capacity(capacity: Option<usize>) -> Self {
        match capacity {
            None => EvictionPolicy::Unbounded,
            Some(0) => EvictionPolicy::Disabled,
            Some(n) => EvictionPolicy::Capacity(n),
        }
    }
}

#[derive(Default)]
struct Inner {
    pages: HashMap<String, String>,
    order: VecDeque<String>,
    hits: usize,
    misses: usize,
}

/// Fetched-markup cache owned by the caller and handed to a run.
pub struct PageCache {
    policy: EvictionPolicy,
    inner: Mutex<Inner>,
}

impl PageCache {
    pub fn new(policy: EvictionPolicy) -> Self {
        Self {
            policy,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    pub fn get(&self, url: &str) -> Option<String> {
        let mut inner = self.lock();
        match inner.pages.get(url).cloned() {
            Some(page) => {
                inner.hits += 1;
                Some(page)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    pub fn insert(&self, url: &str, page: String) {
        let cap = match self.policy {
            EvictionPolicy::Disabled => return,
            EvictionPolicy::Unbounded => usize::MAX,
            EvictionPolicy::Capacity(n) => n,
        };
        let mut inner = self.lock();
        if inner.pages.insert(url.to_string(), page).is_none() {
            inner.order.push_back(url.to_string());
        }
        while inner.order.len() > cap {
            if let Some(oldest) = inner.order.pop_front() {
                inner.pages.remove(&oldest);
                debug!(url = %oldest, "evicted from page cache");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().pages.len()
    }

    /// (hits, misses)
    pub fn stats(&self) -> (usize, usize) {
        let inner = self.lock();
        (inner.hits, inner.misses)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Wraps a fetcher so successful responses are served from a [`PageCache`].
pub struct CachedFetcher<F> {
    inner: F,
    cache: Arc<PageCache>,
}

impl<F: PageFetcher> CachedFetcher<F> {
    pub fn new(inner: F, cache: Arc<PageCache>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl<F: PageFetcher> PageFetcher for CachedFetcher<F> {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        if let Some(page) = self.cache.get(url) {
            return Ok(page);
        }
        let page = self.inner.fetch(url).await?;
        self.cache.insert(url, page.clone());
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageFetcher for Counting {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if url.ends_with("404") {
                return Err(FetchError::Http {
                    url: url.to_string(),
                    status: 404,
                });
            }
            Ok(format!("<html>{}</html>", url))
        }
    }

    #[test]
    fn capacity_evicts_oldest() {
        let cache = PageCache::new(EvictionPolicy::Capacity(2));
        cache.insert("a", "1".into());
        cache.insert("b", "2".into());
        cache.insert("c", "3".into());
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("c").as_deref(), Some("3"));
        assert_eq!(cache.stats(), (1, 1));
    }

    #[test]
    fn disabled_stores_nothing() {
        let cache = PageCache::new(EvictionPolicy::from_capacity(Some(0)));
        cache.insert("a", "1".into());
        assert_eq!(cache.len(), 0);
        assert_eq!(EvictionPolicy::from_capacity(None), EvictionPolicy::Unbounded);
    }

    #[tokio::test]
    async fn serves_repeat_fetches_from_cache() {
        let cache = Arc::new(PageCache::new(EvictionPolicy::Unbounded));
        let fetcher = CachedFetcher::new(
            Counting {
                calls: AtomicUsize::new(0),
            },
            Arc::clone(&cache),
        );
        let first = fetcher.fetch("https://eyerounds.org/a").await.unwrap();
        let second = fetcher.fetch("https://eyerounds.org/a").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(fetcher.inner.calls.load(Ordering::SeqCst), 1);

        assert!(fetcher.fetch("https://eyerounds.org/404").await.is_err());
        assert!(fetcher.fetch("https://eyerounds.org/404").await.is_err());
        assert_eq!(fetcher.inner.calls.load(Ordering::SeqCst), 3);
        assert_eq!(cache.len(), 1);
    }
}
