use crate::cache::Cache;
use crate::og_fetcher::OgFetcher;
use crate::render::render_card;
use crate::OgData;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, instrument};

/// Turns a URL into preview markup, consulting the disabled marker, then the
/// results cache, then the network.
///
/// Both the live decoration engine and the static post-processor go through
/// this type, so they share caching behaviour.
pub struct WidgetResolver {
    cache: Cache,
    fetcher: OgFetcher,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
    semaphore: Arc<Semaphore>,
}

impl WidgetResolver {
    pub fn new(cache: Cache, fetcher: OgFetcher, max_concurrent_requests: usize) -> Self {
        Self {
            cache,
            fetcher,
            in_flight: DashMap::new(),
            semaphore: Arc::new(Semaphore::new(max_concurrent_requests.max(1))),
        }
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Rendered card for `url`, or `None` when there is nothing to show.
    pub async fn resolve(&self, url: &str) -> Option<String> {
        self.metadata(url).await.map(|data| render_card(&data))
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn metadata(&self, url: &str) -> Option<OgData> {
        if let Some(cached) = self.lookup_cached(url).await {
            return cached;
        }

        // One fetch per URL at a time; later callers read what it stored.
        let lock = Arc::clone(self.in_flight.entry(url.to_string()).or_default().value());
        let result = {
            let _guard = lock.lock().await;
            match self.lookup_cached(url).await {
                Some(cached) => cached,
                None => {
                    let _permit = self.semaphore.acquire().await.ok()?;
                    debug!(url = %url, "Cache miss, fetching metadata");
                    self.fetcher.fetch(url).await
                }
            }
        };
        self.in_flight
            .remove_if(url, |_, entry| Arc::ptr_eq(entry, &lock) && Arc::strong_count(entry) <= 2);
        result
    }

    /// `Some(None)` when disabled, `Some(Some(data))` on a hit, `None` on a miss.
    async fn lookup_cached(&self, url: &str) -> Option<Option<OgData>> {
        match self.cache.is_disabled(url).await {
            Ok(true) => {
                debug!(url = %url, "URL is disabled, skipping");
                return Some(None);
            }
            Ok(false) => {}
            Err(e) => e.log(),
        }

        match self.cache.result(url).await {
            Ok(Some(data)) => {
                debug!(url = %url, "Serving metadata from cache");
                Some(Some(data))
            }
            Ok(None) => None,
            Err(e) => {
                e.log();
                None
            }
        }
    }
}
