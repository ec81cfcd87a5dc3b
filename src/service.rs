use crate::cache::Cache;
use crate::config::ThumbnailConfig;
use crate::engine::{DecorationEngine, EditorHost};
use crate::error::Result;
use crate::fetcher::{Fetcher, FetcherConfig, HttpClient};
use crate::og_fetcher::OgFetcher;
use crate::post_processor::PostProcessor;
use crate::resolver::WidgetResolver;
use crate::state::DecorationStore;
use crate::OgData;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Wires the cache, the network client and the resolver together and hands
/// out per-editor decoration engines.
#[derive(Clone)]
pub struct LinkThumbnailService {
    config: ThumbnailConfig,
    resolver: Arc<WidgetResolver>,
}

impl LinkThumbnailService {
    /// Uses reqwest for the network and the configured cache directory.
    pub async fn new(config: ThumbnailConfig) -> Result<Self> {
        let fetcher = Fetcher::new_with_config(FetcherConfig {
            user_agent: config.user_agent.clone(),
            timeout: config.timeout,
            ..FetcherConfig::default()
        })?;
        Self::with_client(config, Arc::new(fetcher)).await
    }

    pub async fn with_client(config: ThumbnailConfig, client: Arc<dyn HttpClient>) -> Result<Self> {
        let cache = match &config.cache_dir {
            Some(dir) => Cache::open_dir(dir).await?,
            None => Cache::in_memory(),
        };
        Ok(Self::from_parts(config, cache, client))
    }

    pub fn from_parts(config: ThumbnailConfig, cache: Cache, client: Arc<dyn HttpClient>) -> Self {
        debug!(
            cache_dir = ?config.cache_dir,
            max_concurrent_requests = config.max_concurrent_requests,
            "Initializing LinkThumbnailService"
        );
        let fetcher = OgFetcher::new(client, cache.clone(), &config);
        let resolver = Arc::new(WidgetResolver::new(
            cache,
            fetcher,
            config.max_concurrent_requests,
        ));
        Self { config, resolver }
    }

    pub fn config(&self) -> &ThumbnailConfig {
        &self.config
    }

    pub fn cache(&self) -> &Cache {
        self.resolver.cache()
    }

    pub fn resolver(&self) -> &Arc<WidgetResolver> {
        &self.resolver
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn resolve(&self, url: &str) -> Option<String> {
        self.resolver.resolve(url).await
    }

    pub async fn metadata(&self, url: &str) -> Option<OgData> {
        self.resolver.metadata(url).await
    }

    /// A decoration engine for one editor, with its own decoration store.
    pub fn engine(&self, host: Arc<dyn EditorHost>) -> DecorationEngine {
        DecorationEngine::new(
            Arc::clone(&self.resolver),
            host,
            Arc::new(DecorationStore::new()),
            &self.config,
        )
    }

    pub fn post_processor(&self) -> PostProcessor {
        PostProcessor::new(Arc::clone(&self.resolver), self.config.opt_out_class.clone())
    }
}
