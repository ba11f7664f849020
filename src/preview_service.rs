use crate::utils::host_fallback_url;
use crate::{
    Cache, Email, FetcherConfig, HttpFetcher, ImageFormat, ImageMaterializer, LinkUrl,
    MetadataFetcher, PreviewError, PreviewInfo,
};
use futures::future::{join_all, BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, instrument, warn};
use url::Url;

pub const MAX_CONCURRENT_REQUESTS: usize = 500;

/// 100 MiB of approximate preview cost.
pub const DEFAULT_CACHE_COST_LIMIT: usize = 100 * 1024 * 1024;

pub const DEFAULT_MAX_FALLBACK_DEPTH: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewServiceConfig {
    /// `None` disables the bound entirely.
    pub cache_cost_limit: Option<usize>,
    /// Upper bound on simultaneous metadata and image requests.
    pub max_concurrent_requests: usize,
    /// How many host fallbacks may be nested inside one lookup.
    pub max_fallback_depth: usize,
}

impl Default for PreviewServiceConfig {
    fn default() -> Self {
        Self {
            cache_cost_limit: Some(DEFAULT_CACHE_COST_LIMIT),
            max_concurrent_requests: MAX_CONCURRENT_REQUESTS,
            max_fallback_depth: DEFAULT_MAX_FALLBACK_DEPTH,
        }
    }
}

impl PreviewServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a config from JSON; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_cache_cost_limit(mut self, limit: Option<usize>) -> Self {
        self.cache_cost_limit = limit;
        self
    }

    pub fn with_max_concurrent_requests(mut self, max_concurrent_requests: usize) -> Self {
        self.max_concurrent_requests = max_concurrent_requests;
        self
    }

    pub fn with_max_fallback_depth(mut self, depth: usize) -> Self {
        self.max_fallback_depth = depth;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub total_cost: usize,
    pub cost_limit: Option<usize>,
}

/// Resolves URLs into [`PreviewInfo`], falling back to the URL's host when
/// the page itself cannot be previewed, and caching every success.
///
/// Clones share the same cache, so create one service per application and
/// hand clones to whoever needs it.
#[derive(Clone)]
pub struct LinkPreviewService {
    cache: Cache<LinkUrl, PreviewInfo>,
    fetcher: Arc<dyn MetadataFetcher>,
    materializer: Arc<dyn ImageMaterializer>,
    semaphore: Arc<Semaphore>,
    max_fallback_depth: usize,
}

impl LinkPreviewService {
    pub fn new(
        fetcher: Arc<dyn MetadataFetcher>,
        materializer: Arc<dyn ImageMaterializer>,
        config: PreviewServiceConfig,
    ) -> Self {
        debug!(?config, "Initializing LinkPreviewService");

        Self {
            cache: Cache::new(config.cache_cost_limit),
            fetcher,
            materializer,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_requests.max(1))),
            max_fallback_depth: config.max_fallback_depth,
        }
    }

    /// Uses one value for both collaborator roles.
    pub fn with_fetcher<F>(fetcher: F, config: PreviewServiceConfig) -> Self
    where
        F: MetadataFetcher + ImageMaterializer + 'static,
    {
        let fetcher = Arc::new(fetcher);
        Self::new(fetcher.clone(), fetcher, config)
    }

    /// Service backed by [`HttpFetcher`] with default settings.
    pub fn http() -> Result<Self, PreviewError> {
        Self::with_http_config(FetcherConfig::default(), PreviewServiceConfig::default())
    }

    pub fn with_http_config(
        fetcher_config: FetcherConfig,
        config: PreviewServiceConfig,
    ) -> Result<Self, PreviewError> {
        let fetcher = HttpFetcher::new_with_config(fetcher_config)?;
        Ok(Self::with_fetcher(fetcher, config))
    }

    #[instrument(level = "debug", skip(self, url), fields(url = %url))]
    pub async fn fetch_link_info(&self, url: &LinkUrl) -> Result<PreviewInfo, PreviewError> {
        let mut chain = vec![url.clone()];
        self.resolve(url, &mut chain).await
    }

    pub async fn fetch_link_info_str(&self, url: &str) -> Result<PreviewInfo, PreviewError> {
        let url = LinkUrl::parse(url)?;
        self.fetch_link_info(&url).await
    }

    /// Resolves several URLs concurrently. Results keep the input order.
    pub async fn fetch_link_infos(
        &self,
        urls: &[LinkUrl],
    ) -> Vec<Result<PreviewInfo, PreviewError>> {
        join_all(urls.iter().map(|url| self.fetch_link_info(url))).await
    }

    pub fn cached(&self, url: &LinkUrl) -> Option<PreviewInfo> {
        self.cache.get(url)
    }

    pub fn invalidate(&self, url: &LinkUrl) -> Option<PreviewInfo> {
        self.cache.remove(url)
    }

    pub fn clear_cache(&self) {
        self.cache.remove_all();
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            entries: self.cache.len(),
            total_cost: self.cache.total_cost(),
            cost_limit: self.cache.cost_limit(),
        }
    }

    /// `chain` holds every URL on the current fallback path, the requested
    /// one first.
    fn resolve<'a>(
        &'a self,
        url: &'a LinkUrl,
        chain: &'a mut Vec<LinkUrl>,
    ) -> BoxFuture<'a, Result<PreviewInfo, PreviewError>> {
        async move {
            if let Some(cached) = self.cache.get(url) {
                debug!(url = %url, "Link preview served from cache");
                return Ok(cached);
            }

            match self.fetch_from_network(url).await {
                Ok(mut info) => {
                    if info.image().is_none() {
                        match self.fetch_for_host(url, chain).await {
                            Ok(host_info) => {
                                if let Some(image) = host_info.into_image() {
                                    debug!(url = %url, "Preview image taken from host");
                                    info.fill_image(image);
                                }
                            }
                            Err(e) => debug!(url = %url, error = %e, "Host image lookup skipped"),
                        }
                    }
                    self.cache.set(url.clone(), info.clone());
                    Ok(info)
                }
                Err(error @ (PreviewError::EmailAddressRejected | PreviewError::NoTitleFound(_))) => {
                    Err(error)
                }
                Err(error) => {
                    warn!(url = %url, error = %error, "Failed to load link preview");
                    match self.fetch_for_host(url, chain).await {
                        Ok(info) => {
                            self.cache.set(url.clone(), info.clone());
                            Ok(info)
                        }
                        Err(fallback_error) => {
                            fallback_error.log();
                            Err(error)
                        }
                    }
                }
            }
        }
        .boxed()
    }

    /// Resolves the host of `url`. Only the host's own entry is cached here;
    /// callers decide what `url` itself maps to.
    async fn fetch_for_host(
        &self,
        url: &LinkUrl,
        chain: &mut Vec<LinkUrl>,
    ) -> Result<PreviewInfo, PreviewError> {
        let host_url = host_fallback_url(url).ok_or_else(|| {
            PreviewError::NoFallbackAvailable(format!("no usable host in {url}"))
        })?;

        // Unreachable while host URLs are scheme-less, which makes them
        // hostless in turn.
        if chain.contains(&host_url) {
            return Err(PreviewError::NoFallbackAvailable(format!(
                "{host_url} is already being resolved"
            )));
        }
        if chain.len() > self.max_fallback_depth {
            return Err(PreviewError::NoFallbackAvailable(format!(
                "fallback depth limit of {} reached",
                self.max_fallback_depth
            )));
        }

        debug!(url = %url, host = %host_url, "Trying host fallback");
        chain.push(host_url.clone());
        let result = self.resolve(&host_url, chain).await;
        chain.pop();
        result
    }

    async fn fetch_from_network(&self, url: &LinkUrl) -> Result<PreviewInfo, PreviewError> {
        let target = network_url(url)?;

        let metadata = {
            let _permit = self.acquire().await?;
            self.fetcher.fetch_metadata(&target).await?
        };

        let title = metadata
            .title
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty())
            .ok_or_else(|| PreviewError::NoTitleFound(url.to_string()))?;

        let Some(provider) = metadata.image_provider else {
            return Ok(PreviewInfo::new(title, None));
        };

        let image = {
            let _permit = self.acquire().await?;
            self.materializer
                .load_image(&provider, ImageFormat::Png)
                .await
        };

        match image {
            Ok(image) => Ok(PreviewInfo::new(title, Some(image))),
            Err(e) => {
                warn!(url = %url, error = %e, "Preview image not found");
                Ok(PreviewInfo::new(title, None))
            }
        }
    }

    async fn acquire(&self) -> Result<SemaphorePermit<'_>, PreviewError> {
        self.semaphore
            .acquire()
            .await
            .map_err(|_| PreviewError::FetchFailed("request limiter closed".into()))
    }
}

/// Address actually requested from the network for `url`. Email addresses
/// are rejected here, before any request is made.
fn network_url(url: &LinkUrl) -> Result<Url, PreviewError> {
    if url.is_mailto() {
        return Err(PreviewError::EmailAddressRejected);
    }
    if !url.has_scheme() && Email::is_valid(url.as_str()) {
        return Err(PreviewError::EmailAddressRejected);
    }
    url.with_https()
}
