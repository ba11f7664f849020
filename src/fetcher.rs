use crate::{ImageFormat, MetadataExtractor, PreviewError, PreviewImage};
use async_trait::async_trait;
use reqwest::{header::HeaderMap, Client};
use std::time::Duration;
use tracing::{debug, error, instrument};
use url::Url;

/// Raw page metadata as returned by a [`MetadataFetcher`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkMetadata {
    pub title: Option<String>,
    pub image_provider: Option<ImageProvider>,
}

/// Opaque handle to an image that can be materialized later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageProvider {
    url: Url,
}

impl ImageProvider {
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Fetches page metadata for a URL. Each call is a single, independent
/// attempt; retries and timeouts are up to the implementation.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch_metadata(&self, url: &Url) -> Result<LinkMetadata, PreviewError>;
}

/// Turns an [`ImageProvider`] into encoded image bytes.
#[async_trait]
pub trait ImageMaterializer: Send + Sync {
    async fn load_image(
        &self,
        provider: &ImageProvider,
        format: ImageFormat,
    ) -> Result<PreviewImage, PreviewError>;
}

/// Configuration for [`HttpFetcher`].
///
/// # Examples
/// ```ignore
/// let fetcher = HttpFetcher::new_with_config(FetcherConfig {
///     user_agent: "my-app/1.0".to_string(),
///     timeout: Duration::from_secs(5),
///     ..Default::default()
/// });
/// ```
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub headers: Option<HeaderMap>,
    pub max_image_bytes: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: "link_preview/0.1.0".to_string(),
            timeout: Duration::from_secs(10),
            headers: None,
            max_image_bytes: 5 * 1024 * 1024,
        }
    }
}

/// HTTP implementation of both collaborator traits.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    extractor: MetadataExtractor,
    max_image_bytes: usize,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, PreviewError> {
        debug!("HttpFetcher initialized with default configuration");
        Self::new_with_config(FetcherConfig::default())
    }

    pub fn new_with_config(config: FetcherConfig) -> Result<Self, PreviewError> {
        let mut client_builder = Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .pool_max_idle_per_host(10);

        if let Some(headers) = config.headers {
            client_builder = client_builder.default_headers(headers);
        }

        let client = client_builder.build().map_err(|e| {
            error!(error = %e, "Failed to create HTTP client");
            PreviewError::FetchFailed(format!("Failed to initialize HTTP client: {e}"))
        })?;

        Ok(Self {
            client,
            extractor: MetadataExtractor::new(),
            max_image_bytes: config.max_image_bytes,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            extractor: MetadataExtractor::new(),
            max_image_bytes: FetcherConfig::default().max_image_bytes,
        }
    }

    pub fn with_max_image_bytes(mut self, max_image_bytes: usize) -> Self {
        self.max_image_bytes = max_image_bytes;
        self
    }
}

#[async_trait]
impl MetadataFetcher for HttpFetcher {
    #[instrument(level = "debug", skip(self, url), fields(url = %url), err)]
    async fn fetch_metadata(&self, url: &Url) -> Result<LinkMetadata, PreviewError> {
        debug!("Starting metadata fetch");

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            error!(error = %e, url = %url, "Failed to send request");
            PreviewError::FetchFailed(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PreviewError::FetchFailed(format!(
                "{url} returned status {status}"
            )));
        }

        // Redirects may land on a different page; relative image paths are
        // relative to where we ended up.
        let final_url = response.url().clone();
        let html = response.text().await.map_err(|e| {
            error!(error = %e, url = %url, "Failed to read response body");
            PreviewError::FetchFailed(e.to_string())
        })?;

        debug!(content_length = html.len(), "Successfully fetched webpage");
        Ok(self.extractor.extract(&html, &final_url))
    }
}

#[async_trait]
impl ImageMaterializer for HttpFetcher {
    #[instrument(level = "debug", skip(self, provider), fields(url = %provider.url()), err)]
    async fn load_image(
        &self,
        provider: &ImageProvider,
        format: ImageFormat,
    ) -> Result<PreviewImage, PreviewError> {
        let response = self
            .client
            .get(provider.url().clone())
            .header(reqwest::header::ACCEPT, format.mime_type())
            .send()
            .await
            .map_err(|e| PreviewError::ImageUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PreviewError::ImageUnavailable(format!(
                "{} returned status {status}",
                provider.url()
            )));
        }

        if let Some(length) = response.content_length() {
            if exceeds_limit(length, self.max_image_bytes) {
                return Err(PreviewError::ImageUnavailable(format!(
                    "image of {length} bytes exceeds limit of {}",
                    self.max_image_bytes
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PreviewError::ImageUnavailable(e.to_string()))?;

        if bytes.is_empty() {
            return Err(PreviewError::ImageUnavailable(
                "Image data not found or invalid".into(),
            ));
        }
        if bytes.len() > self.max_image_bytes {
            return Err(PreviewError::ImageUnavailable(format!(
                "image of {} bytes exceeds limit of {}",
                bytes.len(),
                self.max_image_bytes
            )));
        }

        let image = PreviewImage::new(bytes.to_vec());
        match image.format() {
            ImageFormat::Unknown => Err(PreviewError::ImageUnavailable(
                "Image data not found or invalid".into(),
            )),
            actual => {
                if actual != format {
                    debug!(
                        requested = format.type_identifier(),
                        actual = actual.type_identifier(),
                        "Image served in a different format than requested"
                    );
                }
                Ok(image)
            }
        }
    }
}

/// Lengths that do not fit in `usize` always exceed the limit.
fn exceeds_limit(length: u64, limit: usize) -> bool {
    usize::try_from(length).map_or(true, |length| length > limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exceeds_limit() {
        assert!(!exceeds_limit(0, 8));
        assert!(!exceeds_limit(8, 8));
        assert!(exceeds_limit(9, 8));
        assert!(exceeds_limit(u64::MAX, usize::MAX - 1));
        assert!(exceeds_limit(1 << 40, 5 * 1024 * 1024));
    }
}
