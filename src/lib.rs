mod async_action;
mod cache;
mod email;
mod error;
mod extractor;
mod fetcher;
mod image;
mod link_url;
#[cfg(feature = "logging")]
mod logging;
mod preview_service;
mod utils;

pub use async_action::{ActionOptions, ActionState, AsyncAction, DEFAULT_PROGRESS_DELAY};
pub use cache::{Cache, CacheCost};
pub use email::Email;
pub use error::PreviewError;
pub use extractor::MetadataExtractor;
pub use fetcher::{
    FetcherConfig, HttpFetcher, ImageMaterializer, ImageProvider, LinkMetadata, MetadataFetcher,
};
pub use image::{ImageFormat, PreviewImage};
pub use link_url::LinkUrl;
#[cfg(feature = "logging")]
pub use logging::{
    format_preview_card, log_error_card, log_preview_card, setup_logging, LogConfig,
    LogLevelGuard,
};
pub use preview_service::{
    CacheStats, LinkPreviewService, PreviewServiceConfig, DEFAULT_CACHE_COST_LIMIT,
    DEFAULT_MAX_FALLBACK_DEPTH, MAX_CONCURRENT_REQUESTS,
};
pub use utils::host_fallback_url;

/// Title and optional image summarizing what a link points to.
///
/// The title is fixed at construction; the image may still be filled in
/// while the preview is being resolved.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PreviewInfo {
    title: String,
    image: Option<PreviewImage>,
}

impl PreviewInfo {
    pub fn new(title: impl Into<String>, image: Option<PreviewImage>) -> Self {
        Self {
            title: title.into(),
            image,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn image(&self) -> Option<&PreviewImage> {
        self.image.as_ref()
    }

    pub fn into_image(self) -> Option<PreviewImage> {
        self.image
    }

    pub(crate) fn fill_image(&mut self, image: PreviewImage) {
        if self.image.is_none() {
            self.image = Some(image);
        }
    }
}

impl CacheCost for PreviewInfo {
    fn cost(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.title.len()
            + self.image.as_ref().map_or(0, PreviewImage::len)
    }
}
