use thiserror::Error;
use tracing::{debug, error, warn};

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("Can not fetch link info for email address")]
    EmailAddressRejected,

    #[error("No title found for URL {0}")]
    NoTitleFound(String),

    #[error("Failed to fetch link metadata: {0}")]
    FetchFailed(String),

    #[error("No host fallback available: {0}")]
    NoFallbackAvailable(String),

    #[error("Preview image unavailable: {0}")]
    ImageUnavailable(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to parse URL: {0}")]
    UrlParseError(#[from] url::ParseError),
}

impl PreviewError {
    /// Email inputs are rejected before any network access; UI callers
    /// typically fall back to a plain mail link for these.
    pub fn is_email_rejection(&self) -> bool {
        matches!(self, PreviewError::EmailAddressRejected)
    }

    /// Errors the service absorbs internally instead of surfacing.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PreviewError::ImageUnavailable(_) | PreviewError::NoFallbackAvailable(_)
        )
    }

    pub fn log(&self) {
        match self {
            PreviewError::EmailAddressRejected => {
                debug!("Link preview skipped for email address");
            }
            PreviewError::NoTitleFound(url) => {
                warn!(url = %url, "Link metadata has no title");
            }
            PreviewError::FetchFailed(e) => {
                error!(error = %e, "Link metadata fetch failed");
            }
            PreviewError::NoFallbackAvailable(e) => {
                debug!(reason = %e, "Host fallback not available");
            }
            PreviewError::ImageUnavailable(e) => {
                warn!(error = %e, "Preview image not found");
            }
            PreviewError::InvalidUrl(e) => {
                warn!(error = %e, "Invalid URL");
            }
            PreviewError::UrlParseError(e) => {
                warn!(error = %e, "URL parsing failed");
            }
        }
    }
}
