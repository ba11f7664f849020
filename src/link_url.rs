use crate::PreviewError;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use url::Url;

/// A URL as typed by the user.
///
/// Unlike [`Url`], inputs without a scheme (`example.com/page`,
/// `alice@example.com`) are accepted and kept verbatim. Equality and hashing
/// use the raw string, which makes it suitable as a cache key.
#[derive(Debug, Clone)]
pub struct LinkUrl {
    raw: String,
    parsed: Option<Url>,
}

impl LinkUrl {
    pub fn parse(input: &str) -> Result<Self, PreviewError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(PreviewError::InvalidUrl("empty URL".into()));
        }

        match Url::parse(raw) {
            Ok(parsed) => Ok(Self {
                raw: raw.to_string(),
                parsed: Some(parsed),
            }),
            Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Self {
                raw: raw.to_string(),
                parsed: None,
            }),
            Err(e) => Err(PreviewError::InvalidUrl(format!("{raw}: {e}"))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn scheme(&self) -> Option<&str> {
        self.parsed.as_ref().map(Url::scheme)
    }

    pub fn has_scheme(&self) -> bool {
        self.parsed.is_some()
    }

    pub fn is_mailto(&self) -> bool {
        self.scheme() == Some("mailto")
    }

    /// Host component; always `None` for scheme-less input.
    pub fn host(&self) -> Option<&str> {
        self.parsed.as_ref().and_then(Url::host_str)
    }

    pub fn url(&self) -> Option<&Url> {
        self.parsed.as_ref()
    }

    /// The address to hand to the network layer: scheme-less input gets an
    /// `https://` prefix, anything else is returned unchanged.
    pub fn with_https(&self) -> Result<Url, PreviewError> {
        match &self.parsed {
            Some(url) => Ok(url.clone()),
            None => Ok(Url::parse(&format!("https://{}", self.raw))?),
        }
    }
}

impl PartialEq for LinkUrl {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for LinkUrl {}

impl Hash for LinkUrl {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl fmt::Display for LinkUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for LinkUrl {
    type Err = PreviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for LinkUrl {
    type Error = PreviewError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Url> for LinkUrl {
    fn from(url: Url) -> Self {
        Self {
            raw: url.to_string(),
            parsed: Some(url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_scheme() {
        let url = LinkUrl::parse("https://a.com/deep/path").unwrap();
        assert_eq!(url.scheme(), Some("https"));
        assert_eq!(url.host(), Some("a.com"));
        assert_eq!(url.as_str(), "https://a.com/deep/path");
    }

    #[test]
    fn test_without_scheme() {
        let url = LinkUrl::parse("example.com/page").unwrap();
        assert!(!url.has_scheme());
        assert_eq!(url.host(), None);
        assert_eq!(url.with_https().unwrap().as_str(), "https://example.com/page");
    }

    #[test]
    fn test_mailto() {
        let url = LinkUrl::parse("mailto:alice@example.com").unwrap();
        assert!(url.is_mailto());
        assert_eq!(url.host(), None);
    }

    #[test]
    fn test_raw_string_identity() {
        let a = LinkUrl::parse("https://a.com").unwrap();
        let b = LinkUrl::parse("https://a.com/").unwrap();
        assert_ne!(a, b);
        assert_eq!(a, LinkUrl::parse("https://a.com").unwrap());
    }

    #[test]
    fn test_invalid() {
        assert!(matches!(LinkUrl::parse(""), Err(PreviewError::InvalidUrl(_))));
        assert!(matches!(LinkUrl::parse("   "), Err(PreviewError::InvalidUrl(_))));
        assert!(matches!(
            LinkUrl::parse("http://exa mple.com"),
            Err(PreviewError::InvalidUrl(_))
        ));
    }
}
