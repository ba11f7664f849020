use crate::fetcher::{ImageProvider, LinkMetadata};
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

const TITLE_SELECTORS: [&str; 2] = ["meta[property='og:title']", "meta[name='twitter:title']"];

const IMAGE_SELECTORS: [&str; 5] = [
    "meta[property='og:image']",
    "meta[property='og:image:url']",
    "meta[name='twitter:image']",
    "meta[itemprop='image']",
    "link[rel='apple-touch-icon']",
];

/// Metadata extractor, responsible for pulling the preview title and image
/// location out of an HTML document.
#[derive(Clone)]
pub struct MetadataExtractor;

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataExtractor {
    pub fn new() -> Self {
        Self
    }

    /// `page_url` is the address the document was loaded from; relative image
    /// references are resolved against it.
    pub fn extract(&self, html: &str, page_url: &Url) -> LinkMetadata {
        let document = Html::parse_document(html);

        let title = self.extract_title(&document);
        let image_provider = self
            .extract_image(&document)
            .and_then(|location| resolve(page_url, &location))
            .map(ImageProvider::new);

        debug!(
            url = %page_url,
            title = ?title,
            image = ?image_provider,
            "Extracted link metadata"
        );

        LinkMetadata {
            title,
            image_provider,
        }
    }

    fn extract_title(&self, document: &Html) -> Option<String> {
        // Open Graph and Twitter card titles win over the document title.
        let meta_title = TITLE_SELECTORS
            .iter()
            .filter_map(|s| Selector::parse(s).ok())
            .find_map(|selector| {
                document
                    .select(&selector)
                    .filter_map(|el| el.value().attr("content"))
                    .map(str::trim)
                    .find(|s| !s.is_empty())
                    .map(String::from)
            });

        meta_title.or_else(|| {
            let title_selector = Selector::parse("title").ok()?;
            document
                .select(&title_selector)
                .next()
                .map(|el| el.text().collect::<String>())
                .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
                .filter(|s| !s.is_empty())
        })
    }

    fn extract_image(&self, document: &Html) -> Option<String> {
        IMAGE_SELECTORS
            .iter()
            .filter_map(|s| Selector::parse(s).ok())
            .find_map(|selector| {
                document
                    .select(&selector)
                    .filter_map(|el| el.value().attr("content").or(el.value().attr("href")))
                    .map(str::trim)
                    .find(|s| !s.is_empty())
                    .map(String::from)
            })
    }
}

fn resolve(page_url: &Url, location: &str) -> Option<Url> {
    let resolved = page_url.join(location).ok()?;
    match resolved.scheme() {
        "http" | "https" => Some(resolved),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://example.com/articles/1").unwrap()
    }

    #[test]
    fn test_prefers_open_graph() {
        let html = r#"<html><head>
            <title>Fallback Title</title>
            <meta property="og:title" content=" OG Title ">
            <meta property="og:image" content="https://cdn.example.com/a.png">
        </head></html>"#;

        let metadata = MetadataExtractor::new().extract(html, &page());
        assert_eq!(metadata.title.as_deref(), Some("OG Title"));
        assert_eq!(
            metadata.image_provider.map(|p| p.url().to_string()),
            Some("https://cdn.example.com/a.png".to_string())
        );
    }

    #[test]
    fn test_title_fallback_and_relative_image() {
        let html = r#"<html><head>
            <title>
                Plain   Title
            </title>
            <meta name="twitter:image" content="/img/card.jpg">
        </head></html>"#;

        let metadata = MetadataExtractor::new().extract(html, &page());
        assert_eq!(metadata.title.as_deref(), Some("Plain Title"));
        assert_eq!(
            metadata.image_provider.map(|p| p.url().to_string()),
            Some("https://example.com/img/card.jpg".to_string())
        );
    }

    #[test]
    fn test_touch_icon_and_missing_title() {
        let html = r#"<html><head>
            <title>   </title>
            <link rel="apple-touch-icon" href="icon.png">
        </head></html>"#;

        let metadata = MetadataExtractor::new().extract(html, &page());
        assert_eq!(metadata.title, None);
        assert_eq!(
            metadata.image_provider.map(|p| p.url().to_string()),
            Some("https://example.com/articles/icon.png".to_string())
        );
    }

    #[test]
    fn test_ignores_non_http_images() {
        let html = r#"<meta property="og:title" content="T">
            <meta property="og:image" content="data:image/png;base64,AAAA">"#;

        let metadata = MetadataExtractor::new().extract(html, &page());
        assert_eq!(metadata.title.as_deref(), Some("T"));
        assert!(metadata.image_provider.is_none());
    }
}
