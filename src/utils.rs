use unicode_width::UnicodeWidthChar;

use crate::LinkUrl;

/// Safely truncate a string, ensuring it is not truncated in the middle of multi-byte characters
///
/// This function will:
/// 1. Correctly handle Unicode characters (including Chinese, emoji, etc.)
/// 2. Add ellipsis when maximum length is reached
/// 3. Ensure the output string's display width does not exceed the specified length
#[allow(dead_code)]
pub fn truncate_str(s: &str, max_width: usize) -> String {
    use unicode_width::UnicodeWidthStr;

    if s.width() <= max_width {
        return s.to_string();
    }

    let mut result = String::new();
    let mut current_width = 0;

    for c in s.chars() {
        let char_width = c.width().unwrap_or(1);

        if current_width + char_width + 3 > max_width {
            break;
        }

        result.push(c);
        current_width += char_width;
    }

    result.push_str("...");
    result
}

/// Derives the host-only URL used as a fallback preview source for `url`.
///
/// Returns `None` when there is nothing to fall back to: `mailto` links,
/// inputs without a host, or inputs that already are just the host.
/// Workspace subdomains of Slack collapse to `slack.com`.
pub fn host_fallback_url(url: &LinkUrl) -> Option<LinkUrl> {
    if url.is_mailto() {
        return None;
    }
    let host = url.host()?;
    if host == url.as_str() {
        return None;
    }

    let host_url = LinkUrl::parse(host).ok()?;
    if host_url.as_str().contains("slack.com") {
        return LinkUrl::parse("slack.com").ok();
    }
    Some(host_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("Hello, world!", 10), "Hello, ...");
        assert_eq!(truncate_str("你好，世界！", 8), "你好...");
        assert_eq!(truncate_str("Hello 你好！", 10), "Hello ...");
        assert_eq!(truncate_str("Hi!", 10), "Hi!");
    }

    fn fallback(input: &str) -> Option<String> {
        host_fallback_url(&LinkUrl::parse(input).unwrap()).map(|u| u.to_string())
    }

    #[test]
    fn test_host_fallback_url() {
        assert_eq!(fallback("https://a.com/deep/path").as_deref(), Some("a.com"));
        assert_eq!(fallback("http://a.com:8080/x").as_deref(), Some("a.com"));
        assert_eq!(fallback("https://a.com").as_deref(), Some("a.com"));
    }

    #[test]
    fn test_slack_normalization() {
        assert_eq!(
            fallback("https://foo.slack.com/archives/C123").as_deref(),
            Some("slack.com")
        );
    }

    #[test]
    fn test_no_fallback() {
        assert_eq!(fallback("mailto:alice@example.com"), None);
        assert_eq!(fallback("example.com/page"), None);
        assert_eq!(fallback("a.com"), None);
        assert_eq!(fallback("file:///tmp/x"), None);
    }
}
