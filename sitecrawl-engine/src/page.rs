use serde::{Deserialize, Serialize};

/// A fetched page as handed back by a [`Visitor`](crate::visitor::Visitor).
///
/// The engine only looks at `url`, `requested_url`, `html` and `content`;
/// the remaining fields are carried through to the consumer untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Final URL after redirects.
    pub url: String,
    /// URL the engine asked for, when it differs from `url` or the visitor
    /// wants to be explicit about it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_url: Option<String>,
    /// Raw markup, used for link extraction.
    #[serde(skip_serializing)]
    pub html: String,
    /// Extracted text body, used for emptiness and duplicate checks.
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl Page {
    pub fn new(url: impl Into<String>, html: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            requested_url: None,
            html: html.into(),
            content: content.into(),
            title: None,
            status_code: 200,
            content_type: None,
        }
    }

    pub fn with_requested_url(mut self, requested: impl Into<String>) -> Self {
        self.requested_url = Some(requested.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// URL used to match this page back to the frontier entry that produced it.
    pub fn match_url(&self) -> &str {
        self.requested_url.as_deref().unwrap_or(&self.url)
    }

    /// True when there is no body worth yielding or fingerprinting.
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_url_prefers_requested() {
        let page = Page::new("https://example.com/b", "", "x")
            .with_requested_url("https://example.com/a");
        assert_eq!(page.match_url(), "https://example.com/a");

        let page = Page::new("https://example.com/b", "", "x");
        assert_eq!(page.match_url(), "https://example.com/b");
    }

    #[test]
    fn test_whitespace_only_content_is_empty() {
        assert!(Page::new("https://example.com", "<p></p>", "  \n\t").is_empty());
        assert!(!Page::new("https://example.com", "", "hello").is_empty());
    }
}
