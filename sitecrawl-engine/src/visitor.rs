use crate::config::CrawlerConfig;
use crate::error::Result;
use crate::page::Page;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};

/// Fetches pages for the traversal engine.
///
/// Implementations may fetch the batch concurrently and may return results in
/// any order. A URL that could not be fetched is reported as `None` (or simply
/// left out); an `Err` means the whole batch failed.
#[async_trait]
pub trait Visitor: Send + Sync {
    async fn visit_many(&self, urls: &[String]) -> Result<Vec<Option<Page>>>;
}

static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("static selector"));
static BODY_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("static selector"));

const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "svg"];

/// Plain HTTP visitor backed by reqwest. No JavaScript rendering.
pub struct HttpVisitor {
    client: Client,
    concurrency: usize,
}

impl HttpVisitor {
    pub fn new() -> Result<Self> {
        Self::from_config(&CrawlerConfig::default())
    }

    pub fn from_config(config: &CrawlerConfig) -> Result<Self> {
        let timeout = config.timeout();
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(timeout)
            .connect_timeout(timeout / 2)
            .pool_max_idle_per_host(config.concurrency.max(1))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self::with_client(client, config.concurrency))
    }

    pub fn with_client(client: Client, concurrency: usize) -> Self {
        Self {
            client,
            concurrency: concurrency.max(1),
        }
    }

    async fn fetch(&self, url: &str) -> Result<Option<Page>> {
        debug!("Fetching {}", url);
        let response = self.client.get(url).send().await?;

        let status_code = response.status().as_u16();
        if !response.status().is_success() {
            warn!("Fetch of {} returned HTTP {}", url, status_code);
            return Ok(None);
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let kind = content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase())
            .unwrap_or_else(|| "text/html".to_string());
        let is_html = kind.contains("text/html") || kind.contains("application/xhtml");
        if !is_html && !kind.starts_with("text/") {
            debug!("Skipping {} with content type {}", url, kind);
            return Ok(None);
        }

        let body = response.text().await?;

        let mut page = if is_html {
            let (title, content) = extract_text(&body);
            let mut page = Page::new(final_url, body, content);
            page.title = title;
            page
        } else {
            Page::new(final_url, String::new(), body)
        };
        page.requested_url = Some(url.to_string());
        page.status_code = status_code;
        page.content_type = content_type;
        Ok(Some(page))
    }
}

#[async_trait]
impl Visitor for HttpVisitor {
    async fn visit_many(&self, urls: &[String]) -> Result<Vec<Option<Page>>> {
        let pages: Vec<Option<Page>> = stream::iter(urls.to_vec())
            .map(|url| async move {
                match self.fetch(&url).await {
                    Ok(page) => page,
                    Err(e) => {
                        warn!("Failed to fetch {}: {}", url, e);
                        None
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        Ok(pages)
    }
}

/// Pull the document title and visible body text out of an HTML page.
pub fn extract_text(html: &str) -> (Option<String>, String) {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|t| collapse_whitespace(&t.text().collect::<String>()))
        .filter(|t| !t.is_empty());

    let mut text = String::new();
    let root = document
        .select(&BODY_SELECTOR)
        .next()
        .unwrap_or_else(|| document.root_element());
    collect_text(root, &mut text);

    (title, collapse_whitespace(&text))
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(el) if !SKIPPED_ELEMENTS.contains(&el.name()) => {
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(child_ref, out);
                }
            }
            _ => {}
        }
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_skips_scripts() {
        let html = r#"<html><head><title> Docs  Home </title></head>
            <body><h1>Hello</h1><script>var x = 1;</script>
            <p>world <b>again</b></p><style>p{}</style></body></html>"#;
        let (title, content) = extract_text(html);
        assert_eq!(title.as_deref(), Some("Docs Home"));
        assert_eq!(content, "Hello world again");
    }

    #[test]
    fn test_extract_text_empty_body() {
        let (title, content) = extract_text("<html><body>   </body></html>");
        assert_eq!(title, None);
        assert!(content.is_empty());
    }
}
