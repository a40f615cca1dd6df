use crate::config::CrawlerConfig;
use crate::dedup::{ContentDetector, DetectorFactory, hash_detector_factory};
use crate::error::{CrawlError, Result};
use crate::filter::is_in_scope;
use crate::normalize::{default_prefix_with, normalize_url};
use crate::page::Page;
use crate::resolve::extract_urls;
use crate::visitor::{HttpVisitor, Visitor};
use futures::stream::{self, BoxStream, StreamExt};
use regex::Regex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

/// Accepted pages, in breadth-first batch order. Dropping the stream stops
/// the crawl; nothing is fetched until it is polled.
pub type PageStream = BoxStream<'static, Page>;

/// Called with the URLs of each batch right before it is handed to the visitor.
pub type BatchCallback = Arc<dyn Fn(&[String]) + Send + Sync>;
/// Called once with the final counters when a run ends.
pub type StatsCallback = Arc<dyn Fn(&CrawlStats) + Send + Sync>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub batches: usize,
    pub requested: usize,
    pub accepted: usize,
    pub enqueued: usize,
    pub skipped_visited: usize,
    pub skipped_depth: usize,
    pub skipped_empty: usize,
    pub skipped_duplicate: usize,
    pub failed: usize,
    pub unmatched: usize,
}

#[derive(Debug, Clone)]
struct FrontierEntry {
    url: String,
    depth: usize,
}

pub struct Crawler {
    visitor: Arc<dyn Visitor>,
    config: CrawlerConfig,
    pattern: Option<Regex>,
    detector_factory: DetectorFactory,
    batch_callback: Option<BatchCallback>,
    stats_callback: Option<StatsCallback>,
}

impl Crawler {
    /// Crawler backed by an [`HttpVisitor`] built from `config`.
    pub fn new(config: CrawlerConfig) -> Result<Self> {
        let visitor = HttpVisitor::from_config(&config)?;
        Self::with_visitor(config, Arc::new(visitor))
    }

    pub fn with_visitor(config: CrawlerConfig, visitor: Arc<dyn Visitor>) -> Result<Self> {
        config.validate()?;
        let pattern = config.compiled_pattern()?;

        Ok(Self {
            visitor,
            config,
            pattern,
            detector_factory: hash_detector_factory(),
            batch_callback: None,
            stats_callback: None,
        })
    }

    pub fn with_detector_factory(mut self, factory: DetectorFactory) -> Self {
        self.detector_factory = factory;
        self
    }

    pub fn with_batch_callback(mut self, callback: BatchCallback) -> Self {
        self.batch_callback = Some(callback);
        self
    }

    pub fn with_stats_callback(mut self, callback: StatsCallback) -> Self {
        self.stats_callback = Some(callback);
        self
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// The scope prefix a crawl from `seed` would use.
    pub fn effective_prefix(&self, seed: &str) -> Result<String> {
        if let Some(prefix) = &self.config.url_prefix {
            return Ok(prefix.clone());
        }
        default_prefix_with(seed, &self.config.prefix_overrides)
            .ok_or_else(|| CrawlError::InvalidUrl(format!("{} has no host", seed)))
    }

    /// Start a crawl from `seed`.
    ///
    /// Every call gets fresh frontier, visited and fingerprint state, so the
    /// same crawler can be run repeatedly.
    pub fn run(&self, seed: &str) -> Result<PageStream> {
        let parsed = Url::parse(seed)
            .map_err(|e| CrawlError::InvalidUrl(format!("{}: {}", seed, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CrawlError::InvalidUrl(format!(
                "{}: unsupported scheme {}",
                seed,
                parsed.scheme()
            )));
        }
        let prefix = self.effective_prefix(seed)?;

        info!(
            "Starting crawl of {} (depth {}, concurrency {}, prefix {})",
            seed, self.config.max_depth, self.config.concurrency, prefix
        );

        let mut detector = (self.detector_factory)();
        detector.clear();

        let traversal = Traversal {
            visitor: self.visitor.clone(),
            max_depth: self.config.max_depth,
            concurrency: self.config.concurrency.max(1),
            limit: self.config.limit,
            prefix,
            pattern: self.pattern.clone(),
            queue: VecDeque::from([FrontierEntry {
                url: seed.to_string(),
                depth: 0,
            }]),
            visited: HashSet::new(),
            visited_normalized: HashSet::new(),
            detector,
            ready: VecDeque::new(),
            stats: CrawlStats::default(),
            batch_callback: self.batch_callback.clone(),
            stats_callback: self.stats_callback.clone(),
            finished: false,
        };

        let pages = stream::unfold(traversal, |mut traversal| async move {
            let page = traversal.next_page().await?;
            Some((page, traversal))
        });
        Ok(pages.boxed())
    }

    /// Run a crawl to completion and gather every accepted page.
    pub async fn collect(&self, seed: &str) -> Result<Vec<Page>> {
        Ok(self.run(seed)?.collect().await)
    }
}

/// State for a single run. Owned by the page stream.
struct Traversal {
    visitor: Arc<dyn Visitor>,
    max_depth: usize,
    concurrency: usize,
    limit: Option<usize>,
    prefix: String,
    pattern: Option<Regex>,
    queue: VecDeque<FrontierEntry>,
    visited: HashSet<String>,
    visited_normalized: HashSet<String>,
    detector: Box<dyn ContentDetector>,
    ready: VecDeque<Page>,
    stats: CrawlStats,
    batch_callback: Option<BatchCallback>,
    stats_callback: Option<StatsCallback>,
    finished: bool,
}

impl Traversal {
    async fn next_page(&mut self) -> Option<Page> {
        loop {
            if let Some(page) = self.ready.pop_front() {
                return Some(page);
            }
            if self.queue.is_empty() || self.budget_exhausted() {
                self.finish();
                return None;
            }
            self.step().await;
        }
    }

    fn budget_exhausted(&self) -> bool {
        self.limit.is_some_and(|limit| self.stats.accepted >= limit)
    }

    fn is_visited(&self, url: &str, normalized: &str) -> bool {
        self.visited.contains(url) || self.visited_normalized.contains(normalized)
    }

    fn mark_visited(&mut self, url: &str, normalized: String) {
        self.visited.insert(url.to_string());
        self.visited_normalized.insert(normalized);
    }

    /// Pop one batch, fetch it, and sort the results into accepted pages and
    /// new frontier entries.
    async fn step(&mut self) {
        let take = self.concurrency.min(self.queue.len());
        let popped: Vec<FrontierEntry> = self.queue.drain(..take).collect();

        let mut batch = Vec::with_capacity(popped.len());
        for entry in popped {
            if entry.depth > self.max_depth {
                debug!("Skipping {} at depth {}", entry.url, entry.depth);
                self.stats.skipped_depth += 1;
                continue;
            }
            let normalized = normalize_url(&entry.url);
            if self.is_visited(&entry.url, &normalized) {
                debug!("Skipping already visited {}", entry.url);
                self.stats.skipped_visited += 1;
                continue;
            }
            // Claimed before the fetch so later discoveries of the same
            // resource are never queued again.
            self.mark_visited(&entry.url, normalized);
            batch.push(entry);
        }

        if batch.is_empty() {
            return;
        }

        let urls: Vec<String> = batch.iter().map(|e| e.url.clone()).collect();
        self.stats.batches += 1;
        self.stats.requested += urls.len();
        debug!("Fetching batch {} of {} URLs", self.stats.batches, urls.len());
        if let Some(callback) = &self.batch_callback {
            callback(&urls);
        }

        let results = match self.visitor.visit_many(&urls).await {
            Ok(results) => results,
            Err(e) => {
                error!("Batch fetch of {} URLs failed: {}", urls.len(), e);
                self.stats.failed += urls.len();
                return;
            }
        };

        let mut pending: Vec<Option<FrontierEntry>> = batch.into_iter().map(Some).collect();
        for page in results {
            let Some(page) = page else {
                debug!("Visitor returned an empty result slot");
                continue;
            };
            let Some(entry) = take_matching(&mut pending, page.match_url()) else {
                warn!("Dropping page {} that matches no requested URL", page.url);
                self.stats.unmatched += 1;
                continue;
            };
            self.accept(entry, page);
        }

        for entry in pending.into_iter().flatten() {
            debug!("No page returned for {}", entry.url);
            self.stats.failed += 1;
        }
    }

    fn accept(&mut self, entry: FrontierEntry, page: Page) {
        // A redirect target is the same resource, whatever its content turns
        // out to be; don't fetch it again.
        if !page.url.is_empty() && page.url != entry.url {
            let normalized = normalize_url(&page.url);
            self.mark_visited(&page.url, normalized);
        }

        if self.budget_exhausted() {
            debug!("Page budget reached, dropping {}", page.url);
            return;
        }
        if page.is_empty() {
            debug!("Skipping {} with empty content", page.url);
            self.stats.skipped_empty += 1;
            return;
        }
        if self.detector.is_duplicate(&page.content) {
            debug!("Skipping {} with duplicate content", page.url);
            self.stats.skipped_duplicate += 1;
            return;
        }
        self.detector.add_content(&page.content);

        if entry.depth < self.max_depth {
            let base = if page.url.is_empty() {
                entry.url.as_str()
            } else {
                page.url.as_str()
            };
            self.enqueue_links(&page.html, base, entry.depth + 1);
        }

        self.stats.accepted += 1;
        self.ready.push_back(page);
    }

    fn enqueue_links(&mut self, html: &str, base: &str, depth: usize) {
        if depth > self.max_depth {
            return;
        }

        let mut links: Vec<String> = extract_urls(html, base).into_iter().collect();
        links.sort();

        for link in links {
            if !is_in_scope(&link, Some(&self.prefix), self.pattern.as_ref()) {
                continue;
            }
            let normalized = normalize_url(&link);
            if self.is_visited(&link, &normalized) {
                continue;
            }
            self.queue.push_back(FrontierEntry { url: link, depth });
            self.stats.enqueued += 1;
        }
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        let outcome = if self.queue.is_empty() || self.budget_exhausted() {
            "complete"
        } else {
            "abandoned"
        };
        let stats = &self.stats;
        info!(
            "Crawl {}. Accepted {} pages in {} batches ({} empty, {} duplicate, {} failed, {} unmatched, {} left in queue)",
            outcome,
            stats.accepted,
            stats.batches,
            stats.skipped_empty,
            stats.skipped_duplicate,
            stats.failed,
            stats.unmatched,
            self.queue.len()
        );
        if let Some(callback) = &self.stats_callback {
            callback(stats);
        }
    }
}

// Dropping the page stream before it ends still reports the run.
impl Drop for Traversal {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Remove and return the pending entry a returned page belongs to, preferring
/// an exact URL match over a normalized one.
fn take_matching(pending: &mut [Option<FrontierEntry>], url: &str) -> Option<FrontierEntry> {
    let exact = pending
        .iter()
        .position(|e| e.as_ref().is_some_and(|e| e.url == url));
    let index = exact.or_else(|| {
        let normalized = normalize_url(url);
        pending
            .iter()
            .position(|e| e.as_ref().is_some_and(|e| normalize_url(&e.url) == normalized))
    })?;
    pending[index].take()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(url: &str) -> Option<FrontierEntry> {
        Some(FrontierEntry {
            url: url.to_string(),
            depth: 0,
        })
    }

    #[test]
    fn test_take_matching_prefers_exact() {
        let mut pending = vec![entry("https://example.com/a/"), entry("https://example.com/a")];
        let taken = take_matching(&mut pending, "https://example.com/a").unwrap();
        assert_eq!(taken.url, "https://example.com/a");
        assert!(pending[0].is_some());
        assert!(pending[1].is_none());
    }

    #[test]
    fn test_take_matching_falls_back_to_normalized() {
        let mut pending = vec![entry("https://example.com/a")];
        let taken = take_matching(&mut pending, "https://example.com/a/#top").unwrap();
        assert_eq!(taken.url, "https://example.com/a");
        assert!(take_matching(&mut pending, "https://example.com/a").is_none());
    }

    #[test]
    fn test_take_matching_unknown_url() {
        let mut pending = vec![entry("https://example.com/a")];
        assert!(take_matching(&mut pending, "https://example.com/b").is_none());
    }

    #[test]
    fn test_effective_prefix() {
        struct NoopVisitor;
        #[async_trait::async_trait]
        impl Visitor for NoopVisitor {
            async fn visit_many(&self, _urls: &[String]) -> Result<Vec<Option<Page>>> {
                Ok(Vec::new())
            }
        }

        let crawler = Crawler::with_visitor(CrawlerConfig::default(), Arc::new(NoopVisitor)).unwrap();
        assert_eq!(
            crawler.effective_prefix("https://example.com/a/b").unwrap(),
            "https://example.com"
        );

        let crawler = Crawler::with_visitor(
            CrawlerConfig::default().with_url_prefix("https://example.com/docs"),
            Arc::new(NoopVisitor),
        )
        .unwrap();
        assert_eq!(
            crawler.effective_prefix("https://example.com/a/b").unwrap(),
            "https://example.com/docs"
        );
    }
}
