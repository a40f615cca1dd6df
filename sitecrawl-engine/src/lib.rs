pub mod config;
pub mod crawler;
pub mod dedup;
pub mod error;
pub mod filter;
pub mod normalize;
pub mod page;
pub mod resolve;
pub mod visitor;

pub use config::CrawlerConfig;
pub use crawler::{CrawlStats, Crawler, PageStream};
pub use dedup::{
    ContentDetector, DetectorFactory, HashBasedDetector, SimilarityBasedDetector,
    hash_detector_factory,
};
pub use error::CrawlError;
pub use filter::is_in_scope;
pub use normalize::{PrefixOverrides, PrefixRule, default_prefix, normalize_url};
pub use page::Page;
pub use resolve::extract_urls;
pub use visitor::{HttpVisitor, Visitor};
