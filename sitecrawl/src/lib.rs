pub mod handlers;
pub mod output;

pub use handlers::{
    CrawlOverrides, build_config, execute_crawl, init_tracing, limit_from_arg, load_urls_from_file,
    load_urls_from_source, log_level, parse_url_line,
};
pub use output::{CrawlSummary, OutputFormat, RenderOptions, render_page, truncate_content};
