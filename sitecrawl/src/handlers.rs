use crate::output::{CrawlSummary, OutputFormat, RenderOptions, render_page};
use anyhow::Context;
use clap::ArgMatches;
use colored::Colorize;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use sitecrawl_engine::{CrawlStats, Crawler, CrawlerConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::level_filters::LevelFilter;
use url::Url;

/// Load URLs from either a file or a single URL argument
pub fn load_urls_from_source(
    url: Option<&Url>,
    hosts_file: Option<&PathBuf>,
) -> Result<Vec<String>, String> {
    if let Some(hosts_file_path) = hosts_file {
        load_urls_from_file(hosts_file_path)
    } else if let Some(url) = url {
        Ok(vec![url.as_str().to_string()])
    } else {
        Err("Either --url or --hosts-file must be provided".to_string())
    }
}

/// Load and parse seed URLs from a file, one per line. Blank lines and `#`
/// comments are ignored.
pub fn load_urls_from_file(path: &Path) -> Result<Vec<String>, String> {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
    let content = fs::read_to_string(&expanded)
        .map_err(|e| format!("Failed to read hosts file {}: {}", path.display(), e))?;

    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(parse_url_line)
        .collect();

    if urls.is_empty() {
        return Err(format!("No valid URLs found in {}", path.display()));
    }

    Ok(urls)
}

/// Parse a single line as a URL, trying to add https:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    if let Ok(url) = Url::parse(line) {
        if matches!(url.scheme(), "http" | "https") {
            return Some(line.to_string());
        }
        // `host:port` parses with the host as its scheme; anything else with
        // an explicit scheme is not crawlable.
        if line.contains("://") || (url.cannot_be_a_base() && !looks_like_host_port(line)) {
            eprintln!("{} Skipping unsupported URL '{}'", "⚠".yellow(), line);
            return None;
        }
    }

    let with_scheme = format!("https://{}", line);
    if let Ok(url) = Url::parse(&with_scheme)
        && url.host_str().is_some()
    {
        return Some(with_scheme);
    }

    eprintln!("{} Skipping invalid URL '{}'", "⚠".yellow(), line);
    None
}

fn looks_like_host_port(line: &str) -> bool {
    line.rsplit_once(':')
        .is_some_and(|(_, port)| port.split('/').next().is_some_and(|p| p.parse::<u16>().is_ok()))
}

/// `-1` (or any negative value) means "no limit".
pub fn limit_from_arg(limit: i64) -> Option<usize> {
    usize::try_from(limit).ok()
}

/// Crawl settings given explicitly on the command line. Anything left as
/// `None` keeps the value from the config file or the built-in default.
#[derive(Debug, Clone, Default)]
pub struct CrawlOverrides {
    pub max_depth: Option<usize>,
    pub concurrency: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub url_prefix: Option<String>,
    pub filter_pattern: Option<String>,
    pub limit: Option<i64>,
}

impl CrawlOverrides {
    pub fn from_matches(args: &ArgMatches) -> Self {
        Self {
            max_depth: args.get_one::<usize>("depth").copied(),
            concurrency: args.get_one::<usize>("concurrency").copied(),
            timeout_secs: args.get_one::<u64>("timeout").copied(),
            url_prefix: args.get_one::<String>("prefix").cloned(),
            filter_pattern: args.get_one::<String>("filter").cloned(),
            limit: args.get_one::<i64>("limit").copied(),
        }
    }

    pub fn apply(&self, mut config: CrawlerConfig) -> CrawlerConfig {
        if let Some(depth) = self.max_depth {
            config = config.with_max_depth(depth);
        }
        if let Some(concurrency) = self.concurrency {
            config = config.with_concurrency(concurrency);
        }
        if let Some(timeout) = self.timeout_secs {
            config = config.with_timeout_secs(timeout);
        }
        if let Some(prefix) = &self.url_prefix {
            config = config.with_url_prefix(prefix.clone());
        }
        if let Some(pattern) = &self.filter_pattern {
            config = config.with_filter_pattern(pattern.clone());
        }
        if let Some(limit) = self.limit {
            config = config.with_limit(limit_from_arg(limit));
        }
        config
    }
}

/// Load the config file, if one was given, and lay the command-line overrides on top.
pub fn build_config(
    config_path: Option<&Path>,
    overrides: &CrawlOverrides,
) -> anyhow::Result<CrawlerConfig> {
    let base = match config_path {
        Some(path) => {
            let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
            CrawlerConfig::from_json_file(&expanded)
                .with_context(|| format!("Failed to load config {}", path.display()))?
        }
        None => CrawlerConfig::default(),
    };

    let config = overrides.apply(base);
    config.validate().context("Invalid crawl settings")?;
    Ok(config)
}

/// Log level for the given `-v` count; `--quiet` wins over verbosity.
pub fn log_level(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Install the stderr log subscriber. Safe to call more than once.
pub fn init_tracing(verbosity: u8, quiet: bool) {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(log_level(verbosity, quiet))
        .with_target(false)
        .try_init();
}

pub async fn handle_crawl(args: &ArgMatches, quiet: bool) {
    let url = args.get_one::<Url>("url");
    let hosts_file = args.get_one::<PathBuf>("hosts-file");

    let seeds = match load_urls_from_source(url, hosts_file) {
        Ok(seeds) => seeds,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    let config = match build_config(
        args.get_one::<PathBuf>("config").map(PathBuf::as_path),
        &CrawlOverrides::from_matches(args),
    ) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {:#}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    let format = args
        .get_one::<String>("format")
        .map(|f| f.parse::<OutputFormat>())
        .transpose()
        .unwrap_or_else(|e| {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        })
        .unwrap_or(OutputFormat::Text);
    let options = RenderOptions {
        format,
        truncate: args.get_one::<usize>("truncate").copied().unwrap_or(200),
        skip_url: args.get_flag("skip-url"),
    };

    match execute_crawl(&seeds, config, &options, quiet).await {
        Ok(summary) => {
            if !quiet {
                eprintln!("{}", summary.render());
            }
            if summary.failed_seeds > 0 && summary.failed_seeds == summary.seeds {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{} Crawl failed: {:#}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    }
}

/// Crawl each seed in turn, printing pages to stdout as they arrive.
///
/// A seed that cannot be started (bad URL, no host) is reported and counted
/// in the summary; the remaining seeds still run.
pub async fn execute_crawl(
    seeds: &[String],
    config: CrawlerConfig,
    options: &RenderOptions,
    quiet: bool,
) -> anyhow::Result<CrawlSummary> {
    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .context("Invalid progress template")?,
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Starting crawl...");
        pb
    };

    let last_stats: Arc<Mutex<Option<CrawlStats>>> = Arc::new(Mutex::new(None));
    let stats_slot = last_stats.clone();
    let batch_pb = pb.clone();

    let crawler = Crawler::new(config)?
        .with_batch_callback(Arc::new(move |urls: &[String]| {
            let first = urls.first().map(String::as_str).unwrap_or("");
            batch_pb.set_message(format!("Fetching {} page(s): {}", urls.len(), first));
        }))
        .with_stats_callback(Arc::new(move |stats: &CrawlStats| {
            if let Ok(mut slot) = stats_slot.lock() {
                *slot = Some(stats.clone());
            }
        }));

    let mut summary = CrawlSummary::default();
    for seed in seeds {
        summary.seeds += 1;
        pb.set_message(format!(
            "Crawling {} (depth {}, {} at a time)",
            seed,
            crawler.config().max_depth,
            crawler.config().concurrency
        ));
        let mut pages = match crawler.run(seed) {
            Ok(pages) => pages,
            Err(e) => {
                summary.failed_seeds += 1;
                pb.suspend(|| eprintln!("{} {}: {}", "✗".red().bold(), seed, e));
                continue;
            }
        };

        while let Some(page) = pages.next().await {
            summary.pages += 1;
            let rendered = render_page(&page, options)?;
            pb.suspend(|| println!("{}", rendered));
        }

        let stats = last_stats.lock().ok().and_then(|mut slot| slot.take());
        if let Some(stats) = stats {
            summary.absorb(&stats);
        }
    }

    pb.finish_and_clear();
    Ok(summary)
}
