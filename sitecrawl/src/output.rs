use colored::Colorize;
use sitecrawl_engine::{CrawlStats, Page};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Markdown,
    /// One JSON object per line.
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "json" | "jsonl" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub format: OutputFormat,
    /// Maximum characters of page content; 0 keeps everything. JSON output is never truncated.
    pub truncate: usize,
    pub skip_url: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            truncate: 200,
            skip_url: false,
        }
    }
}

/// Cut `content` to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate_content(content: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return content.to_string();
    }
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", content[..cut].trim_end()),
        None => content.to_string(),
    }
}

pub fn render_page(page: &Page, options: &RenderOptions) -> Result<String, serde_json::Error> {
    let rendered = match options.format {
        OutputFormat::Json => serde_json::to_string(page)?,
        OutputFormat::Markdown => render_markdown(page, options),
        OutputFormat::Text => render_text(page, options),
    };
    Ok(rendered)
}

fn render_markdown(page: &Page, options: &RenderOptions) -> String {
    let mut out = String::new();
    let title = page.title.as_deref().unwrap_or(page.url.as_str());
    out.push_str(&format!("## {}\n\n", title));
    if !options.skip_url {
        out.push_str(&format!("<{}>\n\n", page.url));
    }
    out.push_str(&truncate_content(&page.content, options.truncate));
    out.push('\n');
    out
}

fn render_text(page: &Page, options: &RenderOptions) -> String {
    let mut out = String::new();
    match &page.title {
        Some(title) => out.push_str(&format!("{} {}\n", "■".cyan(), title.bold())),
        None => out.push_str(&format!("{} {}\n", "■".cyan(), "(untitled)".dimmed())),
    }
    if !options.skip_url {
        out.push_str(&format!("  {} {}\n", "→".blue(), page.url.bright_white()));
    }
    out.push_str(&format!("  {}\n", truncate_content(&page.content, options.truncate)));
    out
}

/// Totals across every seed crawled in one invocation.
#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    pub seeds: usize,
    pub failed_seeds: usize,
    pub pages: usize,
    pub stats: CrawlStats,
}

impl CrawlSummary {
    pub fn absorb(&mut self, stats: &CrawlStats) {
        self.stats.batches += stats.batches;
        self.stats.requested += stats.requested;
        self.stats.accepted += stats.accepted;
        self.stats.enqueued += stats.enqueued;
        self.stats.skipped_visited += stats.skipped_visited;
        self.stats.skipped_depth += stats.skipped_depth;
        self.stats.skipped_empty += stats.skipped_empty;
        self.stats.skipped_duplicate += stats.skipped_duplicate;
        self.stats.failed += stats.failed;
        self.stats.unmatched += stats.unmatched;
    }

    pub fn render(&self) -> String {
        let mut line = format!(
            "{} {} pages from {} seed(s) | fetched {} in {} batches | {} duplicate, {} empty, {} failed",
            "✓".green().bold(),
            self.pages,
            self.seeds,
            self.stats.requested,
            self.stats.batches,
            self.stats.skipped_duplicate,
            self.stats.skipped_empty,
            self.stats.failed
        );
        if self.failed_seeds > 0 {
            line.push_str(&format!(" | {} seed(s) could not be crawled", self.failed_seeds));
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("TEXT").unwrap(), OutputFormat::Text);
        assert_eq!(OutputFormat::from_str("md").unwrap(), OutputFormat::Markdown);
        assert_eq!(OutputFormat::from_str("jsonl").unwrap(), OutputFormat::Json);
        assert!(OutputFormat::from_str("xml").is_err());
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate_content("héllo wörld", 5), "héllo...");
        assert_eq!(truncate_content("short", 10), "short");
        assert_eq!(truncate_content("exactly", 7), "exactly");
        assert_eq!(truncate_content("keep everything", 0), "keep everything");
    }

    #[test]
    fn test_summary_absorbs_stats() {
        let mut summary = CrawlSummary::default();
        let stats = CrawlStats {
            batches: 2,
            failed: 1,
            ..Default::default()
        };
        summary.absorb(&stats);
        summary.absorb(&stats);
        assert_eq!(summary.stats.batches, 4);
        assert_eq!(summary.stats.failed, 2);
    }
}
