use regex::Regex;
use url::Url;

/// File extensions that still count as pages. The empty entry covers paths
/// that end in a bare dot.
const PAGE_EXTENSIONS: &[&str] = &[
    "", "html", "htm", "php", "asp", "aspx", "jsp", "md", "markdown", "txt",
];

/// Decide whether `url` is eligible for fetching.
///
/// The prefix check is a plain string prefix match. `pattern` is searched
/// anywhere in the URL, not anchored.
pub fn is_in_scope(url: &str, prefix: Option<&str>, pattern: Option<&Regex>) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };

    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }

    if let Some(prefix) = prefix
        && !url.starts_with(prefix)
    {
        return false;
    }

    if !has_page_extension(parsed.path()) {
        return false;
    }

    if let Some(pattern) = pattern
        && !pattern.is_match(url)
    {
        return false;
    }

    true
}

fn has_page_extension(path: &str) -> bool {
    let Some((_, ext)) = path.rsplit_once('.') else {
        return true;
    };
    // Dots in directory names ("/v1.2/docs") leave a non-alphabetic tail.
    if !ext.chars().all(|c| c.is_ascii_alphabetic()) {
        return true;
    }
    let ext = ext.to_ascii_lowercase();
    PAGE_EXTENSIONS.contains(&ext.as_str())
}
