use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("static selector"));

/// Extract every anchor href in `html` and resolve it against `base_url`.
///
/// Hrefs that cannot be turned into an absolute http(s) URL are dropped.
pub fn extract_urls(html: &str, base_url: &str) -> HashSet<String> {
    let Ok(base) = Url::parse(base_url) else {
        return HashSet::new();
    };

    let document = Html::parse_document(html);
    document
        .select(&LINK_SELECTOR)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_href(&base, href.trim()))
        .collect()
}

/// Resolve a single href against `base`.
///
/// Relative references are always joined under the full base path, so
/// `swift-protobuf` on `/docs` becomes `/docs/swift-protobuf`, and each
/// leading `../` drops one segment from that path.
pub fn resolve_href(base: &Url, href: &str) -> Option<String> {
    if href.is_empty() || is_skipped(href) {
        return None;
    }

    let scheme = base.scheme();
    let origin = match base.port() {
        Some(port) => format!("{}://{}:{}", scheme, base.host_str()?, port),
        None => format!("{}://{}", scheme, base.host_str()?),
    };

    let lower = href.to_ascii_lowercase();
    let absolute = if lower.starts_with("http://") || lower.starts_with("https://") {
        href.to_string()
    } else if href.starts_with("//") {
        format!("{}:{}", scheme, href)
    } else if href.starts_with('/') {
        format!("{}{}", origin, href)
    } else if has_scheme(href) {
        // ftp:, data:, and friends
        return None;
    } else {
        let mut segments: Vec<&str> = base
            .path()
            .trim_end_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        let mut rest = href;
        loop {
            if let Some(stripped) = rest.strip_prefix("../") {
                segments.pop();
                rest = stripped;
            } else if rest == ".." {
                segments.pop();
                rest = "";
            } else if let Some(stripped) = rest.strip_prefix("./") {
                rest = stripped;
            } else {
                break;
            }
        }

        let mut path = String::new();
        for segment in &segments {
            path.push('/');
            path.push_str(segment);
        }
        path.push('/');
        path.push_str(rest);
        format!("{}{}", origin, path)
    };

    let collapsed = collapse_slashes(&absolute)?;
    let parsed = Url::parse(&collapsed).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return None;
    }
    Some(parsed.to_string())
}

fn is_skipped(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    href.starts_with('#')
        || lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
}

fn has_scheme(href: &str) -> bool {
    match href.split_once(':') {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Collapse runs of `/` in the path part of an absolute URL, leaving the
/// `scheme://` separator and any query or fragment alone.
fn collapse_slashes(url: &str) -> Option<String> {
    let (scheme, rest) = url.split_once("://")?;
    let authority_end = rest.find('/').unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(authority_end);
    let path_end = tail.find(['?', '#']).unwrap_or(tail.len());
    let (path, suffix) = tail.split_at(path_end);

    let mut collapsed = String::with_capacity(path.len());
    let mut previous_slash = false;
    for c in path.chars() {
        if c == '/' {
            if previous_slash {
                continue;
            }
            previous_slash = true;
        } else {
            previous_slash = false;
        }
        collapsed.push(c);
    }

    Some(format!("{}://{}{}{}", scheme, authority, collapsed, suffix))
}
