use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use url::Url;

/// Collapse a URL to the identity used for visited-set dedup: scheme, host
/// (with port) and path, with query, fragment and trailing slashes removed.
///
/// Unparseable input is returned unchanged.
pub fn normalize_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => format!("{}{}", origin_of(&parsed), parsed.path().trim_end_matches('/')),
        Err(_) => url.to_string(),
    }
}

/// Every spelling of `url` that should be treated as the same page.
pub fn url_variations(url: &str) -> HashSet<String> {
    let base = normalize_url(url);
    let mut variations = HashSet::new();

    let path_has_slash = Url::parse(url)
        .map(|u| u.path().ends_with('/'))
        .unwrap_or(false);
    if !path_has_slash {
        variations.insert(format!("{}/", base));
    }
    variations.insert(base);
    variations
}

pub fn is_similar_url(a: &str, b: &str) -> bool {
    normalize_url(a) == normalize_url(b)
}

/// How the default scope prefix is derived for a given host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "rule", content = "segments")]
pub enum PrefixRule {
    /// `scheme://host`
    Host,
    /// `scheme://host` plus the first N path segments of the seed.
    PathSegments(usize),
}

/// Per-host overrides for [`default_prefix`].
///
/// Hosts that keep unrelated projects side by side under `/owner/repo/...`
/// get their prefix narrowed so sibling repositories stay out of scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixOverrides {
    rules: BTreeMap<String, PrefixRule>,
}

impl PrefixOverrides {
    /// A table with no overrides; every host maps to [`PrefixRule::Host`].
    pub fn empty() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    pub fn with_rule(mut self, host: impl Into<String>, rule: PrefixRule) -> Self {
        self.rules.insert(host.into().to_ascii_lowercase(), rule);
        self
    }

    pub fn rule_for(&self, host: &str) -> PrefixRule {
        self.rules
            .get(&host.to_ascii_lowercase())
            .copied()
            .unwrap_or(PrefixRule::Host)
    }
}

impl Default for PrefixOverrides {
    fn default() -> Self {
        Self::empty()
            .with_rule("deepwiki.com", PrefixRule::PathSegments(2))
            .with_rule("github.com", PrefixRule::PathSegments(2))
    }
}

/// Default scope prefix for a seed URL, using the built-in override table.
pub fn default_prefix(url: &str) -> Option<String> {
    default_prefix_with(url, &PrefixOverrides::default())
}

pub fn default_prefix_with(url: &str, overrides: &PrefixOverrides) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let origin = origin_of(&parsed);

    match overrides.rule_for(host) {
        PrefixRule::Host => Some(origin),
        PrefixRule::PathSegments(n) => {
            let segments: Vec<&str> = parsed
                .path_segments()
                .map(|s| s.filter(|seg| !seg.is_empty()).take(n).collect())
                .unwrap_or_default();
            if segments.is_empty() {
                Some(origin)
            } else {
                Some(format!("{}/{}", origin, segments.join("/")))
            }
        }
    }
}

fn origin_of(url: &Url) -> String {
    let host = url.host_str().unwrap_or("");
    match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_query_fragment_and_slash() {
        assert_eq!(normalize_url("https://example.com/page"), "https://example.com/page");
        assert_eq!(normalize_url("https://example.com/page/"), "https://example.com/page");
        assert_eq!(normalize_url("https://example.com/page#section"), "https://example.com/page");
        assert_eq!(normalize_url("https://example.com/page?param=value"), "https://example.com/page");
        assert_eq!(
            normalize_url("https://example.com/page/?param=value#section"),
            "https://example.com/page"
        );
    }

    #[test]
    fn test_normalize_keeps_port() {
        assert_eq!(normalize_url("http://127.0.0.1:8080/a/"), "http://127.0.0.1:8080/a");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for u in [
            "https://example.com",
            "https://example.com/",
            "https://example.com/a//",
            "https://example.com/a/b?x=1#y",
        ] {
            let once = normalize_url(u);
            assert_eq!(normalize_url(&once), once, "not idempotent for {}", u);
        }
    }

    #[test]
    fn test_url_variations() {
        let variations = url_variations("https://example.com/page");
        assert_eq!(variations.len(), 2);
        assert!(variations.contains("https://example.com/page"));
        assert!(variations.contains("https://example.com/page/"));

        let variations = url_variations("https://example.com/page/");
        assert_eq!(variations.len(), 1);
        assert!(variations.contains("https://example.com/page"));
    }

    #[test]
    fn test_is_similar_url() {
        assert!(is_similar_url("https://example.com/page", "https://example.com/page/"));
        assert!(is_similar_url("https://example.com/page#section", "https://example.com/page"));
        assert!(!is_similar_url("https://example.com/page1", "https://example.com/page2"));
        assert!(!is_similar_url("https://example1.com/page", "https://example2.com/page"));
        assert!(!is_similar_url("http://example.com/page", "https://example.com/page"));
    }

    #[test]
    fn test_default_prefix_is_origin() {
        assert_eq!(
            default_prefix("https://example.com/path?q=v").as_deref(),
            Some("https://example.com")
        );
        assert_eq!(
            default_prefix("https://docs.scylladb.com/manual/stable/").as_deref(),
            Some("https://docs.scylladb.com")
        );
    }

    #[test]
    fn test_default_prefix_host_override() {
        assert_eq!(
            default_prefix("https://deepwiki.com/groue/GRDB.swift/").as_deref(),
            Some("https://deepwiki.com/groue/GRDB.swift")
        );

        let overrides = PrefixOverrides::empty()
            .with_rule("special-host.example", PrefixRule::PathSegments(2));
        assert_eq!(
            default_prefix_with("https://special-host.example/owner/repo/docs", &overrides).as_deref(),
            Some("https://special-host.example/owner/repo")
        );
        // Not enough segments: keep whatever is there.
        assert_eq!(
            default_prefix_with("https://special-host.example/owner", &overrides).as_deref(),
            Some("https://special-host.example/owner")
        );
    }

    #[test]
    fn test_default_prefix_rejects_hostless() {
        assert_eq!(default_prefix("not a url"), None);
    }
}
