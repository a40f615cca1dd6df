//! Content-level duplicate detection.
//!
//! Two pages reached through different URLs can carry the same body (mirrors,
//! `index.html` vs `/`, tracking parameters the normalizer does not know
//! about). A [`ContentDetector`] remembers the bodies the crawler has accepted
//! so later copies can be skipped.

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Arc;

pub trait ContentDetector: Send {
    fn is_duplicate(&self, content: &str) -> bool;
    fn add_content(&mut self, content: &str);
    fn clear(&mut self);
}

/// Builds a fresh detector for each crawl run.
pub type DetectorFactory = Arc<dyn Fn() -> Box<dyn ContentDetector> + Send + Sync>;

/// Factory for the default hash-based detector.
pub fn hash_detector_factory() -> DetectorFactory {
    Arc::new(|| -> Box<dyn ContentDetector> { Box::new(HashBasedDetector::new()) })
}

/// Exact-match detection on a SHA-256 fingerprint of the body text.
#[derive(Debug, Default)]
pub struct HashBasedDetector {
    fingerprints: HashSet<String>,
}

impl HashBasedDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fingerprint(content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }
}

impl ContentDetector for HashBasedDetector {
    fn is_duplicate(&self, content: &str) -> bool {
        self.fingerprints.contains(&Self::fingerprint(content))
    }

    fn add_content(&mut self, content: &str) {
        self.fingerprints.insert(Self::fingerprint(content));
    }

    fn clear(&mut self) {
        self.fingerprints.clear();
    }
}

/// Placeholder for near-duplicate detection above `threshold`.
///
/// Bodies are recorded but `is_duplicate` never reports a match yet, so
/// callers must not rely on it to catch near-duplicates.
#[derive(Debug)]
pub struct SimilarityBasedDetector {
    threshold: f64,
    contents: Vec<String>,
}

impl SimilarityBasedDetector {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
            contents: Vec::new(),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

impl Default for SimilarityBasedDetector {
    fn default() -> Self {
        Self::new(0.8)
    }
}

impl ContentDetector for SimilarityBasedDetector {
    fn is_duplicate(&self, _content: &str) -> bool {
        false
    }

    fn add_content(&mut self, content: &str) {
        self.contents.push(content.to_string());
    }

    fn clear(&mut self) {
        self.contents.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_detector_exact_match() {
        let mut detector = HashBasedDetector::new();
        assert!(!detector.is_duplicate("hello"));

        detector.add_content("hello");
        assert!(detector.is_duplicate("hello"));
        assert!(!detector.is_duplicate("hello "));
        assert_eq!(detector.len(), 1);
    }

    #[test]
    fn test_hash_detector_clear() {
        let mut detector = HashBasedDetector::new();
        detector.add_content("a");
        detector.add_content("a");
        assert_eq!(detector.len(), 1);

        detector.clear();
        assert!(detector.is_empty());
        assert!(!detector.is_duplicate("a"));
    }

    #[test]
    fn test_fingerprint_is_sha256_hex() {
        assert_eq!(
            HashBasedDetector::fingerprint(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_similarity_detector_never_matches() {
        let mut detector = SimilarityBasedDetector::default();
        detector.add_content("same");
        assert!(!detector.is_duplicate("same"));
        assert_eq!(detector.len(), 1);
        assert_eq!(detector.threshold(), 0.8);

        detector.clear();
        assert!(detector.is_empty());
    }

    #[test]
    fn test_factory_builds_independent_detectors() {
        let factory = hash_detector_factory();
        let mut first = factory();
        first.add_content("x");
        let second = factory();
        assert!(first.is_duplicate("x"));
        assert!(!second.is_duplicate("x"));
    }
}
