//! Per-site dedup of normalized URLs

use dashmap::DashSet;
use url::Url;

/// Concurrency-safe set of URLs claimed during one site's crawl
///
/// A claim is permanent for the lifetime of the set; there is no removal.
/// Callers normalize URLs before claiming them so that equivalent spellings
/// collide.
#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: DashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claims `url`
    ///
    /// Returns true iff this call inserted it, i.e. the caller is the one
    /// that should fetch the URL.
    pub fn try_visit(&self, url: &Url) -> bool {
        self.urls.insert(url.as_str().to_string())
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.urls.contains(url.as_str())
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_first_claim_wins() {
        let visited = VisitedSet::new();
        assert!(visited.try_visit(&url("https://a.test/b")));
        assert!(!visited.try_visit(&url("https://a.test/b")));
        assert!(visited.contains(&url("https://a.test/b")));
        assert_eq!(visited.len(), 1);
    }

    #[test]
    fn test_distinct_urls_claimed_independently() {
        let visited = VisitedSet::new();
        assert!(visited.try_visit(&url("https://a.test/b")));
        assert!(visited.try_visit(&url("https://a.test/c")));
        assert_eq!(visited.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_claims_exactly_one_winner() {
        let visited = Arc::new(VisitedSet::new());
        let barrier = Arc::new(tokio::sync::Barrier::new(64));

        let handles: Vec<_> = (0..64)
            .map(|_| {
                let visited = Arc::clone(&visited);
                let barrier = Arc::clone(&barrier);
                tokio::spawn(async move {
                    barrier.wait().await;
                    visited.try_visit(&Url::parse("https://a.test/shared").unwrap())
                })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(visited.len(), 1);
    }
}
