//! Page crawler - traversal of one site
//!
//! The crawl is an explicit worklist rather than recursion: a frontier of
//! discovered URLs feeds a bounded set of fetch tasks, and every finished task
//! hands its same-site children back to the frontier. The visited set is the
//! only dedup mechanism, so every URL is fetched and persisted at most once.

use crate::crawler::classifier::{classify, Classification, TRANSPORT_FAILURE_CODE};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::visited::VisitedSet;
use crate::storage::{NewPage, SiteRecord, Storage, StorageError};
use crate::url::{normalize_url, SiteRoot};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Log a progress line every this many saved pages
const PROGRESS_INTERVAL: usize = 50;

/// Outcome of one site traversal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Page rows written, failures included
    pub pages_saved: usize,

    /// Page rows recorded as fetch failures
    pub failed_pages: usize,

    /// Dispatching stopped because the run was cancelled
    pub cancelled: bool,

    /// Dispatching stopped because the visited-count ceiling was reached
    pub ceiling_reached: bool,
}

/// Result of handling one claimed URL
#[derive(Debug)]
struct ProcessedUrl {
    failed: bool,
    links: Vec<Url>,
}

/// Shared, read-only inputs of the fetch tasks of one site
struct CrawlContext {
    store: Arc<dyn Storage>,
    fetcher: Arc<dyn Fetcher>,
    root: SiteRoot,
    site_id: i64,
}

impl CrawlContext {
    /// Fetches, classifies and persists one URL
    ///
    /// Fetch and parse problems become a failure row. If the row itself cannot
    /// be written, a failure row is attempted once more; an error from that
    /// second write escapes as a site-level failure.
    async fn process(&self, url: &Url) -> Result<ProcessedUrl, StorageError> {
        let outcome = self.fetcher.fetch(url).await;
        let classification = classify(outcome, &self.root);

        tracing::trace!("Classified {} as {}", url, classification.code());
        if let Classification::FetchFailed { message, .. } = &classification {
            tracing::warn!(
                "Error processing URL '{}': {} ({})",
                url,
                message,
                classification.code()
            );
        }

        let failed = classification.is_failure();
        let (code, content, links) = classification.into_parts();
        let path = self.root.relative_path(url);

        let page = NewPage {
            site_id: self.site_id,
            path,
            code,
            content,
        };

        match self.store.save_page(&page) {
            Ok(_) => {
                tracing::debug!("Saved page {} ({})", url, code);
                Ok(ProcessedUrl { failed, links })
            }
            Err(e) => {
                tracing::warn!("Failed to save page {}: {}", url, e);
                self.store.save_page(&NewPage {
                    code: TRANSPORT_FAILURE_CODE,
                    content: format!("failed to save page: {}", e),
                    ..page
                })?;
                Ok(ProcessedUrl {
                    failed: true,
                    links: Vec::new(),
                })
            }
        }
    }
}

/// Traverses one site and persists a page row per claimed URL
pub struct PageCrawler {
    store: Arc<dyn Storage>,
    fetcher: Arc<dyn Fetcher>,
    max_concurrent_fetches: usize,
    page_ceiling: Option<usize>,
}

impl PageCrawler {
    /// Creates a crawler
    ///
    /// # Arguments
    ///
    /// * `max_concurrent_fetches` - In-flight fetch limit within one site (at least 1)
    /// * `page_ceiling` - Maximum URLs claimed per site, `None` for unlimited
    pub fn new(
        store: Arc<dyn Storage>,
        fetcher: Arc<dyn Fetcher>,
        max_concurrent_fetches: usize,
        page_ceiling: Option<usize>,
    ) -> Self {
        Self {
            store,
            fetcher,
            max_concurrent_fetches: max_concurrent_fetches.max(1),
            page_ceiling,
        }
    }

    /// Crawls `site` starting from `root`
    ///
    /// The cancellation token is checked before every dispatch; fetches already
    /// in flight when it fires are allowed to finish and their pages are kept.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSummary)` - The traversal ended (frontier drained, cancelled or capped)
    /// * `Err(StorageError)` - A page could not be persisted at all
    pub async fn crawl(
        &self,
        site: &SiteRecord,
        root: &SiteRoot,
        visited: Arc<VisitedSet>,
        cancel: &CancellationToken,
    ) -> Result<CrawlSummary, StorageError> {
        let context = Arc::new(CrawlContext {
            store: Arc::clone(&self.store),
            fetcher: Arc::clone(&self.fetcher),
            root: root.clone(),
            site_id: site.id,
        });

        let mut frontier: VecDeque<Url> = VecDeque::from([root.url().clone()]);
        let mut in_flight: JoinSet<(Url, Result<ProcessedUrl, StorageError>)> = JoinSet::new();
        let mut summary = CrawlSummary::default();

        loop {
            // Top up in-flight fetches from the frontier
            while in_flight.len() < self.max_concurrent_fetches {
                if cancel.is_cancelled() {
                    if !summary.cancelled {
                        tracing::info!(
                            "Crawl of {} cancelled, {} URLs left undispatched",
                            root,
                            frontier.len()
                        );
                    }
                    summary.cancelled = true;
                    frontier.clear();
                    break;
                }

                let Some(candidate) = frontier.pop_front() else {
                    break;
                };

                if let Some(limit) = self.page_ceiling {
                    if visited.len() >= limit {
                        tracing::info!("Page limit of {} reached for {}", limit, root);
                        summary.ceiling_reached = true;
                        frontier.clear();
                        break;
                    }
                }

                let url = match normalize_url(candidate.as_str()) {
                    Ok(url) => url,
                    Err(e) => {
                        tracing::debug!("Skipping {}: {}", candidate, e);
                        continue;
                    }
                };

                if !visited.try_visit(&url) {
                    tracing::trace!("Already claimed: {}", url);
                    continue;
                }

                tracing::debug!("Dispatching {}", url);
                let context = Arc::clone(&context);
                in_flight.spawn(async move {
                    let result = context.process(&url).await;
                    (url, result)
                });
            }

            // Reap one finished fetch
            let Some(joined) = in_flight.join_next().await else {
                break;
            };

            match joined {
                Ok((_, Ok(processed))) => {
                    summary.pages_saved += 1;
                    if processed.failed {
                        summary.failed_pages += 1;
                    }
                    frontier.extend(processed.links);

                    if summary.pages_saved % PROGRESS_INTERVAL == 0 {
                        tracing::info!(
                            "Progress for {}: {} pages saved, {} in frontier, {} in flight",
                            root,
                            summary.pages_saved,
                            frontier.len(),
                            in_flight.len()
                        );
                    }
                }
                Ok((url, Err(e))) => {
                    tracing::error!("Could not persist {}: {}", url, e);
                    // Let dispatched work land before giving up on the site
                    while let Some(rest) = in_flight.join_next().await {
                        if let Ok((_, Ok(_))) = rest {
                            summary.pages_saved += 1;
                        }
                    }
                    return Err(e);
                }
                Err(e) => {
                    tracing::error!("Crawl task for {} failed: {}", root, e);
                }
            }
        }

        tracing::debug!(
            "Crawl of {} finished: {} pages ({} failed), {} URLs claimed",
            root,
            summary.pages_saved,
            summary.failed_pages,
            visited.len()
        );

        Ok(summary)
    }
}
