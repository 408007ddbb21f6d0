//! Site run controller
//!
//! Drives one configured site through PENDING -> INDEXING -> {INDEXED, FAILED}.
//! Anything that goes wrong here ends in this site's row and never reaches the
//! orchestrator or the other sites.

use crate::config::{CrawlerConfig, SiteConfig};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::page_crawler::{CrawlSummary, PageCrawler};
use crate::crawler::visited::VisitedSet;
use crate::state::{SitePhase, SiteStatus};
use crate::storage::{NewSite, SiteRecord, Storage, StorageResult};
use crate::url::SiteRoot;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Last error recorded for sites interrupted by a stop request
pub const STOPPED_BY_USER: &str = "stopped by user";

/// How one site's run ended
#[derive(Debug, Clone, PartialEq)]
pub enum SiteOutcome {
    /// The run was stopped before this site got a worker slot; nothing was touched
    Skipped,

    /// The crawl completed and the site is INDEXED
    Indexed { site_id: i64, summary: CrawlSummary },

    /// The crawl was cut short by a stop request; the site is FAILED
    Stopped { site_id: i64, summary: CrawlSummary },

    /// A site-level error; `site_id` is `None` if no row could be created
    Failed { site_id: Option<i64>, error: String },
}

/// Runs the crawl of a single site
pub struct SiteRunner {
    store: Arc<dyn Storage>,
    crawler: PageCrawler,
}

impl SiteRunner {
    pub fn new(store: Arc<dyn Storage>, fetcher: Arc<dyn Fetcher>, config: &CrawlerConfig) -> Self {
        let crawler = PageCrawler::new(
            Arc::clone(&store),
            fetcher,
            config.max_concurrent_fetches as usize,
            config.page_ceiling(),
        );
        Self { store, crawler }
    }

    /// Runs one site to a terminal status
    ///
    /// Stale rows for the site's root are removed first, then a fresh INDEXING
    /// row is created and the site is crawled with a new visited set. The
    /// final status is written with a compare-and-set from INDEXING, so a site
    /// already failed by the stop path keeps that status.
    pub async fn run_site(&self, site: &SiteConfig, cancel: &CancellationToken) -> SiteOutcome {
        if cancel.is_cancelled() {
            tracing::info!("Skipping site {}: indexing was stopped", site.name);
            return SiteOutcome::Skipped;
        }

        let root = match SiteRoot::parse(&site.url) {
            Ok(root) => root,
            Err(e) => {
                tracing::error!("Site {} has an invalid root URL: {}", site.name, e);
                return SiteOutcome::Failed {
                    site_id: None,
                    error: e.to_string(),
                };
            }
        };

        let mut phase = SitePhase::Pending;
        let record = match self.prepare(&root, site) {
            Ok(record) => record,
            Err(e) => {
                tracing::error!("Could not start indexing {}: {}", root, e);
                return SiteOutcome::Failed {
                    site_id: None,
                    error: e.to_string(),
                };
            }
        };
        phase.advance(SiteStatus::Indexing);
        tracing::info!("Indexing site {} ({}), id {}", site.name, root, record.id);

        let visited = Arc::new(VisitedSet::new());
        let result = self.crawler.crawl(&record, &root, visited, cancel).await;

        let (next, last_error) = match &result {
            Err(e) => (SiteStatus::Failed, Some(e.to_string())),
            Ok(summary) if summary.cancelled || cancel.is_cancelled() => {
                (SiteStatus::Failed, Some(STOPPED_BY_USER.to_string()))
            }
            Ok(_) => (SiteStatus::Indexed, None),
        };

        match self.store.update_site_status(
            record.id,
            SiteStatus::Indexing,
            next,
            last_error.as_deref(),
        ) {
            Ok(true) => {
                phase.advance(next);
            }
            Ok(false) => {
                // The stop path got there first
                tracing::debug!("Site {} already left INDEXING", root);
                phase.advance(SiteStatus::Failed);
            }
            Err(e) => {
                tracing::error!("Could not record final status of {}: {}", root, e);
                return SiteOutcome::Failed {
                    site_id: Some(record.id),
                    error: e.to_string(),
                };
            }
        }

        match (phase, result) {
            (SitePhase::Active(SiteStatus::Indexed), Ok(summary)) => {
                tracing::info!(
                    "Site {} indexed: {} pages ({} failed){}",
                    root,
                    summary.pages_saved,
                    summary.failed_pages,
                    if summary.ceiling_reached { ", page limit reached" } else { "" }
                );
                SiteOutcome::Indexed {
                    site_id: record.id,
                    summary,
                }
            }
            (_, Ok(summary)) => {
                tracing::info!(
                    "Site {} stopped after {} pages",
                    root,
                    summary.pages_saved
                );
                SiteOutcome::Stopped {
                    site_id: record.id,
                    summary,
                }
            }
            (_, Err(e)) => {
                tracing::error!("Indexing of {} failed: {}", root, e);
                SiteOutcome::Failed {
                    site_id: Some(record.id),
                    error: e.to_string(),
                }
            }
        }
    }

    /// Removes the previous run's rows for `root` and creates the INDEXING row
    fn prepare(&self, root: &SiteRoot, site: &SiteConfig) -> StorageResult<SiteRecord> {
        if let Some(stale) = self.store.find_site_by_url(root.as_str())? {
            let removed = self.store.delete_site_with_pages(stale.id)?;
            tracing::info!(
                "Removed previous data for {}: site {} with {} pages",
                root,
                stale.id,
                removed
            );
        }

        self.store
            .save_site(&NewSite::indexing(root.as_str(), &site.name))
    }
}
