//! Crawl orchestrator - start/stop/status of indexing runs
//!
//! At most one run is active at a time. A run fans out one site run
//! controller per configured site over a bounded pool and releases the
//! "in progress" flag when the last of them finishes. Stopping cancels the
//! run, fails every site still INDEXING and releases the flag right away;
//! fetches already in flight drain in the background.

use crate::config::{Config, CrawlerConfig, SiteConfig};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::site_runner::{SiteOutcome, SiteRunner, STOPPED_BY_USER};
use crate::state::{ActiveRun, RunState, SiteStatus};
use crate::storage::Storage;
use crate::ControlError;
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;

struct Inner {
    sites: Vec<SiteConfig>,
    store: Arc<dyn Storage>,
    runner: SiteRunner,
    pool_size: usize,
    run_state: RunState,
    /// Number of spawned runs that have not finished draining
    in_flight: watch::Sender<usize>,
}

/// Top-level driver of indexing runs
///
/// Cheap to clone; clones share the same run state.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    /// Creates an orchestrator for the sites and limits of `config`
    pub fn new(config: &Config, store: Arc<dyn Storage>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self::with_sites(config.sites.clone(), &config.crawler, store, fetcher)
    }

    pub fn with_sites(
        sites: Vec<SiteConfig>,
        crawler: &CrawlerConfig,
        store: Arc<dyn Storage>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        let pool_size = crawler.site_pool_size(sites.len());
        let runner = SiteRunner::new(Arc::clone(&store), fetcher, crawler);
        let (in_flight, _) = watch::channel(0);

        Self {
            inner: Arc::new(Inner {
                sites,
                store,
                runner,
                pool_size,
                run_state: RunState::new(),
                in_flight,
            }),
        }
    }

    /// The configured sites, in crawl dispatch order
    pub fn sites(&self) -> &[SiteConfig] {
        &self.inner.sites
    }

    /// Starts a run over every configured site
    ///
    /// Returns as soon as the run is dispatched. Must be called from within a
    /// tokio runtime.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The run was dispatched
    /// * `Err(ControlError::AlreadyRunning)` - A run is already in progress
    pub fn start(&self) -> Result<(), ControlError> {
        let run = self.inner.run_state.begin()?;
        tracing::info!(
            "Starting indexing run {} over {} sites (pool of {})",
            run.id,
            self.inner.sites.len(),
            self.inner.pool_size
        );

        self.inner.in_flight.send_modify(|n| *n += 1);
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let run_id = run.id;
            execute_run(Arc::clone(&inner), run).await;

            if inner.run_state.finish(run_id) {
                tracing::info!("Indexing run {} finished", run_id);
            } else {
                tracing::debug!("Stopped run {} drained", run_id);
            }
            inner.in_flight.send_modify(|n| *n = n.saturating_sub(1));
        });

        Ok(())
    }

    /// Stops the active run
    ///
    /// No new fetch is dispatched once this returns, and every site still
    /// INDEXING is moved to FAILED with "stopped by user".
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The run was stopped
    /// * `Err(ControlError::NotRunning)` - No run is in progress
    pub fn stop(&self) -> Result<(), ControlError> {
        let run = self.inner.run_state.cancel()?;
        tracing::info!("Stopping indexing run {}", run.id);

        match self.inner.store.find_sites_by_status(SiteStatus::Indexing) {
            Ok(sites) => {
                for site in sites {
                    match self.inner.store.update_site_status(
                        site.id,
                        SiteStatus::Indexing,
                        SiteStatus::Failed,
                        Some(STOPPED_BY_USER),
                    ) {
                        Ok(true) => tracing::info!("Site {} stopped", site.url),
                        Ok(false) => tracing::debug!("Site {} finished before stop", site.url),
                        Err(e) => tracing::error!("Could not fail site {}: {}", site.url, e),
                    }
                }
            }
            Err(e) => tracing::error!("Could not list indexing sites: {}", e),
        }

        self.inner.run_state.release();
        Ok(())
    }

    /// Returns whether a run is in progress
    pub fn status(&self) -> bool {
        self.inner.run_state.is_running()
    }

    /// Waits until every started run, stopped ones included, has drained
    pub async fn wait_until_idle(&self) {
        let mut rx = self.inner.in_flight.subscribe();
        // The sender lives in `inner`, so the channel cannot close here
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

/// Runs every configured site through the outer pool and waits for all of them
async fn execute_run(inner: Arc<Inner>, run: ActiveRun) {
    let pool = Arc::new(Semaphore::new(inner.pool_size));
    let mut site_tasks = JoinSet::new();

    for site in inner.sites.iter().cloned() {
        let inner = Arc::clone(&inner);
        let pool = Arc::clone(&pool);
        let token = run.token.clone();

        site_tasks.spawn(async move {
            let outcome = match pool.acquire_owned().await {
                Ok(_permit) => inner.runner.run_site(&site, &token).await,
                Err(_) => SiteOutcome::Skipped,
            };
            (site, outcome)
        });
    }

    let (mut indexed, mut failed, mut stopped, mut skipped) = (0, 0, 0, 0);
    while let Some(joined) = site_tasks.join_next().await {
        match joined {
            Ok((site, outcome)) => {
                tracing::debug!("Site {} finished: {:?}", site.url, outcome);
                match outcome {
                    SiteOutcome::Indexed { .. } => indexed += 1,
                    SiteOutcome::Failed { .. } => failed += 1,
                    SiteOutcome::Stopped { .. } => stopped += 1,
                    SiteOutcome::Skipped => skipped += 1,
                }
            }
            Err(e) => {
                failed += 1;
                tracing::error!("Site task of run {} aborted: {}", run.id, e);
            }
        }
    }

    tracing::info!(
        "Run {} complete: {} indexed, {} failed, {} stopped, {} skipped",
        run.id,
        indexed,
        failed,
        stopped,
        skipped
    );
}
