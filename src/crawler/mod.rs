//! Crawler module for site traversal and run orchestration
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the `Fetcher` seam
//! - HTML parsing, link extraction and content classification
//! - Per-site traversal with dedup through the visited set
//! - Site run control and start/stop orchestration

mod classifier;
mod fetcher;
mod orchestrator;
mod page_crawler;
mod parser;
mod site_runner;
mod visited;

pub use classifier::{classify, Classification, ContentKind, TRANSPORT_FAILURE_CODE};
pub use fetcher::{build_http_client, FetchError, FetchResponse, Fetcher, HttpFetcher};
pub use orchestrator::Orchestrator;
pub use page_crawler::{CrawlSummary, PageCrawler};
pub use parser::extract_links;
pub use site_runner::{SiteOutcome, SiteRunner, STOPPED_BY_USER};
pub use visited::VisitedSet;
