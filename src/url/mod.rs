//! URL handling module for Site-Indexer
//!
//! This module provides URL normalization and the same-site boundary that
//! keeps a crawl inside its configured root.

mod normalize;
mod site;

pub use normalize::normalize_url;
pub use site::SiteRoot;
