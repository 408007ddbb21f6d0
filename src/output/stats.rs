//! Statistics read back from the index database
//!
//! This module provides per-site statistics for inspecting the outcome of
//! a run after the fact.

use crate::state::SiteStatus;
use crate::storage::{Storage, StorageResult};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Statistics of one site row
#[derive(Debug, Clone, PartialEq)]
pub struct SiteStatistics {
    pub url: String,
    pub name: String,
    pub status: SiteStatus,
    pub status_time: DateTime<Utc>,
    pub last_error: Option<String>,

    /// Total page rows of the site
    pub total_pages: u64,

    /// Page rows grouped by stored code
    pub pages_by_code: BTreeMap<u16, u64>,
}

impl SiteStatistics {
    /// Page rows with a 2xx code
    pub fn successful_pages(&self) -> u64 {
        self.pages_by_code
            .iter()
            .filter(|(code, _)| (200..300).contains(*code))
            .map(|(_, count)| count)
            .sum()
    }
}

/// Statistics of the whole index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexStatistics {
    pub sites: Vec<SiteStatistics>,
}

impl IndexStatistics {
    pub fn total_pages(&self) -> u64 {
        self.sites.iter().map(|s| s.total_pages).sum()
    }

    /// Number of sites currently in `status`
    pub fn count_by_status(&self, status: SiteStatus) -> usize {
        self.sites.iter().filter(|s| s.status == status).count()
    }
}

/// Loads statistics for every site in storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(IndexStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query storage
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<IndexStatistics> {
    let mut sites = Vec::new();

    for site in storage.list_sites()? {
        let total_pages = storage.count_pages_by_site(site.id)?;
        let pages_by_code = storage.count_pages_by_code(site.id)?;

        sites.push(SiteStatistics {
            url: site.url,
            name: site.name,
            status: site.status,
            status_time: site.status_time,
            last_error: site.last_error,
            total_pages,
            pages_by_code,
        });
    }

    Ok(IndexStatistics { sites })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &IndexStatistics) {
    println!("=== Index Statistics ===\n");

    println!("Overview:");
    println!("  Sites: {}", stats.sites.len());
    for status in SiteStatus::all_statuses() {
        println!("    {}: {}", status, stats.count_by_status(status));
    }
    println!("  Total pages: {}", stats.total_pages());
    println!();

    for site in &stats.sites {
        println!("{} ({})", site.name, site.url);
        println!(
            "  Status: {} since {}",
            site.status,
            site.status_time.format("%Y-%m-%d %H:%M:%S UTC")
        );
        if let Some(error) = &site.last_error {
            println!("  Last error: {}", error);
        }

        let success_rate = if site.total_pages > 0 {
            (site.successful_pages() as f64 / site.total_pages as f64) * 100.0
        } else {
            0.0
        };
        println!(
            "  Pages: {} ({:.1}% successful)",
            site.total_pages, success_rate
        );
        for (code, count) in &site.pages_by_code {
            println!("    {}: {}", code, count);
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{NewPage, NewSite, PageStore, SiteStore, SqliteStorage};

    #[test]
    fn test_load_statistics() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let site = storage
            .save_site(&NewSite::indexing("https://a.test", "A"))
            .unwrap();
        for (path, code) in [("/", 200), ("/b", 200), ("/gone", 404)] {
            storage
                .save_page(&NewPage {
                    site_id: site.id,
                    path: path.to_string(),
                    code,
                    content: String::new(),
                })
                .unwrap();
        }
        storage
            .update_site_status(site.id, SiteStatus::Indexing, SiteStatus::Indexed, None)
            .unwrap();
        storage
            .save_site(&NewSite::indexing("https://b.test", "B"))
            .unwrap();

        let stats = load_statistics(&storage).unwrap();

        assert_eq!(stats.sites.len(), 2);
        assert_eq!(stats.total_pages(), 3);
        assert_eq!(stats.count_by_status(SiteStatus::Indexed), 1);
        assert_eq!(stats.count_by_status(SiteStatus::Indexing), 1);

        let a = &stats.sites[0];
        assert_eq!(a.url, "https://a.test");
        assert_eq!(a.total_pages, 3);
        assert_eq!(a.successful_pages(), 2);
        assert_eq!(a.pages_by_code.get(&404), Some(&1));
    }

    #[test]
    fn test_empty_index() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let stats = load_statistics(&storage).unwrap();
        assert!(stats.sites.is_empty());
        assert_eq!(stats.total_pages(), 0);
    }
}
