//! Output module for reporting on the index
//!
//! This module handles:
//! - Reading per-site statistics back from storage
//! - Printing them for the command line

pub mod stats;

pub use stats::{load_statistics, print_statistics, IndexStatistics, SiteStatistics};
