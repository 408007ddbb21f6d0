//! State module for tracking indexing progress
//!
//! # Components
//!
//! - `SiteStatus`: the persisted status of a site row (INDEXING, INDEXED, FAILED)
//! - `SitePhase`: the in-memory state machine a site run controller walks through
//! - `RunState`: the process-wide "indexing in progress" flag and cancellation token

mod run_state;
mod site_status;

pub use run_state::{ActiveRun, RunState};
pub use site_status::{SitePhase, SiteStatus};
