/// Site status definitions for tracking indexing progress
use std::fmt;

/// The persisted status of a site's current crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteStatus {
    /// Pages are being fetched for this site
    Indexing,

    /// The crawl finished without a site-level error
    Indexed,

    /// The crawl failed or was stopped; see the site's last error
    Failed,
}

impl SiteStatus {
    /// Returns true for INDEXED and FAILED
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Indexed | Self::Failed)
    }

    /// Status only moves forward within a run: INDEXING -> {INDEXED, FAILED}
    pub fn can_transition_to(&self, next: SiteStatus) -> bool {
        matches!(
            (self, next),
            (Self::Indexing, Self::Indexed) | (Self::Indexing, Self::Failed)
        )
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Indexing => "INDEXING",
            Self::Indexed => "INDEXED",
            Self::Failed => "FAILED",
        }
    }

    /// Parses a status from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "INDEXING" => Some(Self::Indexing),
            "INDEXED" => Some(Self::Indexed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn all_statuses() -> [Self; 3] {
        [Self::Indexing, Self::Indexed, Self::Failed]
    }
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// The state machine of one site run controller
///
/// `Pending` exists only in memory: a site has no row until cleanup of the
/// previous run is done and the INDEXING row is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitePhase {
    Pending,
    Active(SiteStatus),
}

impl SitePhase {
    /// Attempts to move to `next`; returns false and stays put if not allowed
    pub fn advance(&mut self, next: SiteStatus) -> bool {
        let allowed = match self {
            Self::Pending => next == SiteStatus::Indexing,
            Self::Active(current) => current.can_transition_to(next),
        };

        if allowed {
            *self = Self::Active(next);
        }
        allowed
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Active(status) if status.is_terminal())
    }
}
