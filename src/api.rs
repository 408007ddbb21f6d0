//! Start/stop/status surface for callers
//!
//! Control errors are reported in the response body instead of being raised;
//! a start is acknowledged as soon as the run is dispatched.

use crate::crawler::Orchestrator;
use serde::Serialize;

/// Acknowledgement of a start or stop request
///
/// Serializes as `{"result":true}` or `{"result":false,"error":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponse {
    pub result: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn ok() -> Self {
        Self {
            result: true,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            result: false,
            error: Some(message.into()),
        }
    }
}

/// Indexing status, `{"result":true,"indexing":<bool>}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusResponse {
    pub result: bool,
    pub indexing: bool,
}

/// Thin wrapper over an `Orchestrator`
#[derive(Clone)]
pub struct IndexingApi {
    orchestrator: Orchestrator,
}

impl IndexingApi {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Starts indexing; must be called from within a tokio runtime
    pub fn start_indexing(&self) -> ApiResponse {
        match self.orchestrator.start() {
            Ok(()) => ApiResponse::ok(),
            Err(e) => ApiResponse::error(e.to_string()),
        }
    }

    pub fn stop_indexing(&self) -> ApiResponse {
        match self.orchestrator.stop() {
            Ok(()) => ApiResponse::ok(),
            Err(e) => ApiResponse::error(e.to_string()),
        }
    }

    pub fn indexing_status(&self) -> StatusResponse {
        StatusResponse {
            result: true,
            indexing: self.orchestrator.status(),
        }
    }
}
