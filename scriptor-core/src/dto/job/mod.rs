//! Job DTOs for client/server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::job::{JobStatus, ParseError, SortOrder, parse_status_list};

/// Query string for script submission
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitQuery {
    #[serde(default)]
    pub blocking: bool,
}

/// Query string for job listing
///
/// `status` is a comma-separated list (`completed,failed`); `orderBy` is
/// `asc` or `desc`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListJobsQuery {
    pub status: Option<String>,
    #[serde(rename = "orderBy")]
    pub order_by: Option<String>,
}

impl ListJobsQuery {
    pub fn new(statuses: &[JobStatus], order: Option<SortOrder>) -> Self {
        let status = if statuses.is_empty() {
            None
        } else {
            Some(
                statuses
                    .iter()
                    .map(JobStatus::as_str)
                    .collect::<Vec<_>>()
                    .join(","),
            )
        };

        Self {
            status,
            order_by: order.map(|o| o.to_string()),
        }
    }

    /// Parsed status filter; `None` means "all statuses"
    ///
    /// A present but blank parameter (`?status=`) is treated as absent.
    pub fn statuses(&self) -> Result<Option<Vec<JobStatus>>, ParseError> {
        let parsed = self.status.as_deref().map(parse_status_list).transpose()?;
        Ok(parsed.filter(|statuses| !statuses.is_empty()))
    }

    pub fn order(&self) -> Result<Option<SortOrder>, ParseError> {
        self.order_by.as_deref().map(str::parse).transpose()
    }
}

/// Request to remove finished jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupRequest {
    pub ids: Vec<Uuid>,
}

/// Number of jobs actually removed by a cleanup request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupResponse {
    pub removed: usize,
}

/// Acknowledgement of a stop request
///
/// `stopped` is false when the job was unknown or already terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopResponse {
    pub stopped: bool,
}
