//! Job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Snapshot of a submitted script and its execution lifecycle
///
/// The server owns the live record; every read hands out one of these
/// detached copies, so callers never need to lock anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptJob {
    pub id: Uuid,
    pub script: String,
    pub status: JobStatus,
    pub stdout: String,
    pub stderr: String,
    pub output: Option<String>,
    pub error: Option<String>,
    pub stack_trace: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub execution_time_ms: Option<u64>,
}

/// Job execution status
///
/// `Queued -> Executing -> {Completed | Failed | Stopped}`, plus
/// `Queued -> Stopped` for jobs cancelled before a worker picked them up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Executing,
    Completed,
    Failed,
    Stopped,
}

impl JobStatus {
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Queued,
        JobStatus::Executing,
        JobStatus::Completed,
        JobStatus::Failed,
        JobStatus::Stopped,
    ];

    /// Terminal states admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Stopped
        )
    }

    /// Whether the state graph allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match (self, next) {
            (JobStatus::Queued, JobStatus::Executing) => true,
            (JobStatus::Queued, JobStatus::Stopped) => true,
            (JobStatus::Executing, JobStatus::Completed) => true,
            (JobStatus::Executing, JobStatus::Failed) => true,
            (JobStatus::Executing, JobStatus::Stopped) => true,
            (JobStatus::Queued, _)
            | (JobStatus::Executing, _)
            | (JobStatus::Completed, _)
            | (JobStatus::Failed, _)
            | (JobStatus::Stopped, _) => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Executing => "executing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Stopped => "stopped",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ParseError::new("status", s))
    }
}

/// Parse a comma-separated status list such as `"completed,failed"`
///
/// Empty segments are ignored, so `""` yields an empty filter.
pub fn parse_status_list(input: &str) -> Result<Vec<JobStatus>, ParseError> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(JobStatus::from_str)
        .collect()
}

/// Ordering applied to job listings (by id)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(ParseError::new("sort order", s)),
        }
    }
}

/// Error returned when a status or sort order name is not recognised
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    kind: &'static str,
    value: String,
}

impl ParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for ParseError {}
