//! Job Repository
//!
//! In-memory store of live job records, keyed by job id.

use dashmap::DashMap;
use scriptor_core::domain::job::{JobStatus, ScriptJob, SortOrder};
use std::sync::Arc;
use uuid::Uuid;

use super::record::JobRecord;

/// Concurrent map from job id to its record
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: DashMap<Uuid, Arc<JobRecord>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record, returning whatever was stored under the same id
    pub fn put(&self, record: Arc<JobRecord>) -> Option<Arc<JobRecord>> {
        self.jobs.insert(record.id(), record)
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<JobRecord>> {
        self.jobs.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Snapshot of every record matching `filter`, ordered by id
    ///
    /// Records are cloned out of the map before being snapshotted, so no
    /// shard lock is held while a record's own lock is taken.
    pub fn list(&self, filter: Option<&[JobStatus]>, order: SortOrder) -> Vec<ScriptJob> {
        let records: Vec<Arc<JobRecord>> = self
            .jobs
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut jobs: Vec<ScriptJob> = records
            .iter()
            .map(|record| record.snapshot())
            .filter(|job| filter.is_none_or(|statuses| statuses.contains(&job.status)))
            .collect();

        match order {
            SortOrder::Asc => jobs.sort_by(|a, b| a.id.cmp(&b.id)),
            SortOrder::Desc => jobs.sort_by(|a, b| b.id.cmp(&a.id)),
        }

        jobs
    }

    pub fn remove(&self, id: Uuid) -> Option<Arc<JobRecord>> {
        self.jobs.remove(&id).map(|(_, record)| record)
    }

    /// Removes the record only if it has reached a terminal status
    pub fn remove_if_terminal(&self, id: Uuid) -> Option<Arc<JobRecord>> {
        self.jobs
            .remove_if(&id, |_, record| record.status().is_terminal())
            .map(|(_, record)| record)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
