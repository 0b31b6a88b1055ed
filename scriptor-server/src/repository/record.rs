//! Live job record
//!
//! A [`JobRecord`] is the mutable state of one submitted script. The status
//! lives in a `watch` channel so that every transition is a compare-and-set
//! and waiters can be woken on change; everything else sits behind a mutex
//! owned by the execution task.
//!
//! Lock order is always `state` then `status`. `stop()` only touches
//! `status`, so it never blocks on the execution task.

use chrono::{DateTime, Utc};
use scriptor_core::domain::job::{JobStatus, ScriptJob};
use scriptor_core::engine::{Outcome, OutputBuffer};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;
use tokio::sync::watch;
use uuid::Uuid;

pub struct JobRecord {
    id: Uuid,
    script: String,
    submitted_at: DateTime<Utc>,
    status: watch::Sender<JobStatus>,
    state: Mutex<RecordState>,
}

#[derive(Debug, Default)]
struct RecordState {
    stdout: String,
    stderr: String,
    output: Option<String>,
    error: Option<String>,
    stack_trace: Option<String>,
    started_at: Option<DateTime<Utc>>,
    started: Option<Instant>,
    execution_time_ms: Option<u64>,
}

impl JobRecord {
    /// Creates a record in the `Queued` state
    pub fn new(id: Uuid, script: String) -> Self {
        Self {
            id,
            script,
            submitted_at: Utc::now(),
            status: watch::Sender::new(JobStatus::Queued),
            state: Mutex::new(RecordState::default()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn status(&self) -> JobStatus {
        *self.status.borrow()
    }

    /// Receiver notified on every status transition
    pub fn subscribe(&self) -> watch::Receiver<JobStatus> {
        self.status.subscribe()
    }

    /// Atomically moves `from -> to`
    ///
    /// Returns false when the current status is not `from` or the state
    /// graph forbids the move; the status is left untouched in that case.
    pub fn transition(&self, from: JobStatus, to: JobStatus) -> bool {
        if !from.can_transition_to(to) {
            return false;
        }

        self.status.send_if_modified(|current| {
            if *current == from {
                *current = to;
                true
            } else {
                false
            }
        })
    }

    /// `Queued -> Executing`, stamping the start time
    ///
    /// Returns false if the job was stopped before a worker picked it up.
    pub fn start(&self) -> bool {
        let mut state = self.lock_state();
        if !self.transition(JobStatus::Queued, JobStatus::Executing) {
            return false;
        }

        state.started_at = Some(Utc::now());
        state.started = Some(Instant::now());
        true
    }

    /// `Queued | Executing -> Stopped`
    ///
    /// Returns false for unknown transitions (already terminal), which makes
    /// repeated calls harmless.
    pub fn stop(&self) -> bool {
        self.status.send_if_modified(|current| {
            if current.can_transition_to(JobStatus::Stopped) {
                *current = JobStatus::Stopped;
                true
            } else {
                false
            }
        })
    }

    /// Copies the live sinks into the record while the job is executing
    ///
    /// Returns false once the job has left `Executing`; the record is then
    /// owned by [`JobRecord::finish`] and must not be overwritten.
    pub fn record_output(&self, stdout: &OutputBuffer, stderr: &OutputBuffer) -> bool {
        let mut state = self.lock_state();
        if self.status() != JobStatus::Executing {
            return false;
        }

        state.stdout = stdout.snapshot();
        state.stderr = stderr.snapshot();
        true
    }

    /// Applies the engine outcome and the final output snapshot
    ///
    /// A job already moved to `Stopped` keeps that status and gets neither
    /// `output` nor `error`. Returns the resulting status.
    pub fn finish(&self, outcome: Outcome, stdout: &OutputBuffer, stderr: &OutputBuffer) -> JobStatus {
        let mut state = self.lock_state();

        state.stdout = stdout.snapshot_lossy();
        state.stderr = stderr.snapshot_lossy();
        state.execution_time_ms = state
            .started
            .map(|started| started.elapsed().as_millis() as u64);

        match outcome {
            Outcome::Success(value) => {
                if self.transition(JobStatus::Executing, JobStatus::Completed) {
                    state.output = Some(value);
                }
            }
            Outcome::Failure {
                message,
                stack_trace,
            } => {
                if self.transition(JobStatus::Executing, JobStatus::Failed) {
                    state.error = Some(message);
                    state.stack_trace = Some(stack_trace);
                }
            }
            Outcome::Aborted => {
                self.transition(JobStatus::Executing, JobStatus::Stopped);
            }
        }

        self.status()
    }

    /// Detached copy of the record
    ///
    /// Status and fields are read under the same lock, so a terminal status
    /// is never paired with fields from before the terminal write.
    pub fn snapshot(&self) -> ScriptJob {
        let state = self.lock_state();

        ScriptJob {
            id: self.id,
            script: self.script.clone(),
            status: self.status(),
            stdout: state.stdout.clone(),
            stderr: state.stderr.clone(),
            output: state.output.clone(),
            error: state.error.clone(),
            stack_trace: state.stack_trace.clone(),
            submitted_at: self.submitted_at,
            started_at: state.started_at,
            execution_time_ms: state.execution_time_ms,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, RecordState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for JobRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRecord")
            .field("id", &self.id)
            .field("status", &self.status())
            .finish()
    }
}
