//! Output sampler
//!
//! Runs next to a job's engine call, copying its sinks into the record so
//! readers see progressive output. It is also the task that turns a stop
//! request into an engine interrupt.

use scriptor_core::domain::job::JobStatus;
use scriptor_core::engine::{InterruptHandle, OutputBuffer};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{debug, info};

use crate::repository::JobRecord;

/// Spawns the sampler for an `Executing` record
///
/// The loop samples on every tick and also wakes as soon as the status
/// changes. Once the record has left `Executing` it exits; if the record was
/// stopped, `interrupt` is raised exactly once.
pub fn spawn_output_sampler(
    record: Arc<JobRecord>,
    stdout: OutputBuffer,
    stderr: OutputBuffer,
    interrupt: InterruptHandle,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let job_id = record.id();
        let mut status = record.subscribe();
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !record.record_output(&stdout, &stderr) {
                        break;
                    }
                }
                changed = status.wait_for(|s| *s != JobStatus::Executing) => {
                    if changed.is_err() {
                        debug!("Status channel closed for job {}", job_id);
                    }
                    break;
                }
            }
        }

        if record.status() == JobStatus::Stopped {
            info!("Interrupting stopped job {}", job_id);
            interrupt.interrupt();
        }

        debug!("Output sampler for job {} finished", job_id);
    })
}
