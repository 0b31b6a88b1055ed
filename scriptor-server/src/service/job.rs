//! Job Service
//!
//! Accepts script submissions, runs them on a bounded pool of blocking
//! workers and applies the job state machine.

use scriptor_core::domain::job::{JobStatus, ScriptJob, SortOrder};
use scriptor_core::engine::{InterruptHandle, Outcome, OutputBuffer, ScriptEngine};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::sampler::spawn_output_sampler;
use crate::config::Config;
use crate::repository::{JobRecord, JobStore};

/// Service error type
#[derive(Debug, Error, PartialEq)]
pub enum JobError {
    #[error("Job {0} not found")]
    NotFound(Uuid),
}

/// Orchestrates script jobs from submission to a terminal state
#[derive(Clone)]
pub struct JobService {
    store: Arc<JobStore>,
    engine: Arc<dyn ScriptEngine>,
    workers: Arc<Semaphore>,
    sample_interval: Duration,
    blocking_timeout: Duration,
}

impl JobService {
    pub fn new(config: &Config, store: Arc<JobStore>, engine: Arc<dyn ScriptEngine>) -> Self {
        Self {
            store,
            engine,
            workers: Arc::new(Semaphore::new(config.max_parallel_jobs)),
            sample_interval: config.sample_interval,
            blocking_timeout: config.blocking_timeout,
        }
    }

    /// Queues `script` and returns its id without waiting for it to start
    pub fn submit(&self, script: String) -> Uuid {
        self.submit_record(script).id()
    }

    /// Queues `script` and waits for it to finish, up to the blocking timeout
    ///
    /// A job still running when the timeout expires is returned as-is.
    pub async fn submit_blocking(&self, script: String) -> ScriptJob {
        let record = self.submit_record(script);
        Self::wait_for_record(&record, self.blocking_timeout).await;
        record.snapshot()
    }

    /// Waits until job `id` is terminal or `timeout` elapses
    pub async fn wait_for_terminal(&self, id: Uuid, timeout: Duration) -> Result<ScriptJob, JobError> {
        let record = self.store.get(id).ok_or(JobError::NotFound(id))?;
        Self::wait_for_record(&record, timeout).await;
        Ok(record.snapshot())
    }

    pub fn get(&self, id: Uuid) -> Result<ScriptJob, JobError> {
        self.store
            .get(id)
            .map(|record| record.snapshot())
            .ok_or(JobError::NotFound(id))
    }

    pub fn list(&self, statuses: Option<&[JobStatus]>, order: SortOrder) -> Vec<ScriptJob> {
        self.store.list(statuses, order)
    }

    /// Requests cancellation of a queued or executing job
    ///
    /// Returns whether the job moved to `Stopped`. Unknown ids and terminal
    /// jobs are ignored. An executing job is interrupted by its sampler.
    pub fn stop(&self, id: Uuid) -> bool {
        let Some(record) = self.store.get(id) else {
            debug!("Stop requested for unknown job {}", id);
            return false;
        };

        let stopped = record.stop();
        if stopped {
            info!("Job {} stopped", id);
        } else {
            debug!("Job {} already {}, stop ignored", id, record.status());
        }
        stopped
    }

    /// Removes the terminal jobs among `ids`, returning how many were removed
    pub fn cleanup(&self, ids: &[Uuid]) -> usize {
        let mut removed = 0;

        for &id in ids {
            if self.store.remove_if_terminal(id).is_some() {
                debug!("Job {} removed", id);
                removed += 1;
            } else {
                debug!("Job {} not removed (unknown or still active)", id);
            }
        }

        if removed > 0 {
            info!("Cleaned up {} job(s)", removed);
        }
        removed
    }

    fn submit_record(&self, script: String) -> Arc<JobRecord> {
        let record = Arc::new(JobRecord::new(Uuid::new_v4(), script));
        if self.store.put(Arc::clone(&record)).is_some() {
            warn!("Job id collision on {}, previous record replaced", record.id());
        }

        info!("Job {} submitted", record.id());

        let service = self.clone();
        let job = Arc::clone(&record);
        tokio::spawn(async move {
            service.execute_job(job).await;
        });

        record
    }

    async fn wait_for_record(record: &JobRecord, timeout: Duration) {
        let mut status = record.subscribe();
        let finished = tokio::time::timeout(timeout, status.wait_for(JobStatus::is_terminal))
            .await
            .is_ok();

        if !finished {
            debug!("Job {} still {} after {:?}", record.id(), record.status(), timeout);
        }
    }

    /// Runs one job to completion
    ///
    /// Engine failures and panics end up as `Failed` data on the record,
    /// never as errors of this task.
    async fn execute_job(&self, record: Arc<JobRecord>) {
        let job_id = record.id();

        let _permit = {
            let mut status = record.subscribe();
            tokio::select! {
                permit = Arc::clone(&self.workers).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(e) => {
                        error!("Worker pool closed, job {} cannot run: {}", job_id, e);
                        return;
                    }
                },
                _ = status.wait_for(|s| *s != JobStatus::Queued) => {
                    debug!("Job {} left the queue before a worker was free", job_id);
                    return;
                }
            }
        };

        if !record.start() {
            debug!("Job {} was stopped while queued", job_id);
            return;
        }

        info!("Job {} started", job_id);

        let stdout = OutputBuffer::new();
        let stderr = OutputBuffer::new();
        let interrupt = InterruptHandle::new();

        let sampler = spawn_output_sampler(
            Arc::clone(&record),
            stdout.clone(),
            stderr.clone(),
            interrupt.clone(),
            self.sample_interval,
        );

        let outcome = {
            let engine = Arc::clone(&self.engine);
            let job = Arc::clone(&record);
            let (stdout, stderr) = (stdout.clone(), stderr.clone());
            tokio::task::spawn_blocking(move || engine.run(job.script(), stdout, stderr, interrupt))
                .await
                .unwrap_or_else(|e| {
                    error!("Engine task for job {} panicked: {}", job_id, e);
                    Outcome::Failure {
                        message: format!("engine panicked: {}", e),
                        stack_trace: String::new(),
                    }
                })
        };

        let status = record.finish(outcome, &stdout, &stderr);

        if let Err(e) = sampler.await {
            warn!("Output sampler for job {} failed: {}", job_id, e);
        }

        match status {
            JobStatus::Completed => info!("Job {} completed", job_id),
            JobStatus::Failed => info!("Job {} failed", job_id),
            JobStatus::Stopped => info!("Job {} ended after stop", job_id),
            other => warn!("Job {} finished in unexpected status {}", job_id, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptor_lua::LuaEngine;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time;

    fn config() -> Config {
        Config {
            max_parallel_jobs: 4,
            sample_interval: Duration::from_millis(20),
            blocking_timeout: Duration::from_secs(5),
            ..Config::default()
        }
    }

    fn service_with(config: Config, engine: Arc<dyn ScriptEngine>) -> JobService {
        JobService::new(&config, Arc::new(JobStore::new()), engine)
    }

    fn lua_service() -> JobService {
        service_with(config(), Arc::new(LuaEngine::new()))
    }

    /// Engine that blocks until interrupted
    struct SpinEngine {
        running: Arc<AtomicUsize>,
    }

    impl ScriptEngine for SpinEngine {
        fn run(
            &self,
            _script: &str,
            stdout: OutputBuffer,
            _stderr: OutputBuffer,
            interrupt: InterruptHandle,
        ) -> Outcome {
            self.running.fetch_add(1, Ordering::SeqCst);
            stdout.append(b"spinning\n");
            while !interrupt.is_interrupted() {
                std::thread::sleep(Duration::from_millis(5));
            }
            self.running.fetch_sub(1, Ordering::SeqCst);
            Outcome::Aborted
        }
    }

    struct PanicEngine;

    impl ScriptEngine for PanicEngine {
        fn run(&self, _: &str, _: OutputBuffer, _: OutputBuffer, _: InterruptHandle) -> Outcome {
            panic!("engine bug");
        }
    }

    async fn wait(service: &JobService, id: Uuid) -> ScriptJob {
        service
            .wait_for_terminal(id, Duration::from_secs(5))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_submit_returns_before_completion() {
        let service = lua_service();

        let id = service.submit(r#"print("Hello, World!")"#.to_string());
        let job = service.get(id).unwrap();
        assert_eq!(job.id, id);
        assert!(matches!(
            job.status,
            JobStatus::Queued | JobStatus::Executing | JobStatus::Completed
        ));

        let job = wait(&service, id).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.stdout, "Hello, World!\n");
        assert_eq!(job.output.as_deref(), Some("nil"));
        assert!(job.started_at.is_some());
        assert!(job.execution_time_ms.is_some());
    }

    #[tokio::test]
    async fn test_blocking_submit_of_fast_script() {
        let service = lua_service();

        let job = service
            .submit_blocking(
                r#"
                local a = 5
                local b = 2
                local c = a + b
                print(c)
                eprint("errorrr")
                return c
            "#
                .to_string(),
            )
            .await;

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.stdout, "7\n");
        assert_eq!(job.stderr, "errorrr\n");
        assert_eq!(job.output.as_deref(), Some("7"));
        assert!(job.error.is_none());
    }

    #[tokio::test]
    async fn test_blocking_submit_returns_running_job_after_timeout() {
        let config = Config {
            blocking_timeout: Duration::from_millis(200),
            ..config()
        };
        let service = service_with(config, Arc::new(LuaEngine::new()));

        let job = service
            .submit_blocking("while true do end".to_string())
            .await;
        assert_eq!(job.status, JobStatus::Executing);

        assert!(service.stop(job.id));
        let job = wait(&service, job.id).await;
        assert_eq!(job.status, JobStatus::Stopped);
    }

    #[tokio::test]
    async fn test_failing_script() {
        let service = lua_service();

        let id = service.submit(
            r#"print("before") eprint("warning") error("boom")"#.to_string(),
        );
        let job = wait(&service, id).await;

        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error.as_deref().unwrap().contains("boom"));
        assert!(job.stack_trace.is_some());
        assert!(job.output.is_none());
        assert_eq!(job.stdout, "before\n");
        assert_eq!(job.stderr, "warning\n");
    }

    #[tokio::test]
    async fn test_stop_running_script() {
        let service = lua_service();

        let id = service.submit(
            r#"
            eprint("spinning up")
            local i = 0
            while true do
                i = i + 1
                if i % 100000 == 0 then print(i) end
            end
        "#
            .to_string(),
        );

        time::sleep(Duration::from_millis(200)).await;
        assert_eq!(service.get(id).unwrap().status, JobStatus::Executing);

        assert!(service.stop(id));
        let job = wait(&service, id).await;

        assert_eq!(job.status, JobStatus::Stopped);
        assert!(job.error.is_none());
        assert!(job.output.is_none());
        assert!(!job.stdout.is_empty());
        assert_eq!(job.stderr, "spinning up\n");

        // A second stop is a no-op
        assert!(!service.stop(id));
        assert_eq!(service.get(id).unwrap().status, JobStatus::Stopped);
    }

    #[tokio::test]
    async fn test_stop_coroutine_frees_worker() {
        let config = Config {
            max_parallel_jobs: 1,
            ..config()
        };
        let service = service_with(config, Arc::new(LuaEngine::new()));

        let spin = service.submit(
            r#"
            local co = coroutine.wrap(function() while true do end end)
            co()
        "#
            .to_string(),
        );
        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(service.get(spin).unwrap().status, JobStatus::Executing);

        assert!(service.stop(spin));
        assert_eq!(wait(&service, spin).await.status, JobStatus::Stopped);

        let next = service.submit("return 1".to_string());
        let job = wait(&service, next).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.output.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_stop_queued_job_never_runs() {
        let running = Arc::new(AtomicUsize::new(0));
        let config = Config {
            max_parallel_jobs: 1,
            ..config()
        };
        let service = service_with(
            config,
            Arc::new(SpinEngine {
                running: Arc::clone(&running),
            }),
        );

        let first = service.submit("spin".to_string());
        time::sleep(Duration::from_millis(100)).await;
        let second = service.submit("spin".to_string());
        time::sleep(Duration::from_millis(50)).await;

        assert_eq!(service.get(second).unwrap().status, JobStatus::Queued);
        assert!(service.stop(second));

        let job = service.get(second).unwrap();
        assert_eq!(job.status, JobStatus::Stopped);
        assert!(job.started_at.is_none());

        assert!(service.stop(first));
        wait(&service, first).await;
        time::sleep(Duration::from_millis(100)).await;

        let job = service.get(second).unwrap();
        assert_eq!(job.status, JobStatus::Stopped);
        assert!(job.started_at.is_none());
        assert_eq!(job.stdout, "");
        assert_eq!(running.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_parallelism_is_bounded() {
        let running = Arc::new(AtomicUsize::new(0));
        let config = Config {
            max_parallel_jobs: 2,
            ..config()
        };
        let service = service_with(
            config,
            Arc::new(SpinEngine {
                running: Arc::clone(&running),
            }),
        );

        let ids: Vec<Uuid> = (0..4).map(|_| service.submit("spin".to_string())).collect();
        time::sleep(Duration::from_millis(200)).await;

        assert_eq!(running.load(Ordering::SeqCst), 2);
        let executing = service.list(Some(&[JobStatus::Executing]), SortOrder::Asc);
        let queued = service.list(Some(&[JobStatus::Queued]), SortOrder::Asc);
        assert_eq!(executing.len(), 2);
        assert_eq!(queued.len(), 2);

        for id in &ids {
            service.stop(*id);
        }
        for id in ids {
            assert_eq!(wait(&service, id).await.status, JobStatus::Stopped);
        }
    }

    #[tokio::test]
    async fn test_engine_panic_becomes_failure() {
        let service = service_with(config(), Arc::new(PanicEngine));

        let id = service.submit("anything".to_string());
        let job = wait(&service, id).await;

        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error.unwrap().contains("engine panicked"));
    }

    #[tokio::test]
    async fn test_cleanup_only_removes_terminal_jobs() {
        let running = Arc::new(AtomicUsize::new(0));
        let service = service_with(config(), Arc::new(SpinEngine { running }));

        let active = service.submit("spin".to_string());
        let done = service.submit("spin".to_string());
        time::sleep(Duration::from_millis(50)).await;
        service.stop(done);
        wait(&service, done).await;

        let removed = service.cleanup(&[active, done, Uuid::new_v4()]);

        assert_eq!(removed, 1);
        assert!(service.get(active).is_ok());
        assert_eq!(service.get(done), Err(JobError::NotFound(done)));

        service.stop(active);
        wait(&service, active).await;
        assert_eq!(service.cleanup(&[active]), 1);
        assert!(service.list(None, SortOrder::Asc).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_ids() {
        let service = lua_service();
        let id = Uuid::new_v4();

        assert_eq!(service.get(id), Err(JobError::NotFound(id)));
        assert!(!service.stop(id));
        assert_eq!(service.cleanup(&[id]), 0);
        assert!(service.wait_for_terminal(id, Duration::from_millis(10)).await.is_err());
    }

    #[tokio::test]
    async fn test_list_filters_and_orders() {
        let service = lua_service();

        let ok = service.submit("return 1".to_string());
        let bad = service.submit(r#"error("x")"#.to_string());
        wait(&service, ok).await;
        wait(&service, bad).await;

        let completed = service.list(Some(&[JobStatus::Completed]), SortOrder::Asc);
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, ok);

        let all = service.list(None, SortOrder::Desc);
        assert_eq!(all.len(), 2);
        assert!(all[0].id > all[1].id);
    }

    #[tokio::test]
    async fn test_progressive_output_while_running() {
        let service = lua_service();

        let id = service.submit(
            r#"
            print("started")
            while true do end
        "#
            .to_string(),
        );

        time::sleep(Duration::from_millis(200)).await;
        let job = service.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Executing);
        assert_eq!(job.stdout, "started\n");

        service.stop(id);
        wait(&service, id).await;
    }
}
