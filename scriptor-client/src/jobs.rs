//! Script job endpoints

use crate::ScriptorClient;
use crate::error::Result;
use scriptor_core::domain::job::{JobStatus, ScriptJob, SortOrder};
use scriptor_core::dto::job::{
    CleanupRequest, CleanupResponse, ListJobsQuery, StopResponse, SubmitQuery,
};
use scriptor_core::dto::stubs::StubFile;
use uuid::Uuid;

impl ScriptorClient {
    /// Submit a script and return its job id immediately
    pub async fn submit(&self, script: impl Into<String>) -> Result<Uuid> {
        self.execute(script.into(), false).await
    }

    /// Submit a script and wait for the server's blocking window
    ///
    /// The returned job may still be running if it outlived the server's
    /// blocking timeout.
    pub async fn submit_blocking(&self, script: impl Into<String>) -> Result<ScriptJob> {
        self.execute(script.into(), true).await
    }

    /// List jobs, optionally filtered by status and ordered by id
    ///
    /// An empty `statuses` slice lists every job.
    pub async fn list_jobs(
        &self,
        statuses: &[JobStatus],
        order: Option<SortOrder>,
    ) -> Result<Vec<ScriptJob>> {
        let query = ListJobsQuery::new(statuses, order);
        let response = self
            .client
            .get(self.url("/api/scripts"))
            .query(&query)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get a job by ID
    pub async fn get_job(&self, id: Uuid) -> Result<ScriptJob> {
        let response = self
            .client
            .get(self.url(&format!("/api/scripts/{}", id)))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Request cancellation of a job
    ///
    /// Returns false if the job was unknown or had already finished.
    pub async fn stop_job(&self, id: Uuid) -> Result<bool> {
        let response = self
            .client
            .post(self.url(&format!("/api/scripts/{}/stop", id)))
            .send()
            .await?;

        let ack: StopResponse = self.handle_response(response).await?;
        Ok(ack.stopped)
    }

    /// Remove finished jobs, returning how many the server removed
    pub async fn cleanup_jobs(&self, ids: &[Uuid]) -> Result<usize> {
        let response = self
            .client
            .delete(self.url("/api/scripts/cleanup"))
            .json(&CleanupRequest { ids: ids.to_vec() })
            .send()
            .await?;

        let ack: CleanupResponse = self.handle_response(response).await?;
        Ok(ack.removed)
    }

    /// Fetch the Lua Language Server definitions served by the server
    pub async fn get_stubs(&self) -> Result<StubFile> {
        let response = self.client.get(self.url("/api/stubs")).send().await?;

        self.handle_response(response).await
    }

    async fn execute<T: serde::de::DeserializeOwned>(&self, script: String, blocking: bool) -> Result<T> {
        tracing::debug!("Submitting {} byte script (blocking: {})", script.len(), blocking);

        let response = self
            .client
            .post(self.url("/api/scripts/execute"))
            .query(&SubmitQuery { blocking })
            .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(script)
            .send()
            .await?;

        self.handle_response(response).await
    }
}
