//! Service Module
//!
//! Business logic layer for the server: job orchestration and the output
//! sampler that runs beside each job.

pub mod job;
pub mod sampler;

pub use job::{JobError, JobService};
