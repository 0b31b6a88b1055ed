//! Repository Module
//!
//! In-memory data layer for the server: the job store and the live records
//! it holds.

pub mod job;
pub mod record;

pub use job::JobStore;
pub use record::JobRecord;
