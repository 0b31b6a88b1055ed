//! Data Transfer Objects for client/server communication
//!
//! This module contains DTOs used on the HTTP boundary between the
//! Scriptor server and its clients. Job snapshots themselves are sent as
//! [`crate::domain::job::ScriptJob`].

pub mod job;
pub mod stubs;
