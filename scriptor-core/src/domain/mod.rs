//! Core domain types
//!
//! This module contains the core domain structures used across Scriptor crates.
//! They are shared between the server (which owns live job state) and the
//! client/CLI (which render snapshots of it).

pub mod job;
