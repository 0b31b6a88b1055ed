//! Scriptor Core
//!
//! Core types and abstractions for the Scriptor script execution service.
//!
//! This crate contains:
//! - Domain types: Job status state machine and job snapshots
//! - DTOs: Data transfer objects shared by the server, client and CLI
//! - Engine contract: The capability the orchestrator consumes to run scripts

pub mod domain;
pub mod dto;
pub mod engine;
