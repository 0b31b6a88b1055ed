//! Lua modules available to submitted scripts

pub mod output;

pub use output::OutputModule;
