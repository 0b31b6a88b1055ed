//! Scriptor Lua Engine
//!
//! This crate provides the Lua-backed script engine for Scriptor.
//! It includes:
//! - Module trait and registry for Lua modules
//! - A restricted sandbox with no filesystem, process or network access
//! - The output module wiring `print`/`eprint`/`io` to job sinks
//! - [`LuaEngine`], the `ScriptEngine` implementation used by the server

pub mod engine;
pub mod module;
pub mod modules;
pub mod sandbox;

pub use engine::LuaEngine;
pub use module::{ModuleRegistry, ScriptModule};
pub use modules::OutputModule;
pub use sandbox::{create_execution_sandbox, create_sandbox};
