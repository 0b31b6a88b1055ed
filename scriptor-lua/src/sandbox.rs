//! Lua sandbox creation
//!
//! This module provides a restricted Lua sandbox that prevents access to
//! dangerous operations like filesystem I/O, network access, and process execution.
//!
//! Modules (output streams, etc.) are registered by the caller after creating
//! the sandbox, typically through [`create_execution_sandbox`].

use mlua::{Lua, LuaOptions, Result as LuaResult, StdLib};

use crate::module::ModuleRegistry;

/// Create a restricted Lua sandbox
///
/// This sandbox includes only basic Lua functionality (tables, strings, math, coroutines)
/// and does NOT include any I/O capabilities or the ability to load external code.
///
/// # Security
/// This sandbox prevents:
/// - Network access
/// - File system access
/// - Process execution
/// - Loading external modules via require()
///
/// # Example
/// ```no_run
/// use scriptor_lua::create_sandbox;
///
/// let lua = create_sandbox()?;
/// let sum: i64 = lua.load("return 5 + 2").eval()?;
/// assert_eq!(sum, 7);
/// # Ok::<(), mlua::Error>(())
/// ```
pub fn create_sandbox() -> LuaResult<Lua> {
    // Only allow: TABLE, STRING, MATH, COROUTINE
    // Explicitly exclude: IO, OS, PACKAGE, DEBUG
    let lua = unsafe {
        Lua::unsafe_new_with(
            StdLib::TABLE | StdLib::STRING | StdLib::MATH | StdLib::COROUTINE,
            LuaOptions::default(),
        )
    };

    // Remove dangerous globals
    lua.globals().set("require", mlua::Nil)?;
    lua.globals().set("dofile", mlua::Nil)?;
    lua.globals().set("loadfile", mlua::Nil)?;

    Ok(lua)
}

/// Create a sandbox with every module of `registry` installed
pub fn create_execution_sandbox(registry: &ModuleRegistry) -> LuaResult<Lua> {
    let lua = create_sandbox()?;
    registry.register_all(&lua)?;
    Ok(lua)
}
