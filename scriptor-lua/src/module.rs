use mlua::prelude::*;

/// Trait for Lua modules exposed to submitted scripts.
///
/// Each module provides functionality to Lua scripts running in the sandbox.
/// Modules must have a unique identifier and can register functions, tables,
/// and other values into the Lua global scope.
///
/// # Example
///
/// ```rust
/// use scriptor_lua::ScriptModule;
/// use mlua::prelude::*;
///
/// struct ClockModule;
///
/// impl ScriptModule for ClockModule {
///     fn id(&self) -> &'static str {
///         "clock"
///     }
///
///     fn register(&self, lua: &Lua) -> LuaResult<()> {
///         let table = lua.create_table()?;
///         table.set("zero", lua.create_function(|_, ()| Ok(0))?)?;
///         lua.globals().set(self.id(), table)?;
///         Ok(())
///     }
///
///     fn stubs(&self) -> String {
///         "---@meta\nclock = {}\n---@return integer\nfunction clock.zero() end\n".to_string()
///     }
/// }
/// ```
pub trait ScriptModule: Send + Sync {
    /// Returns the unique identifier for this module.
    ///
    /// This identifier is the name of the global table the module installs.
    /// For example, if `id()` returns `"io"`, the module is accessible in
    /// scripts as `io.function_name()`.
    fn id(&self) -> &'static str;

    /// Registers this module's functions and values into the Lua context.
    ///
    /// # Errors
    /// Returns `LuaError` if registration fails (e.g., invalid function, type error)
    fn register(&self, lua: &Lua) -> LuaResult<()>;

    /// Generates Lua Language Server stubs for this module.
    ///
    /// The stub should start with `---@meta` to mark it as a definition file.
    fn stubs(&self) -> String;
}

/// Registry of modules to install into an execution sandbox
pub struct ModuleRegistry {
    modules: Vec<Box<dyn ScriptModule>>,
}

impl ModuleRegistry {
    /// Creates a new empty module registry
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    /// Registers a module
    ///
    /// # Panics
    /// Panics if a module with the same ID is already registered
    pub fn register<M: ScriptModule + 'static>(&mut self, module: M) {
        let id = module.id();
        if self.modules.iter().any(|m| m.id() == id) {
            panic!("Module with id '{}' is already registered", id);
        }
        self.modules.push(Box::new(module));
    }

    /// Registers all modules into a Lua context
    ///
    /// # Errors
    /// Returns the first error encountered during registration
    pub fn register_all(&self, lua: &Lua) -> LuaResult<()> {
        for module in &self.modules {
            module.register(lua)?;
        }
        Ok(())
    }

    /// Generates a combined stub file for all registered modules
    pub fn generate_stubs(&self) -> String {
        let mut stubs = String::new();
        for module in &self.modules {
            stubs.push_str(&module.stubs());
            stubs.push_str("\n\n");
        }
        stubs
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
