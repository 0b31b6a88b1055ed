//! Lua implementation of the script engine contract
//!
//! Each [`LuaEngine::run`] builds a fresh sandbox, so jobs never share
//! interpreter state. Interruption is delivered through an instruction-count
//! hook that raises an error once the job's [`InterruptHandle`] is set.

use mlua::prelude::*;
use mlua::{HookTriggers, VmState};
use scriptor_core::engine::{InterruptHandle, Outcome, OutputBuffer, ScriptEngine};
use tracing::debug;

use crate::module::ModuleRegistry;
use crate::modules::OutputModule;
use crate::sandbox::create_execution_sandbox;

/// Number of VM instructions between interrupt checks
pub const DEFAULT_CHECK_INTERVAL: u32 = 1000;

const INTERRUPTED_MESSAGE: &str = "script interrupted";
const TRACEBACK_MARKER: &str = "stack traceback:";

/// Script engine backed by a restricted Lua 5.4 sandbox
#[derive(Debug, Clone)]
pub struct LuaEngine {
    check_interval: u32,
}

impl LuaEngine {
    pub fn new() -> Self {
        Self {
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }

    /// Overrides how many instructions run between interrupt checks
    pub fn with_check_interval(mut self, instructions: u32) -> Self {
        self.check_interval = instructions.max(1);
        self
    }

    /// LuaLS stubs for every global a submitted script can use
    pub fn stubs() -> String {
        registry(OutputBuffer::new(), OutputBuffer::new()).generate_stubs()
    }

    fn evaluate(
        &self,
        script: &str,
        stdout: OutputBuffer,
        stderr: OutputBuffer,
        interrupt: &InterruptHandle,
    ) -> LuaResult<String> {
        let lua = create_execution_sandbox(&registry(stdout, stderr))?;

        install_interrupt_guard(&lua, interrupt, self.check_interval)?;

        let values: LuaMultiValue = lua.load(script).set_name("script").eval()?;
        let result = values.into_iter().next().unwrap_or(LuaValue::Nil);

        let tostring: LuaFunction = lua.globals().get("tostring")?;
        let rendered: LuaString = tostring.call(result)?;
        Ok(rendered.to_string_lossy().into())
    }
}

impl Default for LuaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptEngine for LuaEngine {
    fn run(
        &self,
        script: &str,
        stdout: OutputBuffer,
        stderr: OutputBuffer,
        interrupt: InterruptHandle,
    ) -> Outcome {
        let result = self.evaluate(script, stdout, stderr, &interrupt);

        if interrupt.is_interrupted() {
            debug!("Lua run ended after interrupt request");
            return Outcome::Aborted;
        }

        match result {
            Ok(value) => Outcome::Success(value),
            Err(e) => failure_from(&e),
        }
    }
}

/// Makes `interrupt` abort the running chunk
///
/// The instruction hook raises an error once the flag is set. It is global,
/// so coroutines are covered as well as the main thread. Protected calls
/// rethrow any error caught after that point, so `pcall` loops cannot
/// swallow the interruption.
fn install_interrupt_guard(lua: &Lua, interrupt: &InterruptHandle, every: u32) -> LuaResult<()> {
    let handle = interrupt.clone();
    lua.set_global_hook(
        HookTriggers::new().every_nth_instruction(every),
        move |_lua, _debug| {
            if handle.is_interrupted() {
                Err(LuaError::RuntimeError(INTERRUPTED_MESSAGE.to_string()))
            } else {
                Ok(VmState::Continue)
            }
        },
    )?;

    let handle = interrupt.clone();
    let interrupted = lua.create_function(move |_, ()| Ok(handle.is_interrupted()))?;
    lua.load(PROTECTED_CALL_GUARD)
        .set_name("interrupt_guard")
        .call::<()>(interrupted)
}

const PROTECTED_CALL_GUARD: &str = r#"
local interrupted = ...
local raw_pcall, raw_xpcall, raw_resume = pcall, xpcall, coroutine.resume
local pack, unpack = table.pack, table.unpack

local function guard(results)
    if not results[1] and interrupted() then
        error(results[2], 0)
    end
    return unpack(results, 1, results.n)
end

pcall = function(...) return guard(pack(raw_pcall(...))) end
xpcall = function(...) return guard(pack(raw_xpcall(...))) end
coroutine.resume = function(...) return guard(pack(raw_resume(...))) end
"#;

fn registry(stdout: OutputBuffer, stderr: OutputBuffer) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    registry.register(OutputModule::new(stdout, stderr));
    registry
}

/// Splits a Lua error into a message and a stack trace
fn failure_from(error: &LuaError) -> Outcome {
    let (message, stack_trace) = match error {
        LuaError::CallbackError { traceback, cause } => {
            (cause.to_string(), strip_marker(traceback))
        }
        other => split_traceback(&other.to_string()),
    };

    Outcome::Failure {
        message,
        stack_trace,
    }
}

fn split_traceback(text: &str) -> (String, String) {
    match text.find(TRACEBACK_MARKER) {
        Some(idx) => (
            text[..idx].trim_end().to_string(),
            strip_marker(&text[idx..]),
        ),
        None => (text.trim_end().to_string(), String::new()),
    }
}

fn strip_marker(traceback: &str) -> String {
    traceback
        .trim()
        .trim_start_matches(TRACEBACK_MARKER)
        .trim()
        .to_string()
}
