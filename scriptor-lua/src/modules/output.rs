//! Output module for submitted scripts
//!
//! Wires the script's output globals to the two job sinks:
//! - `print(...)` and `io.write(...)` / `io.stdout:write(...)` go to stdout
//! - `eprint(...)` and `io.stderr:write(...)` go to stderr
//!
//! Bytes are appended as soon as the script produces them, so a reader
//! polling the sinks observes progressive output.

use crate::module::ScriptModule;
use mlua::prelude::*;
use scriptor_core::engine::OutputBuffer;

/// Output module bound to a pair of sinks
pub struct OutputModule {
    stdout: OutputBuffer,
    stderr: OutputBuffer,
}

impl OutputModule {
    /// Creates a new OutputModule writing into the given sinks
    pub fn new(stdout: OutputBuffer, stderr: OutputBuffer) -> Self {
        Self { stdout, stderr }
    }
}

impl ScriptModule for OutputModule {
    fn id(&self) -> &'static str {
        "io"
    }

    fn register(&self, lua: &Lua) -> LuaResult<()> {
        let globals = lua.globals();

        // print(...) -> stdout, tab separated, newline terminated
        {
            let sink = self.stdout.clone();
            globals.set(
                "print",
                lua.create_function(move |lua, args: LuaMultiValue| {
                    sink.append(&render_line(lua, args)?);
                    Ok(())
                })?,
            )?;
        }

        // eprint(...) -> stderr
        {
            let sink = self.stderr.clone();
            globals.set(
                "eprint",
                lua.create_function(move |lua, args: LuaMultiValue| {
                    sink.append(&render_line(lua, args)?);
                    Ok(())
                })?,
            )?;
        }

        let io_table = lua.create_table()?;
        let stdout_file = create_file_table(lua, self.stdout.clone())?;
        let stderr_file = create_file_table(lua, self.stderr.clone())?;

        // io.write(...) -> stdout, raw
        {
            let sink = self.stdout.clone();
            io_table.set(
                "write",
                lua.create_function(move |lua, args: LuaMultiValue| {
                    sink.append(&render_raw(lua, args)?);
                    Ok(())
                })?,
            )?;
        }

        io_table.set("stdout", stdout_file)?;
        io_table.set("stderr", stderr_file)?;

        globals.set(self.id(), io_table)?;
        Ok(())
    }

    fn stubs(&self) -> String {
        r#"---@meta

---Print values to the job's stdout, separated by tabs and followed by a newline
---@param ... any
function print(...) end

---Print values to the job's stderr, separated by tabs and followed by a newline
---@param ... any
function eprint(...) end

---Job output streams
---@class io
io = {}

---Write strings or numbers to stdout without a trailing newline
---@param ... string|number
function io.write(...) end

---@class file
local file = {}

---Write strings or numbers to this stream
---@param ... string|number
---@return file
function file:write(...) end

---@type file
io.stdout = {}

---@type file
io.stderr = {}
"#
        .to_string()
    }
}

/// Creates a `file`-like table whose `write` method appends to `sink`
///
/// Called as `io.stderr:write(...)`, so the table itself arrives first.
fn create_file_table(lua: &Lua, sink: OutputBuffer) -> LuaResult<LuaTable> {
    let file = lua.create_table()?;
    file.set(
        "write",
        lua.create_function(move |lua, (this, args): (LuaTable, LuaMultiValue)| {
            sink.append(&render_raw(lua, args)?);
            Ok(this)
        })?,
    )?;
    Ok(file)
}

/// Renders arguments the way Lua's `print` does: `tostring` each, joined by
/// tabs and newline terminated. Strings keep their raw bytes.
fn render_line(lua: &Lua, args: LuaMultiValue) -> LuaResult<Vec<u8>> {
    let tostring: LuaFunction = lua.globals().get("tostring")?;
    let mut line = Vec::new();

    for (idx, value) in args.into_iter().enumerate() {
        if idx > 0 {
            line.push(b'\t');
        }
        let text: LuaString = tostring.call(value)?;
        line.extend_from_slice(&text.as_bytes());
    }

    line.push(b'\n');
    Ok(line)
}

/// Renders arguments the way Lua's `io.write` does: strings and numbers only
fn render_raw(lua: &Lua, args: LuaMultiValue) -> LuaResult<Vec<u8>> {
    let tostring: LuaFunction = lua.globals().get("tostring")?;
    let mut bytes = Vec::new();

    for (idx, value) in args.into_iter().enumerate() {
        match value {
            LuaValue::String(s) => bytes.extend_from_slice(&s.as_bytes()),
            LuaValue::Integer(_) | LuaValue::Number(_) => {
                let text: LuaString = tostring.call(value)?;
                bytes.extend_from_slice(&text.as_bytes());
            }
            other => {
                return Err(LuaError::RuntimeError(format!(
                    "bad argument #{} to 'write' (string expected, got {})",
                    idx + 1,
                    other.type_name()
                )));
            }
        }
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::create_sandbox;

    fn sandbox_with_output() -> (Lua, OutputBuffer, OutputBuffer) {
        let lua = create_sandbox().unwrap();
        let stdout = OutputBuffer::new();
        let stderr = OutputBuffer::new();
        OutputModule::new(stdout.clone(), stderr.clone())
            .register(&lua)
            .unwrap();
        (lua, stdout, stderr)
    }

    #[test]
    fn test_print_goes_to_stdout() {
        let (lua, stdout, stderr) = sandbox_with_output();

        lua.load(r#"print("Hello, World!")"#).exec().unwrap();

        assert_eq!(stdout.snapshot(), "Hello, World!\n");
        assert!(stderr.is_empty());
    }

    #[test]
    fn test_print_formats_like_lua() {
        let (lua, stdout, _stderr) = sandbox_with_output();

        lua.load(r#"print(1, "two", true, nil, 2.5)"#).exec().unwrap();
        lua.load("print()").exec().unwrap();

        assert_eq!(stdout.snapshot(), "1\ttwo\ttrue\tnil\t2.5\n\n");
    }

    #[test]
    fn test_eprint_goes_to_stderr() {
        let (lua, stdout, stderr) = sandbox_with_output();

        lua.load(r#"eprint("errorrr")"#).exec().unwrap();

        assert!(stdout.is_empty());
        assert_eq!(stderr.snapshot(), "errorrr\n");
    }

    #[test]
    fn test_io_write_is_raw() {
        let (lua, stdout, stderr) = sandbox_with_output();

        lua.load(
            r#"
            io.write("a", 1, "b")
            io.stdout:write("c"):write("d")
            io.stderr:write("oops", "\n")
        "#,
        )
        .exec()
        .unwrap();

        assert_eq!(stdout.snapshot(), "a1bcd");
        assert_eq!(stderr.snapshot(), "oops\n");
    }

    #[test]
    fn test_print_keeps_raw_bytes() {
        let (lua, stdout, stderr) = sandbox_with_output();

        lua.load(r#"print("ok\xff", 1) eprint("\xfe")"#).exec().unwrap();

        assert_eq!(stdout.len(), 6);
        assert_eq!(stdout.snapshot_lossy(), "ok\u{fffd}\t1\n");
        assert_eq!(stderr.snapshot_lossy(), "\u{fffd}\n");
    }

    #[test]
    fn test_io_write_rejects_tables() {
        let (lua, _stdout, _stderr) = sandbox_with_output();

        let err = lua.load("io.write({})").exec().unwrap_err();
        assert!(err.to_string().contains("string expected, got table"));
    }

    #[test]
    fn test_output_module_stubs() {
        let module = OutputModule::new(OutputBuffer::new(), OutputBuffer::new());
        let stubs = module.stubs();

        assert!(stubs.contains("---@meta"));
        assert!(stubs.contains("function print(...) end"));
        assert!(stubs.contains("function eprint(...) end"));
        assert!(stubs.contains("io.stderr = {}"));
    }
}
