//! Init command handlers
//!
//! Sets up a directory for writing Scriptor scripts: a `.luarc.json` for the
//! Lua Language Server and a stub file describing the script globals.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use scriptor_core::dto::stubs::StubFile;
use scriptor_lua::LuaEngine;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;

const STUBS_DIR: &str = ".scriptor/stubs";
const STUB_FILE_NAME: &str = "scriptor.lua";

/// Init subcommands
#[derive(Subcommand)]
pub enum InitCommands {
    /// Generate Lua development files (.luarc.json and stubs)
    Lua {
        /// Output directory for generated files
        #[arg(short, long, default_value = ".")]
        output: String,

        /// Generate only .luarc.json
        #[arg(long, conflicts_with = "stubs_only")]
        config_only: bool,

        /// Generate only stub files
        #[arg(long)]
        stubs_only: bool,

        /// Download stubs from the server instead of using the bundled ones
        #[arg(long)]
        from_server: bool,
    },
}

/// Handle init commands
pub async fn handle_init_command(command: InitCommands, config: &Config) -> Result<()> {
    match command {
        InitCommands::Lua {
            output,
            config_only,
            stubs_only,
            from_server,
        } => {
            let output_path = Path::new(&output);

            if !stubs_only {
                generate_luarc_json(output_path)?;
            }

            if !config_only {
                let stubs = if from_server {
                    config
                        .client()
                        .get_stubs()
                        .await
                        .context("Failed to download stubs from server")?
                } else {
                    bundled_stubs()
                };
                let path = write_stub_file(output_path, &stubs)?;
                println!("  {} {}", "Created".green(), path.display());
            }

            println!("{}", "✓ Lua development files generated!".green().bold());
            println!();
            println!("{}", "Next steps:".bold());
            println!("  1. Install Lua Language Server in your editor");
            println!("  2. Open your script to see autocomplete and type hints");
            println!("  3. Use {} to run it", "scriptor submit <file>".cyan());

            Ok(())
        }
    }
}

/// Generate .luarc.json for Lua LSP configuration
fn generate_luarc_json(output_path: &Path) -> Result<()> {
    fs::create_dir_all(output_path)
        .with_context(|| format!("Failed to create output directory {:?}", output_path))?;
    let luarc_path = output_path.join(".luarc.json");

    let luarc = serde_json::json!({
        "$schema": "https://raw.githubusercontent.com/sumneko/vscode-lua/master/setting/schema.json",
        "runtime": { "version": "Lua 5.4" },
        "diagnostics": { "globals": ["eprint"] },
        "workspace": {
            "library": [STUBS_DIR],
            "checkThirdParty": false
        },
        "completion": { "callSnippet": "Both" }
    });

    let content = serde_json::to_string_pretty(&luarc)?;
    fs::write(&luarc_path, content + "\n")
        .with_context(|| format!("Failed to write .luarc.json to {:?}", luarc_path))?;

    println!("  {} .luarc.json", "Created".green());

    Ok(())
}

/// Stubs generated from the engine's own modules
fn bundled_stubs() -> StubFile {
    StubFile {
        name: STUB_FILE_NAME.to_string(),
        content: LuaEngine::stubs(),
    }
}

fn write_stub_file(output_path: &Path, stubs: &StubFile) -> Result<PathBuf> {
    let stubs_dir = output_path.join(STUBS_DIR);
    fs::create_dir_all(&stubs_dir)
        .with_context(|| format!("Failed to create stubs directory at {:?}", stubs_dir))?;

    // The server controls the name; never let it escape the stubs directory
    let file_name = Path::new(&stubs.name)
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| STUB_FILE_NAME.into());
    let stub_path = stubs_dir.join(file_name);

    fs::write(&stub_path, &stubs.content)
        .with_context(|| format!("Failed to write stub file {:?}", stub_path))?;

    Ok(stub_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luarc_points_at_stubs() {
        let dir = tempfile::tempdir().unwrap();
        generate_luarc_json(dir.path()).unwrap();

        let content = fs::read_to_string(dir.path().join(".luarc.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();

        assert_eq!(value["runtime"]["version"], "Lua 5.4");
        assert_eq!(value["workspace"]["library"][0], STUBS_DIR);
    }

    #[test]
    fn test_bundled_stub_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_stub_file(dir.path(), &bundled_stubs()).unwrap();

        assert_eq!(path, dir.path().join(STUBS_DIR).join(STUB_FILE_NAME));
        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("function print(...) end"));
    }

    #[test]
    fn test_stub_name_cannot_escape_directory() {
        let dir = tempfile::tempdir().unwrap();
        let stubs = StubFile {
            name: "../../evil.lua".to_string(),
            content: "---@meta\n".to_string(),
        };

        let path = write_stub_file(dir.path(), &stubs).unwrap();
        assert_eq!(path, dir.path().join(STUBS_DIR).join("evil.lua"));
    }
}
