//! Stubs API endpoint
//!
//! Serves the Lua Language Server definitions for the globals available to
//! submitted scripts.

use axum::Json;
use scriptor_core::dto::stubs::StubFile;
use scriptor_lua::LuaEngine;

pub const STUB_FILE_NAME: &str = "scriptor.lua";

/// GET /api/stubs
pub async fn get_stubs() -> Json<StubFile> {
    Json(StubFile {
        name: STUB_FILE_NAME.to_string(),
        content: LuaEngine::stubs(),
    })
}
