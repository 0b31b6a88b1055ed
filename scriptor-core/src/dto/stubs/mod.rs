//! Stub DTOs

use serde::{Deserialize, Serialize};

/// A Lua Language Server definition file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StubFile {
    pub name: String,
    pub content: String,
}
