//! Configuration module
//!
//! Handles CLI configuration such as the server URL.

use scriptor_client::ScriptorClient;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the Scriptor server
    pub server_url: String,
}

impl Config {
    /// Client for the configured server
    pub fn client(&self) -> ScriptorClient {
        ScriptorClient::new(&self.server_url)
    }
}
