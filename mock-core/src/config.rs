//! Configuration types and utilities

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Static startup configuration.
/// These settings are set at startup and do not change during runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    /// Address to listen on
    pub listen_address: String,
    /// Port to listen on
    pub listen_port: u16,
    /// Admin API port
    pub admin_port: u16,
    /// Base URL relative rule patterns and request URLs resolve against
    pub base_href: String,
    /// Directory holding the root CA
    pub ca_dir: PathBuf,
    /// Capacity of the rule hit channel; hits beyond it are dropped
    pub hit_channel_capacity: usize,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            listen_address: "127.0.0.1".to_string(),
            listen_port: 8080,
            admin_port: 9091,
            base_href: "http://localhost/".to_string(),
            ca_dir: PathBuf::from("./certs"),
            hit_channel_capacity: 1024,
        }
    }
}

impl MockConfig {
    /// Read a JSON config file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|e| {
            crate::MockError::Configuration(format!("{}: {}", path.display(), e))
        })
    }
}
