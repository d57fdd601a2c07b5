//! Client configuration.
//!
//! Every operation derives its request options from an explicit
//! [`StoreConfig`] value passed into the call; nothing is read from
//! ambient or global state.

use crate::error::{Result, RqdocError};
use crate::transport::{Endpoint, Protocol};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Read consistency level for `/db/query`, trading freshness for
/// latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consistency {
    None,
    #[default]
    Weak,
    Strong,
}

impl Consistency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Consistency::None => "none",
            Consistency::Weak => "weak",
            Consistency::Strong => "strong",
        }
    }
}

/// Connection and behavior options for one logical store.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Wire protocol of the configured node.
    pub protocol: Protocol,
    pub host: String,
    pub port: u16,
    /// Hard per-request timeout, in milliseconds.
    pub timeout_ms: u64,
    /// Leader-redirect budget per routing attempt.
    pub max_redirects: u32,
    pub consistency_level: Consistency,
    /// Reuse one pooled HTTP client across calls.
    pub keep_alive: bool,
    /// On update, merge the previous document into the new one instead
    /// of replacing it outright.
    pub merge: bool,
    /// Treat "no such table" as an empty result (reads) or as a cue to
    /// create the table and retry (writes).
    pub ignore_no_such_table_error: bool,
    /// Discovery-service URL, when the cluster publishes membership.
    pub disco_url: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::Http,
            host: "127.0.0.1".to_string(),
            port: 4001,
            timeout_ms: 10_000,
            max_redirects: 10,
            consistency_level: Consistency::Weak,
            keep_alive: false,
            merge: true,
            ignore_no_such_table_error: false,
            disco_url: None,
        }
    }
}

impl StoreConfig {
    /// Loads a config from a TOML file; omitted keys take defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            RqdocError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// The configured node as an endpoint.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.protocol, self.host.clone(), self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
