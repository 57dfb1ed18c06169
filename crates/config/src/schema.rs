//! Config schema types (plugins, transport timeouts, listener and client pins).
use std::{fmt, path::PathBuf, time::Duration};

use {
    pinion_protocol::DEFAULT_TIMEOUT_MS,
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PinionConfig {
    /// Plugin name to options, loaded in document order.
    pub plugins: Map<String, Value>,
    pub transport: TransportConfig,
    /// Prefixes this process accepts from other processes.
    pub listen: Vec<PinConfig>,
    /// Prefixes forwarded to other processes.
    pub client: Vec<PinConfig>,
}

impl PinionConfig {
    pub fn plugin_names(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().map(String::as_str)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.transport.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Connect and reply timeout for remote links, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Tcp,
    /// Unix domain socket at `path`.
    Local,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Local => write!(f, "local"),
        }
    }
}

/// One `[[listen]]` or `[[client]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinConfig {
    #[serde(default)]
    pub transport: TransportKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Compact pattern, e.g. `role:math` or `role:store,info:purchase`.
    pub pin: String,
}
