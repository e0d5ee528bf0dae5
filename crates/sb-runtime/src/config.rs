//! # Runtime Configuration
//!
//! Layers, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. an optional TOML file
//! 3. environment variables
//!
//! ## Config File Format
//!
//! ```toml
//! [transport.socket]
//! host = "localhost"
//! port = 55555
//! nodelay = true
//! server = "auto"   # or 0 / 1
//! ```
//!
//! ## Environment
//!
//! | Variable | Key |
//! |----------|-----|
//! | `SB_TRANSPORT_SOCKET_HOST` | `transport.socket.host` |
//! | `SB_TRANSPORT_SOCKET_PORT` | `transport.socket.port` |
//! | `SB_TRANSPORT_SOCKET_NODELAY` | `transport.socket.nodelay` |
//! | `SB_TRANSPORT_SOCKET_SERVER` | `transport.socket.server` |

use std::env;
use std::fs;
use std::path::Path;

use sb_02_socket_transport::config::{HOST_KEY, NODELAY_KEY, PORT_KEY, SERVER_KEY};
use sb_02_socket_transport::{ConfigError, SocketConfig};
use serde::Deserialize;
use thiserror::Error;

const ENV_OVERRIDES: [(&str, &str); 4] = [
    ("SB_TRANSPORT_SOCKET_HOST", HOST_KEY),
    ("SB_TRANSPORT_SOCKET_PORT", PORT_KEY),
    ("SB_TRANSPORT_SOCKET_NODELAY", NODELAY_KEY),
    ("SB_TRANSPORT_SOCKET_SERVER", SERVER_KEY),
];

#[derive(Debug, Error)]
pub enum RuntimeConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub socket: SocketConfig,
}

impl RuntimeConfig {
    /// Load from `path` (if given) and the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or a value is
    /// invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, RuntimeConfigError> {
        let file = match path {
            Some(path) => Some(fs::read_to_string(path).map_err(|source| RuntimeConfigError::Io {
                path: path.display().to_string(),
                source,
            })?),
            None => None,
        };
        Self::from_sources(file.as_deref(), |key| env::var(key).ok())
    }

    /// Build from optional TOML text and an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// See [`Self::load`].
    pub fn from_sources(
        toml_text: Option<&str>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, RuntimeConfigError> {
        let mut properties: Vec<(&'static str, String)> = Vec::new();

        if let Some(text) = toml_text {
            let file: ConfigFile = toml::from_str(text)?;
            properties.extend(file.transport.socket.into_properties());
        }
        for (variable, key) in ENV_OVERRIDES {
            if let Some(value) = lookup(variable) {
                properties.push((key, value));
            }
        }

        Ok(Self {
            socket: SocketConfig::from_properties(properties)?,
        })
    }
}

// =============================================================================
// File format
// =============================================================================

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    transport: TransportSection,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TransportSection {
    #[serde(default)]
    socket: SocketSection,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SocketSection {
    host: Option<String>,
    port: Option<u16>,
    nodelay: Option<bool>,
    server: Option<toml::Value>,
}

impl SocketSection {
    fn into_properties(self) -> Vec<(&'static str, String)> {
        let mut properties = Vec::new();
        if let Some(host) = self.host {
            properties.push((HOST_KEY, host));
        }
        if let Some(port) = self.port {
            properties.push((PORT_KEY, port.to_string()));
        }
        if let Some(nodelay) = self.nodelay {
            properties.push((NODELAY_KEY, nodelay.to_string()));
        }
        if let Some(server) = self.server {
            let server = match server {
                toml::Value::String(text) => text,
                other => other.to_string(),
            };
            properties.push((SERVER_KEY, server));
        }
        properties
    }
}
