//! `transport.socket.*` configuration keys.
//!
//! | Key                        | Default     | Values                         |
//! |----------------------------|-------------|--------------------------------|
//! | `transport.socket.host`    | `localhost` | host name or address           |
//! | `transport.socket.port`    | `55555`     | 0-65535                        |
//! | `transport.socket.nodelay` | `true`      | `1/0/true/false/yes/no/on/off` |
//! | `transport.socket.server`  | `auto`      | `0` client, `1` server, `auto` |

use crate::error::ConfigError;
use crate::options::{ServerMode, SocketOptions};

pub const HOST_KEY: &str = "transport.socket.host";
pub const PORT_KEY: &str = "transport.socket.port";
pub const NODELAY_KEY: &str = "transport.socket.nodelay";
pub const SERVER_KEY: &str = "transport.socket.server";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SocketConfig {
    pub options: SocketOptions,
    pub server_mode: ServerMode,
}

impl SocketConfig {
    /// Build from key/value pairs. Keys outside `transport.socket.` are
    /// ignored; later pairs override earlier ones.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a value that does not parse.
    pub fn from_properties<I, K, V>(properties: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let defaults = SocketOptions::default();
        let mut host = defaults.address().to_string();
        let mut port = defaults.port();
        let mut nodelay = defaults.tcp_nodelay();
        let mut server_mode = ServerMode::default();

        for (key, value) in properties {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                HOST_KEY => host = value.trim().to_string(),
                PORT_KEY => {
                    port = value
                        .trim()
                        .parse()
                        .map_err(|e| invalid(key, value, format!("{e}")))?;
                }
                NODELAY_KEY => nodelay = parse_flag(value).ok_or_else(|| invalid(key, value, "expected a boolean"))?,
                SERVER_KEY => server_mode = value.parse().map_err(|e: String| invalid(key, value, e))?,
                _ => {}
            }
        }

        Ok(Self {
            options: SocketOptions::new(host, port, nodelay),
            server_mode,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn invalid(key: &str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}
