//! Connection options and server-mode policy.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs};
use std::str::FromStr;

use crate::error::TransportError;

/// Where and how to connect. Two buses with equal options are the same bus.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SocketOptions {
    address: String,
    port: u16,
    tcp_nodelay: bool,
}

impl SocketOptions {
    pub const DEFAULT_ADDRESS: &'static str = "localhost";
    pub const DEFAULT_PORT: u16 = 55555;

    #[must_use]
    pub fn new(address: impl Into<String>, port: u16, tcp_nodelay: bool) -> Self {
        Self {
            address: address.into(),
            port,
            tcp_nodelay,
        }
    }

    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn tcp_nodelay(&self) -> bool {
        self.tcp_nodelay
    }

    /// Resolve to socket addresses, in resolver order.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::UnresolvableAddress`] if the host does not
    /// resolve to anything.
    pub fn resolve(&self) -> Result<Vec<SocketAddr>, TransportError> {
        let unresolvable = || TransportError::UnresolvableAddress {
            address: self.address.clone(),
            port: self.port,
        };
        let addrs: Vec<SocketAddr> = (self.address.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|_| unresolvable())?
            .collect();
        if addrs.is_empty() {
            return Err(unresolvable());
        }
        Ok(addrs)
    }
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ADDRESS, Self::DEFAULT_PORT, true)
    }
}

impl fmt::Display for SocketOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)?;
        if self.tcp_nodelay {
            f.write_str(" (nodelay)")?;
        }
        Ok(())
    }
}

/// Address a local client can reach a listener on. Wildcard listeners are
/// reached through loopback.
pub(crate) fn connectable(addr: SocketAddr) -> SocketAddr {
    match addr {
        SocketAddr::V4(v4) if v4.ip().is_unspecified() => {
            SocketAddr::from((Ipv4Addr::LOCALHOST, v4.port()))
        }
        SocketAddr::V6(v6) if v6.ip().is_unspecified() => {
            SocketAddr::from((Ipv6Addr::LOCALHOST, v6.port()))
        }
        other => other,
    }
}

/// Whether a connector binds a listener, connects out, or tries both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ServerMode {
    /// Connect out only (`0`).
    Client,
    /// Listen only (`1`).
    Server,
    /// Listen, falling back to connecting out (`auto`).
    #[default]
    Auto,
}

impl FromStr for ServerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" => Ok(ServerMode::Client),
            "1" => Ok(ServerMode::Server),
            "auto" => Ok(ServerMode::Auto),
            other => Err(format!("expected 0, 1 or auto, got {other:?}")),
        }
    }
}

impl fmt::Display for ServerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ServerMode::Client => "0",
            ServerMode::Server => "1",
            ServerMode::Auto => "auto",
        })
    }
}
