//! # Socket Connector
//!
//! Hands out shared buses according to a [`ServerMode`].
//!
//! ## Acquisition
//!
//! ```text
//! lock cache ─┬─ bus cached and active? ── activate (count + 1) ──────────┐
//!             └─ otherwise    ── unregister a failed entry                  │
//!                                 RefCountingBus(new bus)                   │
//!                                 + eviction callback                      │
//!                                 + activate (count 0 → 1)                 │
//!                                 + register ──────────────────────────────┤
//! unlock cache ←───────────────────────────────────────────────────────────┘
//! ```
//!
//! Callers release a bus with [`Bus::deactivate`]. When the last owner
//! releases it the bus evicts itself from its cache, unless someone
//! reactivated it in the meantime. A cached bus that is no longer active
//! (a client that lost its server) is replaced on the next acquisition; its
//! remaining owners keep the failed bus until they release it.
//!
//! Lock order is always cache → reference count → bus.

use std::sync::{Arc, Weak};

use tracing::{debug, info};

use crate::bus::{Bus, ClientBus, DeactivationCallback, RefCountingBus, ServerBus};
use crate::cache::BusCache;
use crate::error::TransportError;
use crate::options::{ServerMode, SocketOptions};

#[derive(Debug, Clone)]
pub struct SocketConnector {
    server_buses: Arc<BusCache>,
    client_buses: Arc<BusCache>,
}

impl Default for SocketConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl SocketConnector {
    /// Connector with its own, empty caches.
    #[must_use]
    pub fn new() -> Self {
        Self::with_caches(Arc::new(BusCache::new()), Arc::new(BusCache::new()))
    }

    #[must_use]
    pub fn with_caches(server_buses: Arc<BusCache>, client_buses: Arc<BusCache>) -> Self {
        Self {
            server_buses,
            client_buses,
        }
    }

    #[must_use]
    pub fn server_buses(&self) -> &Arc<BusCache> {
        &self.server_buses
    }

    #[must_use]
    pub fn client_buses(&self) -> &Arc<BusCache> {
        &self.client_buses
    }

    /// Obtain an active shared bus for `options`.
    ///
    /// # Errors
    ///
    /// Returns the activation error of the required role. In
    /// [`ServerMode::Auto`] only the client error is returned, after the
    /// server attempt failed.
    pub fn acquire(&self, options: &SocketOptions, mode: ServerMode) -> Result<Arc<dyn Bus>, TransportError> {
        match mode {
            ServerMode::Server => self.acquire_server(options),
            ServerMode::Client => self.acquire_client(options),
            ServerMode::Auto => self.acquire_server(options).or_else(|e| {
                info!(%options, error = %e, "Cannot act as server, connecting as client");
                self.acquire_client(options)
            }),
        }
    }

    fn acquire_server(&self, options: &SocketOptions) -> Result<Arc<dyn Bus>, TransportError> {
        acquire_from(&self.server_buses, options, || {
            Arc::new(ServerBus::new(options.clone())) as Arc<dyn Bus>
        })
    }

    fn acquire_client(&self, options: &SocketOptions) -> Result<Arc<dyn Bus>, TransportError> {
        acquire_from(&self.client_buses, options, || {
            Arc::new(ClientBus::new(options.clone())) as Arc<dyn Bus>
        })
    }
}

fn acquire_from(
    cache: &Arc<BusCache>,
    options: &SocketOptions,
    create: impl FnOnce() -> Arc<dyn Bus>,
) -> Result<Arc<dyn Bus>, TransportError> {
    let mut guard = cache.lock();

    if let Some(bus) = guard.get(options) {
        if bus.is_active() {
            debug!(%options, "Reusing cached bus");
            bus.activate()?;
            return Ok(bus);
        }
        info!(%options, "Replacing cached bus that is no longer active");
        guard.unregister(&bus);
    }

    let shared = Arc::new(RefCountingBus::new(create()));
    shared.set_deactivation_callback(evict_from(Arc::downgrade(cache)));
    shared.activate()?;

    let bus: Arc<dyn Bus> = shared;
    guard.register(Arc::clone(&bus), false)?;
    Ok(bus)
}

/// Callback removing a released bus from `cache`, if it is still the entry
/// for its options and nobody reactivated it.
fn evict_from(cache: Weak<BusCache>) -> DeactivationCallback {
    Arc::new(move |released: &RefCountingBus| {
        let Some(cache) = cache.upgrade() else {
            return;
        };
        let mut guard = cache.lock();
        let Some(entry) = guard.get(released.socket_options()) else {
            return;
        };
        let same_bus = std::ptr::addr_eq(Arc::as_ptr(&entry), released as *const RefCountingBus);
        if same_bus && !released.is_active() {
            guard.unregister(&entry);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::Notification;
    use std::net::TcpListener;
    use std::thread;
    use std::time::{Duration, Instant};

    fn free_port() -> u16 {
        TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    fn becomes_inactive(bus: &Arc<dyn Bus>) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while bus.is_active() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        !bus.is_active()
    }

    #[test]
    fn test_same_options_share_one_bus() {
        let connector = SocketConnector::new();
        let options = SocketOptions::new("127.0.0.1", free_port(), true);

        let a = connector.acquire(&options, ServerMode::Server).unwrap();
        let b = connector.acquire(&options, ServerMode::Server).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(connector.server_buses().len(), 1);

        a.deactivate().unwrap();
        assert!(b.is_active());
        assert!(connector.server_buses().has_bus(&options));

        b.deactivate().unwrap();
        assert!(!b.is_active());
        assert!(connector.server_buses().is_empty());
        assert!(matches!(b.deactivate(), Err(TransportError::IllegalState(_))));
    }

    #[test]
    fn test_client_mode_fails_without_server() {
        let connector = SocketConnector::new();
        let options = SocketOptions::new("127.0.0.1", free_port(), true);
        assert!(matches!(
            connector.acquire(&options, ServerMode::Client),
            Err(TransportError::Connect { .. })
        ));
        assert!(connector.client_buses().is_empty());
    }

    #[test]
    fn test_auto_falls_back_to_client() {
        let port = free_port();
        let options = SocketOptions::new("127.0.0.1", port, true);

        let owner = SocketConnector::new();
        let server = owner.acquire(&options, ServerMode::Server).unwrap();

        let other = SocketConnector::new();
        let bus = other.acquire(&options, ServerMode::Auto).unwrap();
        assert!(bus.is_active());
        assert!(other.server_buses().is_empty());
        assert!(other.client_buses().has_bus(&options));

        bus.deactivate().unwrap();
        server.deactivate().unwrap();
    }

    #[test]
    fn test_failed_client_bus_is_replaced_on_next_acquire() {
        let options = SocketOptions::new("127.0.0.1", free_port(), true);
        let owner = SocketConnector::new();
        let server = owner.acquire(&options, ServerMode::Server).unwrap();

        let other = SocketConnector::new();
        let stale = other.acquire(&options, ServerMode::Auto).unwrap();
        assert!(other.client_buses().has_bus(&options));

        server.deactivate().unwrap();
        assert!(becomes_inactive(&stale));
        assert!(matches!(
            stale.handle_outgoing(&Notification::default()),
            Err(TransportError::NotActive)
        ));

        // the port is free again, so Auto now listens
        let fresh = other.acquire(&options, ServerMode::Auto).unwrap();
        assert!(!Arc::ptr_eq(&stale, &fresh));
        assert!(fresh.is_active());
        assert!(other.server_buses().has_bus(&options));
        assert!(!other.client_buses().has_bus(&options));

        // releasing the stale bus leaves the cache alone
        stale.deactivate().unwrap();
        assert!(other.server_buses().has_bus(&options));
        fresh.deactivate().unwrap();
        assert!(other.server_buses().is_empty());
    }

    #[test]
    fn test_failed_client_bus_is_replaced_in_client_mode() {
        let options = SocketOptions::new("127.0.0.1", free_port(), true);
        let first_server = SocketConnector::new()
            .acquire(&options, ServerMode::Server)
            .unwrap();

        let clients = SocketConnector::new();
        let stale = clients.acquire(&options, ServerMode::Client).unwrap();
        first_server.deactivate().unwrap();
        assert!(becomes_inactive(&stale));

        let second_server = SocketConnector::new()
            .acquire(&options, ServerMode::Server)
            .unwrap();
        let fresh = clients.acquire(&options, ServerMode::Client).unwrap();
        assert!(!Arc::ptr_eq(&stale, &fresh));
        assert!(fresh.is_active());
        assert!(fresh.handle_outgoing(&Notification::default()).is_ok());

        stale.deactivate().unwrap();
        fresh.deactivate().unwrap();
        assert!(clients.client_buses().is_empty());
        second_server.deactivate().unwrap();
    }

    #[test]
    fn test_failed_activation_is_not_cached() {
        let connector = SocketConnector::new();
        let options = SocketOptions::new("127.0.0.1", free_port(), true);
        let _ = connector.acquire(&options, ServerMode::Client);
        assert!(!connector.client_buses().has_bus(&options));
    }
}
