//! # Bus
//!
//! A bus multiplexes notifications over the connections that share one set
//! of [`SocketOptions`].
//!
//! - [`ServerBus`] listens and owns every accepted connection.
//! - [`ClientBus`] owns exactly one outgoing connection.
//! - [`RefCountingBus`] shares either of them between several owners.
//!
//! ## Dispatch
//!
//! | Direction | Local receivers | Connections |
//! |-----------|-----------------|-------------|
//! | outgoing  | all             | all |
//! | incoming  | all             | server: all except the origin; client: none |
//!
//! Every receiver and connection is tried even if an earlier one fails;
//! failures are logged.
//!
//! ## Lifecycle
//!
//! `Inactive → Activating → Active → Deactivating → Inactive`. Activating
//! an active bus or deactivating an inactive one is an
//! [`TransportError::IllegalState`]. Deactivation joins every receive thread
//! before it returns.
//!
//! A client bus whose connection is lost moves from `Active` to `Failed`:
//! it reports inactive, rejects outgoing notifications with
//! [`TransportError::NotActive`] and must still be deactivated by its owner.

mod client;
mod ref_counting;
mod server;

pub use client::ClientBus;
pub use ref_counting::{DeactivationCallback, RefCountingBus};
pub use server::ServerBus;

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Mutex, RwLock};
use prost::Message;
use scope_telemetry::{CONNECTION_FAILURES, NOTIFICATIONS_RECEIVED};
use shared_types::Notification;
use tracing::{debug, warn};

use crate::connection::{BusConnection, ConnectionRole};
use crate::error::TransportError;
use crate::options::SocketOptions;
use crate::receiver::NotificationReceiver;

/// Boundary exposed to connectors.
pub trait Bus: Send + Sync + fmt::Debug {
    /// # Errors
    ///
    /// [`TransportError::IllegalState`] if already active, or the error that
    /// prevented the bus from coming up.
    fn activate(&self) -> Result<(), TransportError>;

    /// # Errors
    ///
    /// [`TransportError::IllegalState`] if neither active nor failed.
    fn deactivate(&self) -> Result<(), TransportError>;

    fn is_active(&self) -> bool;

    fn add_notification_receiver(&self, receiver: Arc<dyn NotificationReceiver>);

    /// Remove a receiver previously added, compared by identity.
    fn remove_notification_receiver(&self, receiver: &Arc<dyn NotificationReceiver>) -> bool;

    /// Deliver to local receivers and write to every connection.
    ///
    /// # Errors
    ///
    /// [`TransportError::NotActive`] if the bus is not active. Failures of
    /// individual receivers or connections are logged, not returned.
    fn handle_outgoing(&self, notification: &Notification) -> Result<(), TransportError>;

    fn socket_options(&self) -> &SocketOptions;
}

// =============================================================================
// Shared core
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lifecycle {
    Inactive,
    Activating,
    Active,
    /// Client whose only connection was lost.
    Failed,
    Deactivating,
}

pub(crate) type ConnectionId = u64;

struct RegisteredConnection {
    id: ConnectionId,
    connection: Arc<BusConnection>,
    receive_thread: Option<JoinHandle<()>>,
}

/// State shared by the bus and its receive threads.
pub(crate) struct BusCore {
    role: ConnectionRole,
    options: SocketOptions,
    lifecycle: Mutex<Lifecycle>,
    next_id: AtomicU64,
    connections: Mutex<Vec<RegisteredConnection>>,
    receivers: RwLock<Vec<Arc<dyn NotificationReceiver>>>,
}

impl BusCore {
    pub(crate) fn new(role: ConnectionRole, options: SocketOptions) -> Self {
        Self {
            role,
            options,
            lifecycle: Mutex::new(Lifecycle::Inactive),
            next_id: AtomicU64::new(1),
            connections: Mutex::new(Vec::new()),
            receivers: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn options(&self) -> &SocketOptions {
        &self.options
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    fn transition(&self, from: Lifecycle, to: Lifecycle, action: &str) -> Result<(), TransportError> {
        let mut lifecycle = self.lifecycle.lock();
        if *lifecycle != from {
            return Err(TransportError::IllegalState(format!(
                "cannot {action} {} bus on {} while {:?}",
                self.role.as_str(),
                self.options,
                *lifecycle
            )));
        }
        *lifecycle = to;
        Ok(())
    }

    pub(crate) fn begin_activation(&self) -> Result<(), TransportError> {
        self.transition(Lifecycle::Inactive, Lifecycle::Activating, "activate")
    }

    /// A connection lost while activating leaves the bus `Failed`.
    pub(crate) fn finish_activation(&self, succeeded: bool) {
        let mut lifecycle = self.lifecycle.lock();
        *lifecycle = match (succeeded, *lifecycle) {
            (true, Lifecycle::Failed) => Lifecycle::Failed,
            (true, _) => Lifecycle::Active,
            (false, _) => Lifecycle::Inactive,
        };
    }

    pub(crate) fn begin_deactivation(&self) -> Result<(), TransportError> {
        let mut lifecycle = self.lifecycle.lock();
        match *lifecycle {
            Lifecycle::Active | Lifecycle::Failed => {
                *lifecycle = Lifecycle::Deactivating;
                Ok(())
            }
            other => Err(TransportError::IllegalState(format!(
                "cannot deactivate {} bus on {} while {other:?}",
                self.role.as_str(),
                self.options
            ))),
        }
    }

    /// Mark a client bus as failed once its connection is gone.
    fn mark_failed(&self) -> bool {
        let mut lifecycle = self.lifecycle.lock();
        match *lifecycle {
            Lifecycle::Activating | Lifecycle::Active => {
                *lifecycle = Lifecycle::Failed;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn finish_deactivation(&self) {
        *self.lifecycle.lock() = Lifecycle::Inactive;
    }

    pub(crate) fn is_active(&self) -> bool {
        *self.lifecycle.lock() == Lifecycle::Active
    }

    // -------------------------------------------------------------------------
    // Connection set
    // -------------------------------------------------------------------------

    /// Add `connection` to the fan-out set. Done before the handshake so a
    /// peer never observes a completed handshake on a connection that is
    /// not yet wired into dispatch.
    pub(crate) fn register_connection(&self, connection: Arc<BusConnection>) -> ConnectionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.connections.lock().push(RegisteredConnection {
            id,
            connection,
            receive_thread: None,
        });
        id
    }

    /// Remove a connection. Its receive thread, if any, is detached.
    pub(crate) fn remove_connection(&self, id: ConnectionId) -> Option<Arc<BusConnection>> {
        let mut connections = self.connections.lock();
        let index = connections.iter().position(|c| c.id == id)?;
        Some(connections.swap_remove(index).connection)
    }

    pub(crate) fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Spawn the receive thread of a registered connection.
    ///
    /// The connection set stays locked until the handle is stored, so the
    /// new thread cannot remove its own entry before that.
    pub(crate) fn start_receiving(self: &Arc<Self>, id: ConnectionId) -> Result<(), TransportError> {
        let mut connections = self.connections.lock();
        let Some(entry) = connections.iter_mut().find(|c| c.id == id) else {
            return Err(TransportError::IllegalState(format!(
                "connection {id} is not registered"
            )));
        };

        let core = Arc::clone(self);
        let connection = Arc::clone(&entry.connection);
        let name = format!("sb-receiver-{}", connection.peer_addr());
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || core.receive_loop(id, &connection))
            .map_err(|source| TransportError::Spawn { name, source })?;
        entry.receive_thread = Some(handle);
        Ok(())
    }

    /// Take every connection out of the set, marking each as closed by us.
    fn drain_connections(&self) -> Vec<RegisteredConnection> {
        let drained: Vec<_> = self.connections.lock().drain(..).collect();
        for entry in &drained {
            entry.connection.mark_active_shutdown();
        }
        drained
    }

    /// Deactivate every connection and join its receive thread.
    pub(crate) fn shutdown_connections(&self) {
        let current = thread::current().id();
        for entry in self.drain_connections() {
            if let Err(e) = entry.connection.deactivate() {
                debug!(peer = %entry.connection.peer_addr(), error = %e, "Connection already closed");
            }
            if let Some(handle) = entry.receive_thread {
                if handle.thread().id() == current {
                    // deactivated from one of our own receivers
                    continue;
                }
                if handle.join().is_err() {
                    warn!(peer = %entry.connection.peer_addr(), "Receive thread panicked");
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Receivers
    // -------------------------------------------------------------------------

    pub(crate) fn add_receiver(&self, receiver: Arc<dyn NotificationReceiver>) {
        self.receivers.write().push(receiver);
    }

    pub(crate) fn remove_receiver(&self, receiver: &Arc<dyn NotificationReceiver>) -> bool {
        let mut receivers = self.receivers.write();
        let before = receivers.len();
        receivers.retain(|r| !std::ptr::addr_eq(Arc::as_ptr(r), Arc::as_ptr(receiver)));
        receivers.len() != before
    }

    // -------------------------------------------------------------------------
    // Dispatch
    // -------------------------------------------------------------------------

    fn deliver_locally(&self, notification: &Notification) {
        let receivers: Vec<_> = self.receivers.read().clone();
        for receiver in receivers {
            match catch_unwind(AssertUnwindSafe(|| receiver.handle(notification))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(
                    scope = %notification.scope_lossy(),
                    error = %e,
                    "Notification receiver failed"
                ),
                Err(_) => warn!(
                    scope = %notification.scope_lossy(),
                    "Notification receiver panicked"
                ),
            }
        }
    }

    /// Write `payload` to every connection except `skip`.
    fn write_to_connections(&self, payload: &Arc<[u8]>, skip: Option<ConnectionId>) {
        let targets: Vec<Arc<BusConnection>> = self
            .connections
            .lock()
            .iter()
            .filter(|c| Some(c.id) != skip)
            .map(|c| Arc::clone(&c.connection))
            .collect();

        for connection in targets {
            if let Err(e) = connection.send_frame(Arc::clone(payload)) {
                warn!(peer = %connection.peer_addr(), error = %e, "Cannot write notification to connection");
            }
        }
    }

    pub(crate) fn handle_outgoing(&self, notification: &Notification) -> Result<(), TransportError> {
        if !self.is_active() {
            return Err(TransportError::NotActive);
        }
        self.deliver_locally(notification);
        let payload: Arc<[u8]> = notification.encode_to_vec().into();
        self.write_to_connections(&payload, None);
        Ok(())
    }

    fn handle_incoming(&self, origin: ConnectionId, payload: Vec<u8>, notification: &Notification) {
        self.deliver_locally(notification);
        if self.role == ConnectionRole::Server {
            let payload: Arc<[u8]> = payload.into();
            self.write_to_connections(&payload, Some(origin));
        }
    }

    // -------------------------------------------------------------------------
    // Receive thread
    // -------------------------------------------------------------------------

    fn receive_loop(&self, id: ConnectionId, connection: &BusConnection) {
        let peer = connection.peer_addr();
        debug!(%peer, "Receive thread started");
        loop {
            let payload = match connection.read_frame() {
                Ok(payload) => payload,
                Err(e) => {
                    self.on_receive_error(id, connection, &e);
                    return;
                }
            };
            NOTIFICATIONS_RECEIVED
                .with_label_values(&[self.role.as_str()])
                .inc();

            match Notification::decode(payload.as_slice()) {
                Ok(notification) => self.handle_incoming(id, payload, &notification),
                Err(e) => warn!(%peer, error = %e, "Discarding malformed notification"),
            }
        }
    }

    fn on_receive_error(&self, id: ConnectionId, connection: &BusConnection, error: &TransportError) {
        let peer = connection.peer_addr();
        if connection.is_active_shutdown() {
            debug!(%peer, "Receive thread stopped for shutdown");
            return;
        }
        if self.remove_connection(id).is_none() {
            debug!(%peer, "Connection already removed, receive thread exiting");
            return;
        }
        CONNECTION_FAILURES.with_label_values(&["io"]).inc();
        if let Err(e) = connection.deactivate() {
            debug!(%peer, error = %e, "Connection already closed");
        }
        warn!(%peer, %error, "Connection lost");
        if self.role == ConnectionRole::Client && self.mark_failed() {
            warn!(options = %self.options, "Client bus failed, outgoing notifications are rejected");
        }
    }
}

impl fmt::Debug for BusCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusCore")
            .field("role", &self.role)
            .field("options", &self.options)
            .field("lifecycle", &*self.lifecycle.lock())
            .field("connections", &self.connection_count())
            .field("receivers", &self.receivers.read().len())
            .finish()
    }
}
