//! Listening bus: accepts any number of peers and relays traffic between
//! them.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use parking_lot::Mutex;
use scope_telemetry::CONNECTION_FAILURES;
use shared_types::Notification;
use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, error, info, warn};

use super::{Bus, BusCore};
use crate::connection::{BusConnection, ConnectionRole, DEFAULT_SHUTDOWN_TIMEOUT};
use crate::error::TransportError;
use crate::options::{connectable, SocketOptions};
use crate::receiver::NotificationReceiver;

const LISTEN_BACKLOG: i32 = 128;

struct Acceptor {
    shutdown: Arc<AtomicBool>,
    local_addr: SocketAddr,
    finished: Receiver<()>,
    handle: JoinHandle<()>,
}

impl Acceptor {
    fn spawn(listener: TcpListener, core: Arc<BusCore>) -> Result<Self, TransportError> {
        let local_addr = listener.local_addr().map_err(|source| TransportError::Bind {
            address: core.options().to_string(),
            source,
        })?;
        let shutdown = Arc::new(AtomicBool::new(false));
        let (done, finished) = bounded::<()>(0);

        let flag = Arc::clone(&shutdown);
        let name = format!("sb-acceptor-{}", local_addr.port());
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let _done = done;
                accept_loop(&listener, &core, &flag);
            })
            .map_err(|source| TransportError::Spawn { name, source })?;

        Ok(Self {
            shutdown,
            local_addr,
            finished,
            handle,
        })
    }

    /// Raise the shutdown flag, wake the blocked `accept` and wait for the
    /// loop to exit, closing the listener.
    fn stop(self, timeout: Duration) {
        let Self {
            shutdown,
            local_addr,
            finished,
            handle,
        } = self;
        shutdown.store(true, Ordering::Release);

        match TcpStream::connect_timeout(&connectable(local_addr), timeout) {
            Ok(wake) => drop(wake),
            Err(e) => debug!(%local_addr, error = %e, "Cannot wake acceptor"),
        }

        match finished.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => warn!(
                %local_addr,
                timeout_secs = timeout.as_secs(),
                "Acceptor did not stop in time, detaching it"
            ),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if handle.join().is_err() {
                    warn!(%local_addr, "Acceptor thread panicked");
                }
            }
        }
    }
}

fn accept_loop(listener: &TcpListener, core: &Arc<BusCore>, shutdown: &AtomicBool) {
    loop {
        match listener.accept() {
            Ok((stream, peer)) => {
                if shutdown.load(Ordering::Acquire) {
                    debug!(%peer, "Acceptor stopping");
                    return;
                }
                accept_connection(core, stream, peer);
            }
            Err(e) => {
                if shutdown.load(Ordering::Acquire) {
                    debug!(error = %e, "Acceptor stopping after listener error");
                } else {
                    CONNECTION_FAILURES.with_label_values(&["accept"]).inc();
                    error!(options = %core.options(), error = %e, "Accept failed, no further peers will be accepted");
                }
                return;
            }
        }
    }
}

fn accept_connection(core: &Arc<BusCore>, stream: TcpStream, peer: SocketAddr) {
    let connection = Arc::new(BusConnection::accepted(stream, peer, core.options()));
    let id = core.register_connection(Arc::clone(&connection));

    let started = connection
        .activate()
        .and_then(|()| core.start_receiving(id));
    match started {
        Ok(()) => debug!(%peer, "Accepted connection"),
        Err(e) => {
            core.remove_connection(id);
            if let Err(close) = connection.deactivate() {
                debug!(%peer, error = %close, "Connection already closed");
            }
            CONNECTION_FAILURES.with_label_values(&["handshake"]).inc();
            warn!(%peer, error = %e, "Dropping connection that failed to start");
        }
    }
}

/// Bind the first address `options` resolves to.
///
/// Later addresses are never tried. A port held on the first address fails
/// the bind even if another address family is free.
fn bind_listener(options: &SocketOptions) -> Result<TcpListener, TransportError> {
    let addrs = options.resolve()?;
    bind_first(&addrs).map_err(|source| TransportError::Bind {
        address: options.to_string(),
        source,
    })
}

fn bind_first(addrs: &[SocketAddr]) -> std::io::Result<TcpListener> {
    let Some(&addr) = addrs.first() else {
        return Err(std::io::Error::from(std::io::ErrorKind::AddrNotAvailable));
    };
    if addrs.len() > 1 {
        debug!(%addr, skipped = addrs.len() - 1, "Binding first resolved address only");
    }
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    #[cfg(unix)]
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;
    Ok(socket.into())
}

/// Bus that listens on [`SocketOptions`] and owns every accepted peer.
#[derive(Debug)]
pub struct ServerBus {
    core: Arc<BusCore>,
    acceptor: Mutex<Option<Acceptor>>,
}

impl ServerBus {
    #[must_use]
    pub fn new(options: SocketOptions) -> Self {
        Self {
            core: Arc::new(BusCore::new(ConnectionRole::Server, options)),
            acceptor: Mutex::new(None),
        }
    }

    /// Address actually bound while active. Useful with port `0`.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.acceptor.lock().as_ref().map(|a| a.local_addr)
    }

    /// Number of peers currently connected.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.core.connection_count()
    }
}

impl std::fmt::Debug for Acceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Acceptor")
            .field("local_addr", &self.local_addr)
            .finish_non_exhaustive()
    }
}

impl Bus for ServerBus {
    fn activate(&self) -> Result<(), TransportError> {
        self.core.begin_activation()?;

        let started = bind_listener(self.core.options())
            .and_then(|listener| Acceptor::spawn(listener, Arc::clone(&self.core)));
        match started {
            Ok(acceptor) => {
                info!(options = %self.core.options(), local_addr = %acceptor.local_addr, "Server bus active");
                *self.acceptor.lock() = Some(acceptor);
                self.core.finish_activation(true);
                Ok(())
            }
            Err(e) => {
                CONNECTION_FAILURES.with_label_values(&["bind"]).inc();
                self.core.finish_activation(false);
                Err(e)
            }
        }
    }

    fn deactivate(&self) -> Result<(), TransportError> {
        self.core.begin_deactivation()?;

        let acceptor = self.acceptor.lock().take();
        if let Some(acceptor) = acceptor {
            acceptor.stop(DEFAULT_SHUTDOWN_TIMEOUT);
        }
        self.core.shutdown_connections();

        self.core.finish_deactivation();
        info!(options = %self.core.options(), "Server bus inactive");
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.core.is_active()
    }

    fn add_notification_receiver(&self, receiver: Arc<dyn NotificationReceiver>) {
        self.core.add_receiver(receiver);
    }

    fn remove_notification_receiver(&self, receiver: &Arc<dyn NotificationReceiver>) -> bool {
        self.core.remove_receiver(receiver)
    }

    fn handle_outgoing(&self, notification: &Notification) -> Result<(), TransportError> {
        self.core.handle_outgoing(notification)
    }

    fn socket_options(&self) -> &SocketOptions {
        self.core.options()
    }
}
