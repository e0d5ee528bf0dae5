//! # Bus Connection
//!
//! One TCP socket taking part in a bus.
//!
//! ## Lifecycle
//!
//! ```text
//! Constructed ──activate()──→ Ready ──deactivate()──→ Deactivated
//!      │                                                   ↑
//!      └──────────────────deactivate()─────────────────────┘
//! ```
//!
//! `activate()` performs the role's half of the handshake: a client reads
//! and verifies the token, a server writes it.
//!
//! ## Threads
//!
//! - Reads happen on the caller's thread. Exactly one thread (the owning
//!   bus's receive thread) may read.
//! - Writes run on a dedicated writer thread fed by a FIFO queue. Callers
//!   block until their own frame has been written, so frames never
//!   interleave and a caller going away cannot tear down a half-written
//!   frame.

use std::fmt;
use std::io;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use prost::Message;
use scope_telemetry::{CONNECTIONS_ACTIVE, NOTIFICATIONS_SENT};
use shared_types::Notification;
use tracing::{debug, warn};

use crate::error::{FramingError, TransportError};
use crate::framing;
use crate::options::SocketOptions;

/// Bounded wait for writer threads, acceptors and receive threads to stop.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Which side of the handshake a connection plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionRole {
    /// Accepted by a listening bus; writes the handshake.
    Server,
    /// Opened to a remote listener; reads the handshake.
    Client,
}

impl ConnectionRole {
    /// Label used in logs and metrics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionRole::Server => "server",
            ConnectionRole::Client => "client",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Constructed,
    Ready,
    Deactivated,
}

// =============================================================================
// Writer thread
// =============================================================================

enum WriteRequest {
    Handshake,
    Frame(Arc<[u8]>),
}

type WriteReply = Result<(), FramingError>;

struct WriteTask {
    request: WriteRequest,
    reply: Sender<WriteReply>,
}

/// Single-threaded executor owning the write half of the socket.
struct WriteExecutor {
    tasks: Sender<WriteTask>,
    finished: Receiver<()>,
    handle: JoinHandle<()>,
}

impl WriteExecutor {
    fn spawn(mut stream: TcpStream, name: String) -> Result<Self, TransportError> {
        let (tasks, queue) = unbounded::<WriteTask>();
        // never sent on; disconnects when the thread exits
        let (done, finished) = bounded::<()>(0);

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let _done = done;
                for task in queue.iter() {
                    let result = match &task.request {
                        WriteRequest::Handshake => framing::write_handshake(&mut stream),
                        WriteRequest::Frame(payload) => framing::write_frame(&mut stream, payload),
                    };
                    let _ = task.reply.send(result);
                }
            })
            .map_err(|source| TransportError::Spawn { name, source })?;

        Ok(Self {
            tasks,
            finished,
            handle,
        })
    }

    fn submit(&self, request: WriteRequest) -> Result<Receiver<WriteReply>, TransportError> {
        let (reply, result) = bounded(1);
        self.tasks
            .send(WriteTask { request, reply })
            .map_err(|_| TransportError::ExecutorStopped)?;
        Ok(result)
    }

    /// Close the queue and wait for the writer to drain it. Returns `false`
    /// if the writer is still running after `timeout`; it is then detached.
    fn shutdown(self, timeout: Duration) -> bool {
        let Self {
            tasks,
            finished,
            handle,
        } = self;
        drop(tasks);
        match finished.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => false,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                let _ = handle.join();
                true
            }
        }
    }
}

// =============================================================================
// Connection
// =============================================================================

struct Inner {
    state: ConnectionState,
    writer: Option<WriteExecutor>,
}

pub struct BusConnection {
    role: ConnectionRole,
    peer: SocketAddr,
    stream: TcpStream,
    inner: Mutex<Inner>,
    active_shutdown: AtomicBool,
}

impl BusConnection {
    /// Open a client connection to `options`, trying every resolved address
    /// in order.
    ///
    /// # Errors
    ///
    /// - [`TransportError::UnresolvableAddress`] if the host does not resolve.
    /// - [`TransportError::Connect`] with the last connect error otherwise.
    pub fn connect(options: &SocketOptions) -> Result<Self, TransportError> {
        let mut last_error = None;
        for addr in options.resolve()? {
            match TcpStream::connect(addr) {
                Ok(stream) => {
                    debug!(%addr, "Connected");
                    return Ok(Self::new(ConnectionRole::Client, stream, addr, options));
                }
                Err(e) => {
                    debug!(%addr, error = %e, "Connect attempt failed");
                    last_error = Some(e);
                }
            }
        }
        Err(TransportError::Connect {
            address: options.to_string(),
            source: last_error.unwrap_or_else(|| io::Error::from(io::ErrorKind::AddrNotAvailable)),
        })
    }

    /// Wrap a stream accepted by a listening bus.
    #[must_use]
    pub fn accepted(stream: TcpStream, peer: SocketAddr, options: &SocketOptions) -> Self {
        Self::new(ConnectionRole::Server, stream, peer, options)
    }

    fn new(role: ConnectionRole, stream: TcpStream, peer: SocketAddr, options: &SocketOptions) -> Self {
        if let Err(e) = stream.set_nodelay(options.tcp_nodelay()) {
            warn!(%peer, error = %e, "Cannot set TCP_NODELAY");
        }
        Self {
            role,
            peer,
            stream,
            inner: Mutex::new(Inner {
                state: ConnectionState::Constructed,
                writer: None,
            }),
            active_shutdown: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn role(&self) -> ConnectionRole {
        self.role
    }

    #[must_use]
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state() == ConnectionState::Ready
    }

    /// Perform the handshake and start the writer thread.
    ///
    /// # Errors
    ///
    /// - [`TransportError::IllegalState`] unless the connection is freshly
    ///   constructed.
    /// - [`TransportError::Handshake`] if the token cannot be exchanged. The
    ///   connection is unusable and must be deactivated by the caller.
    pub fn activate(&self) -> Result<(), TransportError> {
        if self.state() != ConnectionState::Constructed {
            return Err(TransportError::IllegalState(format!(
                "connection to {} already activated",
                self.peer
            )));
        }

        if self.role == ConnectionRole::Client {
            framing::read_handshake(&mut &self.stream).map_err(TransportError::Handshake)?;
        }

        let write_half = self.stream.try_clone().map_err(FramingError::from)?;
        let executor = WriteExecutor::spawn(write_half, format!("sb-writer-{}", self.peer))?;

        let pending_handshake = {
            let mut inner = self.inner.lock();
            if inner.state != ConnectionState::Constructed {
                drop(inner);
                executor.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
                return Err(TransportError::IllegalState(format!(
                    "connection to {} deactivated during activation",
                    self.peer
                )));
            }
            // queued before the state flips, so it precedes every frame
            let pending = match self.role {
                ConnectionRole::Server => Some(executor.submit(WriteRequest::Handshake)?),
                ConnectionRole::Client => None,
            };
            inner.writer = Some(executor);
            inner.state = ConnectionState::Ready;
            pending
        };
        CONNECTIONS_ACTIVE.inc();

        if let Some(reply) = pending_handshake {
            match reply.recv() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(TransportError::Handshake(e)),
                Err(_) => return Err(TransportError::ExecutorStopped),
            }
        }

        debug!(peer = %self.peer, role = self.role.as_str(), "Connection ready");
        Ok(())
    }

    /// Mark the connection as being closed by us. From now on sends are
    /// dropped silently and read errors are expected.
    pub fn mark_active_shutdown(&self) {
        self.active_shutdown.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_active_shutdown(&self) -> bool {
        self.active_shutdown.load(Ordering::Acquire)
    }

    /// Write one encoded envelope, blocking until it is on the socket.
    ///
    /// # Errors
    ///
    /// - [`TransportError::NotActive`] if the connection is not ready.
    /// - [`TransportError::Framing`] if the write fails.
    ///
    /// Once [`Self::mark_active_shutdown`] has been called this returns
    /// `Ok(())` without writing.
    pub fn send_frame(&self, payload: Arc<[u8]>) -> Result<(), TransportError> {
        if self.is_active_shutdown() {
            return Ok(());
        }

        let reply = {
            let inner = self.inner.lock();
            match (&inner.state, &inner.writer) {
                (ConnectionState::Ready, Some(writer)) => writer.submit(WriteRequest::Frame(payload))?,
                _ if self.is_active_shutdown() => return Ok(()),
                _ => return Err(TransportError::NotActive),
            }
        };

        let result = match reply.recv() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(TransportError::Framing(e)),
            Err(_) => Err(TransportError::ExecutorStopped),
        };
        match result {
            Ok(()) => {
                NOTIFICATIONS_SENT
                    .with_label_values(&[self.role.as_str()])
                    .inc();
                Ok(())
            }
            Err(_) if self.is_active_shutdown() => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Encode and write one notification.
    ///
    /// # Errors
    ///
    /// See [`Self::send_frame`].
    pub fn send_notification(&self, notification: &Notification) -> Result<(), TransportError> {
        self.send_frame(notification.encode_to_vec().into())
    }

    /// Block until the next frame arrives and return its payload.
    ///
    /// # Errors
    ///
    /// - [`TransportError::NotActive`] if the connection is not ready.
    /// - [`TransportError::Framing`] on a short read or a closed socket.
    pub fn read_frame(&self) -> Result<Vec<u8>, TransportError> {
        if !self.is_ready() {
            return Err(TransportError::NotActive);
        }
        Ok(framing::read_frame(&mut &self.stream)?)
    }

    /// Block until the next notification arrives.
    ///
    /// # Errors
    ///
    /// As [`Self::read_frame`], plus
    /// [`TransportError::MalformedNotification`] for an undecodable frame.
    pub fn read_notification(&self) -> Result<Notification, TransportError> {
        let frame = self.read_frame()?;
        Ok(Notification::decode(frame.as_slice())?)
    }

    /// Close the socket and stop the writer thread, waiting at most
    /// [`DEFAULT_SHUTDOWN_TIMEOUT`] for it.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::IllegalState`] if already deactivated.
    pub fn deactivate(&self) -> Result<(), TransportError> {
        let (was_ready, writer) = {
            let mut inner = self.inner.lock();
            if inner.state == ConnectionState::Deactivated {
                return Err(TransportError::IllegalState(format!(
                    "connection to {} already deactivated",
                    self.peer
                )));
            }
            let was_ready = inner.state == ConnectionState::Ready;
            inner.state = ConnectionState::Deactivated;
            (was_ready, inner.writer.take())
        };

        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            if e.kind() != io::ErrorKind::NotConnected {
                debug!(peer = %self.peer, error = %e, "Socket shutdown failed");
            }
        }
        if was_ready {
            CONNECTIONS_ACTIVE.dec();
        }
        if let Some(writer) = writer {
            if !writer.shutdown(DEFAULT_SHUTDOWN_TIMEOUT) {
                warn!(
                    peer = %self.peer,
                    timeout_secs = DEFAULT_SHUTDOWN_TIMEOUT.as_secs(),
                    "Writer thread did not stop in time, detaching it"
                );
            }
        }

        debug!(peer = %self.peer, role = self.role.as_str(), "Connection deactivated");
        Ok(())
    }
}

impl fmt::Debug for BusConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusConnection")
            .field("role", &self.role)
            .field("peer", &self.peer)
            .field("state", &self.state())
            .field("active_shutdown", &self.is_active_shutdown())
            .finish()
    }
}
