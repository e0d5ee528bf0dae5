//! Shared fixtures.

use std::net::TcpListener;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver};
use sb_02_socket_transport::{NotificationReceiver, ReceiverError, SocketOptions};
use shared_types::Notification;

/// Generous bound for anything that crosses a socket.
pub const WAIT: Duration = Duration::from_secs(5);

/// Short bound for asserting that nothing arrives.
pub const QUIET: Duration = Duration::from_millis(200);

pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

pub fn loopback() -> SocketOptions {
    SocketOptions::new("127.0.0.1", free_port(), true)
}

pub fn notification(scope: &str, data: Vec<u8>) -> Notification {
    Notification {
        scope: scope.as_bytes().to_vec(),
        wire_schema: b"bytes".to_vec(),
        data,
        ..Default::default()
    }
}

/// Receiver forwarding every notification into a channel.
pub fn collector() -> (Arc<dyn NotificationReceiver>, Receiver<Notification>) {
    let (tx, rx) = unbounded();
    let receiver: Arc<dyn NotificationReceiver> =
        Arc::new(move |n: &Notification| -> Result<(), ReceiverError> {
            let _ = tx.send(n.clone());
            Ok(())
        });
    (receiver, rx)
}

/// Poll `condition` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}
