//! Bus with exactly one outgoing connection.

use std::sync::Arc;

use scope_telemetry::CONNECTION_FAILURES;
use shared_types::Notification;
use tracing::{debug, info};

use super::{Bus, BusCore};
use crate::connection::{BusConnection, ConnectionRole};
use crate::error::TransportError;
use crate::options::SocketOptions;
use crate::receiver::NotificationReceiver;

#[derive(Debug)]
pub struct ClientBus {
    core: Arc<BusCore>,
}

impl ClientBus {
    #[must_use]
    pub fn new(options: SocketOptions) -> Self {
        Self {
            core: Arc::new(BusCore::new(ConnectionRole::Client, options)),
        }
    }

    /// Whether the connection to the server is still up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.core.connection_count() > 0
    }

    fn connect(&self) -> Result<(), TransportError> {
        let connection = match BusConnection::connect(self.core.options()) {
            Ok(connection) => Arc::new(connection),
            Err(e) => {
                CONNECTION_FAILURES.with_label_values(&["connect"]).inc();
                return Err(e);
            }
        };
        let id = self.core.register_connection(Arc::clone(&connection));

        let started = connection
            .activate()
            .and_then(|()| self.core.start_receiving(id));
        if let Err(e) = started {
            self.core.remove_connection(id);
            if let Err(close) = connection.deactivate() {
                debug!(error = %close, "Connection already closed");
            }
            CONNECTION_FAILURES.with_label_values(&["handshake"]).inc();
            return Err(e);
        }
        Ok(())
    }
}

impl Bus for ClientBus {
    fn activate(&self) -> Result<(), TransportError> {
        self.core.begin_activation()?;
        match self.connect() {
            Ok(()) => {
                self.core.finish_activation(true);
                info!(options = %self.core.options(), "Client bus active");
                Ok(())
            }
            Err(e) => {
                self.core.finish_activation(false);
                Err(e)
            }
        }
    }

    fn deactivate(&self) -> Result<(), TransportError> {
        self.core.begin_deactivation()?;
        self.core.shutdown_connections();
        self.core.finish_deactivation();
        info!(options = %self.core.options(), "Client bus inactive");
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
