//! # In Push Connector
//!
//! Delivers events on a scope and its sub-scopes to registered
//! [`EventHandler`]s as they arrive.
//!
//! The connector registers one [`NotificationReceiver`] on its bus. For each
//! notification it:
//!
//! 1. drops it unless its scope is within the connector scope,
//! 2. deserializes it with the converter selected by wire schema,
//! 3. stamps the receive and deliver times,
//! 4. calls every handler. A failing or panicking handler does not affect
//!    the others.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;
use sb_01_converters::ConverterSelectionStrategy;
use sb_02_socket_transport::{Bus, NotificationReceiver, ReceiverError, SocketConfig, SocketConnector};
use scope_telemetry::CONVERTER_ERRORS;
use shared_types::{Notification, Scope};
use tracing::{debug, warn};

use crate::binding::BusBinding;
use crate::domain::{now_micros, Event};
use crate::envelope;
use crate::error::ConnectorError;
use crate::ports::EventHandler;

pub struct InPushConnector {
    dispatcher: Arc<Dispatcher>,
    receiver: Arc<dyn NotificationReceiver>,
    binding: BusBinding,
}

impl InPushConnector {
    #[must_use]
    pub fn new(
        scope: Scope,
        config: SocketConfig,
        connector: SocketConnector,
        converters: Arc<dyn ConverterSelectionStrategy>,
    ) -> Self {
        let dispatcher = Arc::new(Dispatcher {
            scope,
            converters,
            handlers: RwLock::new(Vec::new()),
        });
        let receiver: Arc<dyn NotificationReceiver> = dispatcher.clone();
        Self {
            dispatcher,
            receiver,
            binding: BusBinding::new(config, connector),
        }
    }

    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.dispatcher.scope
    }

    #[must_use]
    pub fn config(&self) -> &SocketConfig {
        self.binding.config()
    }

    /// Acquire the bus and start delivering.
    ///
    /// # Errors
    ///
    /// [`ConnectorError::IllegalState`] if already active, or the bus
    /// acquisition error.
    pub fn activate(&self) -> Result<(), ConnectorError> {
        self.binding
            .bind(|bus: &Arc<dyn Bus>| bus.add_notification_receiver(Arc::clone(&self.receiver)))?;
        debug!(scope = %self.scope(), "In push connector active");
        Ok(())
    }

    /// Stop delivering and release the bus.
    ///
    /// # Errors
    ///
    /// [`ConnectorError::IllegalState`] if not active, or the bus release
    /// error.
    pub fn deactivate(&self) -> Result<(), ConnectorError> {
        self.binding.unbind(|bus: &Arc<dyn Bus>| {
            bus.remove_notification_receiver(&self.receiver);
        })?;
        debug!(scope = %self.scope(), "In push connector inactive");
        Ok(())
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.binding.is_bound()
    }

    pub fn add_handler(&self, handler: Arc<dyn EventHandler>) {
        self.dispatcher.handlers.write().push(handler);
    }

    /// Remove a handler, compared by identity. Returns whether it was
    /// registered.
    pub fn remove_handler(&self, handler: &Arc<dyn EventHandler>) -> bool {
        let mut handlers = self.dispatcher.handlers.write();
        let before = handlers.len();
        handlers.retain(|h| !std::ptr::addr_eq(Arc::as_ptr(h), Arc::as_ptr(handler)));
        handlers.len() != before
    }

    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.dispatcher.handlers.read().len()
    }
}

impl std::fmt::Debug for InPushConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InPushConnector")
            .field("scope", &self.dispatcher.scope)
            .field("handlers", &self.handler_count())
            .field("binding", &self.binding)
            .finish()
    }
}

impl Drop for InPushConnector {
    fn drop(&mut self) {
        if self.binding.is_bound() {
            if let Err(e) = self.deactivate() {
                warn!(scope = %self.scope(), error = %e, "Cannot release bus of dropped in push connector");
            }
        }
    }
}

// =============================================================================
// Dispatch
// =============================================================================

struct Dispatcher {
    scope: Scope,
    converters: Arc<dyn ConverterSelectionStrategy>,
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
}

impl Dispatcher {
    fn accepts(&self, notification: &Notification) -> bool {
        match Scope::parse(&notification.scope_lossy()) {
            Ok(scope) => scope.is_within(&self.scope),
            // decoding reports the bad scope
            Err(_) => true,
        }
    }

    fn dispatch(&self, event: &Event) {
        let handlers: Vec<_> = self.handlers.read().clone();
        for handler in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler.handle(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(scope = %event.scope(), error = %e, "Event handler failed"),
                Err(_) => warn!(scope = %event.scope(), "Event handler panicked"),
            }
        }
    }
}

impl NotificationReceiver for Dispatcher {
    fn handle(&self, notification: &Notification) -> Result<(), ReceiverError> {
        if !self.accepts(notification) {
            return Ok(());
        }
        let receive_time = now_micros();

        let mut event = match envelope::from_notification(notification, self.converters.as_ref()) {
            Ok(event) => event,
            Err(e) => {
                if e.is_conversion() {
                    CONVERTER_ERRORS.with_label_values(&["deserialize"]).inc();
                }
                return Err(Box::new(e));
            }
        };

        let meta_data = event.meta_data_mut();
        meta_data.set_receive_time(receive_time);
        meta_data.set_deliver_time(now_micros());
        self.dispatch(&event);
        Ok(())
    }
}
