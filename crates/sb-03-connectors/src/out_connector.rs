//! # Out Connector
//!
//! Publishes [`Event`]s on a scope.
//!
//! ## Push
//!
//! 1. Reject events outside the connector scope.
//! 2. Assign the next event id if the event has none.
//! 3. Stamp the send time.
//! 4. Serialize with the converter selected by data type name.
//! 5. Hand the notification to the bus.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use sb_01_converters::ConverterSelectionStrategy;
use sb_02_socket_transport::{SocketConfig, SocketConnector};
use scope_telemetry::CONVERTER_ERRORS;
use shared_types::{EventId, ParticipantId, Scope};
use tracing::{debug, warn};

use crate::binding::BusBinding;
use crate::domain::{now_micros, Event};
use crate::envelope;
use crate::error::ConnectorError;

#[derive(Debug)]
pub struct OutConnector {
    scope: Scope,
    participant_id: ParticipantId,
    next_sequence_number: AtomicU32,
    converters: Arc<dyn ConverterSelectionStrategy>,
    binding: BusBinding,
}

impl OutConnector {
    #[must_use]
    pub fn new(
        scope: Scope,
        config: SocketConfig,
        connector: SocketConnector,
        converters: Arc<dyn ConverterSelectionStrategy>,
    ) -> Self {
        Self {
            scope,
            participant_id: ParticipantId::random(),
            next_sequence_number: AtomicU32::new(0),
            converters,
            binding: BusBinding::new(config, connector),
        }
    }

    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Sender id of every event this connector numbers.
    #[must_use]
    pub fn participant_id(&self) -> ParticipantId {
        self.participant_id
    }

    #[must_use]
    pub fn config(&self) -> &SocketConfig {
        self.binding.config()
    }

    /// # Errors
    ///
    /// [`ConnectorError::IllegalState`] if already active, or the bus
    /// acquisition error.
    pub fn activate(&self) -> Result<(), ConnectorError> {
        self.binding.bind(|_| {})?;
        debug!(scope = %self.scope, participant = %self.participant_id, "Out connector active");
        Ok(())
    }

    /// # Errors
    ///
    /// [`ConnectorError::IllegalState`] if not active, or the bus release
    /// error.
    pub fn deactivate(&self) -> Result<(), ConnectorError> {
        self.binding.unbind(|_| {})?;
        debug!(scope = %self.scope, "Out connector inactive");
        Ok(())
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.binding.is_bound()
    }

    /// Publish `event` and return it with its id and send time set.
    ///
    /// # Errors
    ///
    /// - [`ConnectorError::NotActive`] before `activate()`
    /// - [`ConnectorError::ScopeMismatch`] for an event outside the scope
    /// - selection, conversion or transport errors
    pub fn push(&self, mut event: Event) -> Result<Event, ConnectorError> {
        let bus = self.binding.current().ok_or(ConnectorError::NotActive)?;
        if !event.scope().is_within(&self.scope) {
            return Err(ConnectorError::ScopeMismatch {
                connector: self.scope.clone(),
                event: event.scope().clone(),
            });
        }

        if event.event_id().is_none() {
            let sequence_number = self.next_sequence_number.fetch_add(1, Ordering::Relaxed);
            event.set_event_id(EventId::new(self.participant_id, sequence_number));
        }
        event.meta_data_mut().set_send_time(now_micros());

        let notification = envelope::to_notification(&event, self.converters.as_ref()).map_err(|e| {
            if e.is_conversion() {
                CONVERTER_ERRORS.with_label_values(&["serialize"]).inc();
                warn!(scope = %event.scope(), data_type = %event.data().data_type(), error = %e, "Cannot serialize event");
            }
            e
        })?;
        bus.handle_outgoing(&notification)?;
        Ok(event)
    }
}

impl Drop for OutConnector {
    fn drop(&mut self) {
        if self.binding.is_bound() {
            if let Err(e) = self.deactivate() {
                warn!(scope = %self.scope, error = %e, "Cannot release bus of dropped out connector");
            }
        }
    }
}
