//! # Ports
//!
//! [`EventHandler`]: what an application registers on an
//! [`InPushConnector`](crate::InPushConnector).

use std::error::Error;

use crate::domain::Event;

/// Failure reported by an [`EventHandler`]. Logged, never propagated.
pub type HandlerError = Box<dyn Error + Send + Sync>;

/// Consumes events delivered by an inbound connector.
///
/// Handlers run on the thread that delivered the notification to the bus
/// and must not block for long.
pub trait EventHandler: Send + Sync {
    /// # Errors
    ///
    /// Any error; it only affects this handler.
    fn handle(&self, event: &Event) -> Result<(), HandlerError>;
}

impl<F> EventHandler for F
where
    F: Fn(&Event) -> Result<(), HandlerError> + Send + Sync,
{
    fn handle(&self, event: &Event) -> Result<(), HandlerError> {
        self(event)
    }
}
