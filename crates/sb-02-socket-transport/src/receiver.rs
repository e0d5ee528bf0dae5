//! Local consumers of notifications passing through a bus.

use std::error::Error;

use shared_types::Notification;

/// Error a receiver reports back to the bus. The bus logs it and carries on
/// with the remaining receivers and connections.
pub type ReceiverError = Box<dyn Error + Send + Sync>;

/// Called for every notification a bus sends or receives.
///
/// Implementations run on the thread that produced the notification: a
/// connection's receive thread for inbound traffic, the publishing thread
/// for outbound traffic. They should return quickly.
pub trait NotificationReceiver: Send + Sync {
    fn handle(&self, notification: &Notification) -> Result<(), ReceiverError>;
}

impl<F> NotificationReceiver for F
where
    F: Fn(&Notification) -> Result<(), ReceiverError> + Send + Sync,
{
    fn handle(&self, notification: &Notification) -> Result<(), ReceiverError> {
        self(notification)
    }
}
