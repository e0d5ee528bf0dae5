//! Shares one bus between several owners.
//!
//! The wrapped bus is activated on the first `activate()` and deactivated
//! on the matching last `deactivate()`. Each time the count drops to zero
//! the deactivation callback runs once, after the count lock is released.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use shared_types::Notification;
use tracing::debug;

use super::Bus;
use crate::error::TransportError;
use crate::options::SocketOptions;
use crate::receiver::NotificationReceiver;

/// Runs when the last owner releases a [`RefCountingBus`].
pub type DeactivationCallback = Arc<dyn Fn(&RefCountingBus) + Send + Sync>;

pub struct RefCountingBus {
    inner: Arc<dyn Bus>,
    count: Mutex<usize>,
    on_last_deactivate: Mutex<Option<DeactivationCallback>>,
}

impl RefCountingBus {
    #[must_use]
    pub fn new(inner: Arc<dyn Bus>) -> Self {
        Self {
            inner,
            count: Mutex::new(0),
            on_last_deactivate: Mutex::new(None),
        }
    }

    pub fn set_deactivation_callback(&self, callback: DeactivationCallback) {
        *self.on_last_deactivate.lock() = Some(callback);
    }

    /// Current number of owners.
    #[must_use]
    pub fn ref_count(&self) -> usize {
        *self.count.lock()
    }

    #[must_use]
    pub fn inner(&self) -> &Arc<dyn Bus> {
        &self.inner
    }
}

impl Bus for RefCountingBus {
    fn activate(&self) -> Result<(), TransportError> {
        let mut count = self.count.lock();
        if *count == 0 {
            self.inner.activate()?;
        }
        *count += 1;
        debug!(options = %self.inner.socket_options(), count = *count, "Bus reference acquired");
        Ok(())
    }

    fn deactivate(&self) -> Result<(), TransportError> {
        let result = {
            let mut count = self.count.lock();
            if *count == 0 {
                return Err(TransportError::IllegalState(format!(
                    "bus on {} deactivated more often than activated",
                    self.inner.socket_options()
                )));
            }
            *count -= 1;
            debug!(options = %self.inner.socket_options(), count = *count, "Bus reference released");
            if *count > 0 {
                return Ok(());
            }
            self.inner.deactivate()
        };

        let callback = self.on_last_deactivate.lock().clone();
        if let Some(callback) = callback {
            callback(self);
        }
        result
    }

    fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    fn add_notification_receiver(&self, receiver: Arc<dyn NotificationReceiver>) {
        self.inner.add_notification_receiver(receiver);
    }

    fn remove_notification_receiver(&self, receiver: &Arc<dyn NotificationReceiver>) -> bool {
        self.inner.remove_notification_receiver(receiver)
    }

    fn handle_outgoing(&self, notification: &Notification) -> Result<(), TransportError> {
        self.inner.handle_outgoing(notification)
    }

    fn socket_options(&self) -> &SocketOptions {
        self.inner.socket_options()
    }
}

impl fmt::Debug for RefCountingBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefCountingBus")
            .field("inner", &self.inner)
            .field("count", &self.ref_count())
            .finish_non_exhaustive()
    }
}
