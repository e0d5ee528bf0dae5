//! Process-wide registry of shared buses, keyed by [`SocketOptions`].
//!
//! Every operation goes through [`BusCache::lock`], so a caller can check,
//! create and register a bus as one atomic step.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use crate::bus::Bus;
use crate::error::TransportError;
use crate::options::SocketOptions;

#[derive(Debug, Default)]
pub struct BusCache {
    buses: Mutex<HashMap<SocketOptions, Arc<dyn Bus>>>,
}

impl BusCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the cache lock for a compound operation.
    pub fn lock(&self) -> BusCacheGuard<'_> {
        BusCacheGuard {
            buses: self.buses.lock(),
        }
    }

    /// # Errors
    ///
    /// See [`BusCacheGuard::register`].
    pub fn register(&self, bus: Arc<dyn Bus>, replace: bool) -> Result<(), TransportError> {
        self.lock().register(bus, replace)
    }

    pub fn unregister(&self, bus: &Arc<dyn Bus>) -> bool {
        self.lock().unregister(bus)
    }

    #[must_use]
    pub fn get(&self, options: &SocketOptions) -> Option<Arc<dyn Bus>> {
        self.lock().get(options)
    }

    #[must_use]
    pub fn has_bus(&self, options: &SocketOptions) -> bool {
        self.lock().has_bus(options)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive access to a [`BusCache`].
pub struct BusCacheGuard<'a> {
    buses: MutexGuard<'a, HashMap<SocketOptions, Arc<dyn Bus>>>,
}

impl BusCacheGuard<'_> {
    /// Add `bus` under its own socket options.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::IllegalArgument`] if a bus is already
    /// registered for those options and `replace` is false.
    pub fn register(&mut self, bus: Arc<dyn Bus>, replace: bool) -> Result<(), TransportError> {
        let options = bus.socket_options().clone();
        if !replace && self.buses.contains_key(&options) {
            return Err(TransportError::IllegalArgument(format!(
                "a bus for {options} is already registered"
            )));
        }
        debug!(%options, replace, "Registering bus");
        self.buses.insert(options, bus);
        Ok(())
    }

    /// Remove the entry for `bus`'s socket options. Returns whether an entry
    /// was removed.
    pub fn unregister(&mut self, bus: &Arc<dyn Bus>) -> bool {
        let options = bus.socket_options();
        if self.buses.remove(options).is_some() {
            debug!(%options, "Unregistered bus");
            true
        } else {
            debug!(%options, "No bus registered, nothing to unregister");
            false
        }
    }

    #[must_use]
    pub fn get(&self, options: &SocketOptions) -> Option<Arc<dyn Bus>> {
        self.buses.get(options).cloned()
    }

    #[must_use]
    pub fn has_bus(&self, options: &SocketOptions) -> bool {
        self.buses.contains_key(options)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::ClientBus;

    fn bus(port: u16) -> Arc<dyn Bus> {
        Arc::new(ClientBus::new(SocketOptions::new("127.0.0.1", port, true)))
    }

    #[test]
    fn test_register_rejects_duplicate_unless_replacing() {
        let cache = BusCache::new();
        let first = bus(1);
        let second = bus(1);

        cache.register(first.clone(), false).unwrap();
        assert!(matches!(
            cache.register(second.clone(), false),
            Err(TransportError::IllegalArgument(_))
        ));
        assert!(Arc::ptr_eq(&cache.get(first.socket_options()).unwrap(), &first));

        cache.register(second.clone(), true).unwrap();
        assert!(Arc::ptr_eq(&cache.get(first.socket_options()).unwrap(), &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_unregister_absent_is_noop() {
        let cache = BusCache::new();
        let registered = bus(1);
        cache.register(registered.clone(), false).unwrap();

        assert!(!cache.unregister(&bus(2)));
        assert!(cache.has_bus(registered.socket_options()));
        assert!(cache.unregister(&registered));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_guard_allows_check_then_register() {
        let cache = BusCache::new();
        let options = SocketOptions::new("127.0.0.1", 3, true);
        {
            let mut guard = cache.lock();
            assert!(!guard.has_bus(&options));
            guard.register(bus(3), false).unwrap();
            assert!(guard.has_bus(&options));
        }
        assert!(cache.get(&options).is_some());
    }
}
