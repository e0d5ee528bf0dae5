//! Acquire and release of the shared bus behind a connector.

use std::sync::Arc;

use parking_lot::Mutex;
use sb_02_socket_transport::{Bus, SocketConfig, SocketConnector};

use crate::error::ConnectorError;

#[derive(Debug)]
pub(crate) struct BusBinding {
    config: SocketConfig,
    connector: SocketConnector,
    bus: Mutex<Option<Arc<dyn Bus>>>,
}

impl BusBinding {
    pub(crate) fn new(config: SocketConfig, connector: SocketConnector) -> Self {
        Self {
            config,
            connector,
            bus: Mutex::new(None),
        }
    }

    pub(crate) fn config(&self) -> &SocketConfig {
        &self.config
    }

    /// Acquire the shared bus and run `attach` on it before it becomes
    /// visible to [`Self::current`].
    pub(crate) fn bind(&self, attach: impl FnOnce(&Arc<dyn Bus>)) -> Result<(), ConnectorError> {
        let mut bus = self.bus.lock();
        if bus.is_some() {
            return Err(ConnectorError::IllegalState(format!(
                "connector on {} is already active",
                self.config.options
            )));
        }
        let acquired = self
            .connector
            .acquire(&self.config.options, self.config.server_mode)?;
        attach(&acquired);
        *bus = Some(acquired);
        Ok(())
    }

    /// Run `detach` on the bound bus and release it.
    pub(crate) fn unbind(&self, detach: impl FnOnce(&Arc<dyn Bus>)) -> Result<(), ConnectorError> {
        let Some(bus) = self.bus.lock().take() else {
            return Err(ConnectorError::IllegalState(format!(
                "connector on {} is not active",
                self.config.options
            )));
        };
        detach(&bus);
        bus.deactivate()?;
        Ok(())
    }

    pub(crate) fn current(&self) -> Option<Arc<dyn Bus>> {
        self.bus.lock().clone()
    }

    pub(crate) fn is_bound(&self) -> bool {
        self.bus.lock().is_some()
    }
}
