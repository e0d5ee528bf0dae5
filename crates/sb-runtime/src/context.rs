//! # Runtime Context
//!
//! Owns the process-wide singletons and hands out connectors wired to them:
//!
//! | Component | Shared by |
//! |-----------|-----------|
//! | `ConverterRepository` | every connector created afterwards |
//! | `SocketConnector` (server and client `BusCache`s) | every connector |
//!
//! Connectors take a snapshot of the converter selection strategies when
//! they are created; converters registered later only affect connectors
//! created later.

use std::sync::Arc;

use sb_01_converters::{ConverterRepository, ConverterSelectionStrategy};
use sb_02_socket_transport::{SocketConfig, SocketConnector};
use sb_03_connectors::{ConnectorError, InPushConnector, OutConnector};
use shared_types::Scope;
use tracing::debug;

use crate::config::RuntimeConfig;

#[derive(Debug, Clone)]
pub struct RuntimeContext {
    config: RuntimeConfig,
    repository: Arc<ConverterRepository>,
    connector: SocketConnector,
}

impl RuntimeContext {
    /// Context with the default converters and fresh bus caches.
    #[must_use]
    pub fn new(config: RuntimeConfig) -> Self {
        Self::with_repository(config, Arc::new(ConverterRepository::with_default_converters()))
    }

    #[must_use]
    pub fn with_repository(config: RuntimeConfig, repository: Arc<ConverterRepository>) -> Self {
        Self {
            config,
            repository,
            connector: SocketConnector::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[must_use]
    pub fn repository(&self) -> &Arc<ConverterRepository> {
        &self.repository
    }

    #[must_use]
    pub fn socket_connector(&self) -> &SocketConnector {
        &self.connector
    }

    /// # Errors
    ///
    /// [`ConnectorError::Selection`] if two registered converters compete
    /// for one data type.
    pub fn create_out_connector(&self, scope: Scope) -> Result<OutConnector, ConnectorError> {
        self.create_out_connector_with(scope, self.config.socket.clone())
    }

    /// Like [`Self::create_out_connector`] with explicit socket settings.
    ///
    /// # Errors
    ///
    /// See [`Self::create_out_connector`].
    pub fn create_out_connector_with(
        &self,
        scope: Scope,
        socket: SocketConfig,
    ) -> Result<OutConnector, ConnectorError> {
        let converters: Arc<dyn ConverterSelectionStrategy> =
            Arc::new(self.repository.converters_for_serialization()?);
        debug!(%scope, options = %socket.options, "Creating out connector");
        Ok(OutConnector::new(scope, socket, self.connector.clone(), converters))
    }

    /// # Errors
    ///
    /// [`ConnectorError::Selection`] if two registered converters compete
    /// for one wire schema.
    pub fn create_in_push_connector(&self, scope: Scope) -> Result<InPushConnector, ConnectorError> {
        self.create_in_push_connector_with(scope, self.config.socket.clone())
    }

    /// Like [`Self::create_in_push_connector`] with explicit socket settings.
    ///
    /// # Errors
    ///
    /// See [`Self::create_in_push_connector`].
    pub fn create_in_push_connector_with(
        &self,
        scope: Scope,
        socket: SocketConfig,
    ) -> Result<InPushConnector, ConnectorError> {
        let converters: Arc<dyn ConverterSelectionStrategy> =
            Arc::new(self.repository.converters_for_deserialization()?);
        debug!(%scope, options = %socket.options, "Creating in push connector");
        Ok(InPushConnector::new(scope, socket, self.connector.clone(), converters))
    }
}
