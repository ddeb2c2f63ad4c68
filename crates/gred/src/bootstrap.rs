//! Turns configuration into a ready-to-start module.

use std::sync::Arc;

use ortho_config::OrthoError;
use thiserror::Error;

use gre_config::{Config, ConfigError};

use crate::controller::{ControllerSettings, ModuleController};
use crate::health::LifecycleReporter;
use crate::host::{HostLeaves, HostStack, InterfaceManagerHandle, TunnelTableHandle};
use crate::lock_group::SystemLockGroupAllocator;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the module configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader returning a configuration resolved elsewhere.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already resolved configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Configuration loaded but holds unusable values.
    #[error("invalid configuration: {source}")]
    Validation {
        /// Rule that was broken.
        #[source]
        source: ConfigError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
}

/// Controller wired to an in-process host, plus the handles around it.
pub struct Module {
    config: Config,
    controller: ModuleController<SystemLockGroupAllocator>,
    host: HostStack,
    leaves: HostView,
    telemetry: TelemetryHandle,
}

/// Live handles onto the leaves owned by the controller.
#[derive(Debug, Clone)]
pub struct HostView {
    /// Lookup surface of the tunnel table.
    pub tunnels: TunnelTableHandle,
    /// Attach surface of the interface manager.
    pub interfaces: InterfaceManagerHandle,
}

impl Module {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Controller driving the module lifecycle.
    pub fn controller_mut(&mut self) -> &mut ModuleController<SystemLockGroupAllocator> {
        &mut self.controller
    }

    /// Read-only view of the controller.
    #[must_use]
    pub fn controller(&self) -> &ModuleController<SystemLockGroupAllocator> {
        &self.controller
    }

    /// Host registries the leaves plug into.
    #[must_use]
    pub fn host(&self) -> &HostStack {
        &self.host
    }

    /// Handles onto the tunnel table and interface manager.
    #[must_use]
    pub fn leaves(&self) -> &HostView {
        &self.leaves
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }
}

/// Loads and validates configuration, initialises telemetry and builds the
/// controller over `host`.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn LifecycleReporter>,
    host: HostStack,
) -> Result<Module, BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    config
        .validate()
        .map_err(|source| BootstrapError::Validation { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;

    let HostLeaves {
        subsystems,
        tunnels,
        interfaces,
    } = host.leaves(&config);
    let controller = ModuleController::new(
        ControllerSettings::from_config(&config),
        SystemLockGroupAllocator::new(),
        subsystems,
        reporter,
    );

    Ok(Module {
        config,
        controller,
        host,
        leaves: HostView { tunnels, interfaces },
        telemetry,
    })
}
