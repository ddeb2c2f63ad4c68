//! Module lifecycle controller.
//!
//! The controller owns the lock group and the acquisition stack. Activation
//! allocates the group and brings every subsystem up in a fixed order; any
//! failure unwinds what was acquired and leaves the module unloaded.
//! Deactivation releases in the exact reverse order and frees the group last.
//!
//! Calls take `&mut self`, so a controller can only ever run one transition
//! at a time.

use std::sync::Arc;

use gre_config::{Config, TeardownPolicy};
use tracing::{debug, warn};

use crate::acquisition::{AcquireFailure, AcquisitionStack, ReleaseFailure};
use crate::diagnostics::{DiagnosticsNode, DiagnosticsRegistry, DiagnosticsStep};
use crate::error::LifecycleError;
use crate::health::LifecycleReporter;
use crate::lock_group::{LockGroup, LockGroupAllocator, LockGroupAttributes};
use crate::state::{ModuleState, ModuleStatus, StatusHandle};
use crate::subsystem::{Subsystem, SubsystemKind};

const CONTROLLER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::controller");

/// Result of a successful [`ModuleController::activate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// Every subsystem was brought up by this call.
    Activated,
    /// The module was already loaded; nothing was touched.
    AlreadyLoaded,
}

/// Result of a successful [`ModuleController::deactivate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeactivationOutcome {
    /// Every subsystem and the lock group were released by this call.
    Deactivated,
    /// The module was not loaded; nothing was touched.
    AlreadyUnloaded,
}

/// Settings the controller reads from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Name passed to the lock group allocator.
    pub lock_group_name: String,
    /// Attributes passed to the lock group allocator.
    pub lock_group_attributes: LockGroupAttributes,
    /// Name of the diagnostics node.
    pub diagnostics_node: String,
    /// How deactivation reacts to a failing release.
    pub teardown_policy: TeardownPolicy,
}

impl ControllerSettings {
    /// Extracts controller settings from the resolved configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            lock_group_name: config.lock_group_name().to_owned(),
            lock_group_attributes: LockGroupAttributes::default(),
            diagnostics_node: config.diagnostics_node().to_owned(),
            teardown_policy: config.teardown_policy(),
        }
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// The five leaves the controller sequences after the lock group.
pub struct ModuleSubsystems {
    /// Protocol registrar.
    pub protocol: Box<dyn Subsystem>,
    /// Tunnel lookup table.
    pub tunnel_table: Box<dyn Subsystem>,
    /// Virtual interface manager.
    pub interfaces: Box<dyn Subsystem>,
    /// Packet filter hook.
    pub packet_filter: Box<dyn Subsystem>,
    /// Registry receiving the diagnostics node.
    pub diagnostics: Box<dyn DiagnosticsRegistry>,
}

/// Coordinates activation and deactivation of the module.
pub struct ModuleController<A> {
    allocator: A,
    settings: ControllerSettings,
    group: Option<LockGroup>,
    stack: AcquisitionStack,
    state: ModuleState,
    status: StatusHandle,
    reporter: Arc<dyn LifecycleReporter>,
}

impl<A> ModuleController<A>
where
    A: LockGroupAllocator,
{
    /// Builds an unloaded controller.
    ///
    /// The subsystems are stacked in activation order: protocol, tunnel
    /// table, interfaces, packet filter, diagnostics.
    #[must_use]
    pub fn new(
        settings: ControllerSettings,
        allocator: A,
        subsystems: ModuleSubsystems,
        reporter: Arc<dyn LifecycleReporter>,
    ) -> Self {
        let status = StatusHandle::new(settings.lock_group_name.as_str());
        let node = DiagnosticsNode::new(settings.diagnostics_node.as_str(), status.clone());

        let ModuleSubsystems {
            protocol,
            tunnel_table,
            interfaces,
            packet_filter,
            diagnostics,
        } = subsystems;
        let mut stack = AcquisitionStack::new();
        stack.push(protocol);
        stack.push(tunnel_table);
        stack.push(interfaces);
        stack.push(packet_filter);
        stack.push(Box::new(DiagnosticsStep::new(diagnostics, node)));

        Self {
            allocator,
            settings,
            group: None,
            stack,
            state: ModuleState::Unloaded,
            status,
            reporter,
        }
    }

    /// Brings the module up.
    ///
    /// Returns [`ActivationOutcome::AlreadyLoaded`] without touching any
    /// subsystem when the module is already loaded.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::ResourceExhausted`] when the lock group cannot be
    ///   allocated. No subsystem is called.
    /// - [`LifecycleError::DependencyInitFailed`] when a subsystem fails to
    ///   come up. Everything acquired beforehand, the lock group included,
    ///   has been released and the module is unloaded.
    /// - [`LifecycleError::InterruptedTransition`] when a previous call
    ///   unwound part-way.
    pub fn activate(&mut self) -> Result<ActivationOutcome, LifecycleError> {
        match self.state {
            ModuleState::Loaded => {
                self.reporter.activation_skipped(self.state);
                return Ok(ActivationOutcome::AlreadyLoaded);
            }
            state if state.is_transitional() => {
                let error = LifecycleError::InterruptedTransition { state };
                self.reporter.activation_failed(&error);
                return Err(error);
            }
            _ => {}
        }

        self.reporter.activation_starting();
        self.enter(ModuleState::Activating);

        match self.bring_up() {
            Ok(()) => {
                self.status.update(|status| status.activations += 1);
                self.enter(ModuleState::Loaded);
                self.reporter.activation_succeeded(&self.status.snapshot());
                Ok(ActivationOutcome::Activated)
            }
            Err(error) => {
                self.enter(ModuleState::Unloaded);
                self.reporter.activation_failed(&error);
                Err(error)
            }
        }
    }

    /// Tears the module down.
    ///
    /// Returns [`DeactivationOutcome::AlreadyUnloaded`] without touching any
    /// subsystem when the module is not loaded.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::DependencyDisposeFailed`] when a release fails. The
    /// module stays loaded and keeps the lock group. Under
    /// [`TeardownPolicy::FailFast`] nothing after the failing release is
    /// attempted; under [`TeardownPolicy::Exhaustive`] every release is
    /// attempted and the error lists each failure. A later call retries only
    /// the subsystems still held.
    pub fn deactivate(&mut self) -> Result<DeactivationOutcome, LifecycleError> {
        match self.state {
            ModuleState::Unloaded => {
                self.reporter.deactivation_skipped(self.state);
                return Ok(DeactivationOutcome::AlreadyUnloaded);
            }
            state if state.is_transitional() => {
                let error = LifecycleError::InterruptedTransition { state };
                self.reporter.deactivation_failed(&error);
                return Err(error);
            }
            _ => {}
        }

        self.reporter.deactivation_starting();
        self.enter(ModuleState::Deactivating);

        match self
            .stack
            .release_all(self.settings.teardown_policy, self.reporter.as_ref())
        {
            Ok(()) => {
                self.free_group();
                self.status.update(|status| status.deactivations += 1);
                self.enter(ModuleState::Unloaded);
                self.reporter.deactivation_succeeded(&self.status.snapshot());
                Ok(DeactivationOutcome::Deactivated)
            }
            Err(ReleaseFailure { first, further }) => {
                let error = LifecycleError::DependencyDisposeFailed {
                    subsystem: first.kind,
                    source: first,
                    further,
                };
                self.enter(ModuleState::Loaded);
                self.reporter.deactivation_failed(&error);
                Err(error)
            }
        }
    }

    fn bring_up(&mut self) -> Result<(), LifecycleError> {
        let Some(group) = self.allocator.allocate(
            &self.settings.lock_group_name,
            self.settings.lock_group_attributes,
        ) else {
            return Err(LifecycleError::ResourceExhausted {
                group: self.settings.lock_group_name.clone(),
            });
        };
        debug!(
            target: CONTROLLER_TARGET,
            lock_group = group.name(),
            "lock group allocated"
        );

        // Recorded before any leaf runs so an unwinding leaf cannot drop it.
        let group = self.group.insert(group);
        if let Err(AcquireFailure {
            error,
            rollback_failures,
        }) = self.stack.acquire_all(group, self.reporter.as_ref())
        {
            self.free_group();
            return Err(LifecycleError::DependencyInitFailed {
                subsystem: error.kind,
                source: error,
                rollback_failures,
            });
        }
        Ok(())
    }

    fn free_group(&mut self) {
        match self.group.take() {
            Some(group) => {
                debug!(
                    target: CONTROLLER_TARGET,
                    lock_group = group.name(),
                    "freeing lock group"
                );
                self.allocator.free(group);
            }
            None => warn!(
                target: CONTROLLER_TARGET,
                "module was loaded without a lock group"
            ),
        }
    }

    fn enter(&mut self, state: ModuleState) {
        self.state = state;
        let held = self.held_subsystems();
        self.status.update(|status| {
            status.state = state;
            status.held = held;
        });
    }
}

impl<A> ModuleController<A> {
    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ModuleState {
        self.state
    }

    /// Returns `true` while the module holds its lock group.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.group.is_some()
    }

    /// Held subsystems in activation order, lock group first.
    #[must_use]
    pub fn held_subsystems(&self) -> Vec<SubsystemKind> {
        self.group
            .iter()
            .map(|_| SubsystemKind::LockGroup)
            .chain(self.stack.held())
            .collect()
    }

    /// Copy of the current status.
    #[must_use]
    pub fn status(&self) -> ModuleStatus {
        self.status.snapshot()
    }

    /// Shared handle onto the status published through diagnostics.
    #[must_use]
    pub fn status_handle(&self) -> StatusHandle {
        self.status.clone()
    }

    /// Settings the controller was built with.
    #[must_use]
    pub const fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Lock group allocator.
    #[must_use]
    pub const fn allocator(&self) -> &A {
        &self.allocator
    }
}
