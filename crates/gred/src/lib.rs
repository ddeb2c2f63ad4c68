//! Lifecycle controller for the GRE tunnelling module.
//!
//! Loading the module brings up six pieces of shared state in a fixed order:
//! the lock group, the IP protocol registration, the tunnel table, the
//! interface family, the packet filter hook and the diagnostics node.
//! [`ModuleController`] sequences them. Activation is all or nothing: when a
//! subsystem fails, everything acquired before it is released in reverse and
//! the module is left unloaded. Deactivation releases in the exact reverse
//! order and frees the lock group last, following the configured
//! [`TeardownPolicy`](gre_config::TeardownPolicy) when a release fails.
//!
//! Every subsystem sits behind the [`Subsystem`] trait. The [`host`] module
//! provides in-process implementations so the controller runs end to end in
//! the `gred` binary; tests substitute recording doubles.
//!
//! Lifecycle events are reported through [`LifecycleReporter`]; the default
//! [`StructuredLifecycleReporter`] writes them as `tracing` events.

mod acquisition;
mod bootstrap;
mod controller;
mod diagnostics;
pub mod entry;
mod error;
mod health;
pub mod host;
mod lock_group;
mod run;
mod state;
mod subsystem;
pub mod telemetry;

pub use acquisition::{AcquireFailure, AcquisitionStack, ReleaseFailure};
pub use bootstrap::{
    BootstrapError, ConfigLoader, HostView, Module, StaticConfigLoader, SystemConfigLoader,
    bootstrap_with,
};
pub use controller::{
    ActivationOutcome, ControllerSettings, DeactivationOutcome, ModuleController,
    ModuleSubsystems,
};
pub use diagnostics::{
    DiagnosticsNode, DiagnosticsRegistry, DiagnosticsStep, NODE_DESCRIPTION, NodeFlags,
    SysctlTree,
};
pub use entry::KernReturn;
pub use error::LifecycleError;
pub use health::{LifecyclePhase, LifecycleReporter, StructuredLifecycleReporter};
pub use lock_group::{
    GroupMutex, LockGroup, LockGroupAllocator, LockGroupAttributes, SystemLockGroupAllocator,
};
pub use run::{
    RunError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_module, run_module_with,
};
pub use state::{ModuleState, ModuleStatus, StatusHandle};
pub use subsystem::{Subsystem, SubsystemError, SubsystemKind, SubsystemKindParseError};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
