//! Structured reporting for module lifecycle events.

use std::fmt;
use std::sync::Arc;

use crate::error::LifecycleError;
use crate::state::{ModuleState, ModuleStatus};
use crate::subsystem::{SubsystemError, SubsystemKind};

/// Which half of a subsystem's contract was running when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    /// Activation acquiring the subsystem.
    Acquire,
    /// Activation unwinding after a later subsystem failed.
    Rollback,
    /// Deactivation releasing the subsystem.
    Release,
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Acquire => "acquire",
            Self::Rollback => "rollback",
            Self::Release => "release",
        };
        formatter.write_str(label)
    }
}

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait LifecycleReporter: Send + Sync {
    /// Invoked before activation touches any subsystem.
    fn activation_starting(&self);

    /// Invoked when activation is a no-op because of the current state.
    fn activation_skipped(&self, state: ModuleState);

    /// Invoked after activation completes successfully.
    fn activation_succeeded(&self, status: &ModuleStatus);

    /// Invoked when activation fails, after rollback has finished.
    fn activation_failed(&self, error: &LifecycleError);

    /// Invoked before deactivation touches any subsystem.
    fn deactivation_starting(&self);

    /// Invoked when deactivation is a no-op because of the current state.
    fn deactivation_skipped(&self, state: ModuleState);

    /// Invoked after deactivation completes successfully.
    fn deactivation_succeeded(&self, status: &ModuleStatus);

    /// Invoked when deactivation fails.
    fn deactivation_failed(&self, error: &LifecycleError);

    /// Invoked after a subsystem acquired its resources.
    fn subsystem_acquired(&self, kind: SubsystemKind);

    /// Invoked after a subsystem released its resources.
    fn subsystem_released(&self, kind: SubsystemKind);

    /// Invoked when a subsystem call fails.
    fn subsystem_failed(&self, phase: LifecyclePhase, error: &SubsystemError);
}

impl<T> LifecycleReporter for Arc<T>
where
    T: LifecycleReporter + ?Sized,
{
    fn activation_starting(&self) {
        (**self).activation_starting();
    }

    fn activation_skipped(&self, state: ModuleState) {
        (**self).activation_skipped(state);
    }

    fn activation_succeeded(&self, status: &ModuleStatus) {
        (**self).activation_succeeded(status);
    }

    fn activation_failed(&self, error: &LifecycleError) {
        (**self).activation_failed(error);
    }

    fn deactivation_starting(&self) {
        (**self).deactivation_starting();
    }

    fn deactivation_skipped(&self, state: ModuleState) {
        (**self).deactivation_skipped(state);
    }

    fn deactivation_succeeded(&self, status: &ModuleStatus) {
        (**self).deactivation_succeeded(status);
    }

    fn deactivation_failed(&self, error: &LifecycleError) {
        (**self).deactivation_failed(error);
    }

    fn subsystem_acquired(&self, kind: SubsystemKind) {
        (**self).subsystem_acquired(kind);
    }

    fn subsystem_released(&self, kind: SubsystemKind) {
        (**self).subsystem_released(kind);
    }

    fn subsystem_failed(&self, phase: LifecyclePhase, error: &SubsystemError) {
        (**self).subsystem_failed(phase, error);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredLifecycleReporter;

impl StructuredLifecycleReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl LifecycleReporter for StructuredLifecycleReporter {
    fn activation_starting(&self) {
        tracing::info!(
            target: "gred::health",
            event = "activation_starting",
            "activating module"
        );
    }

    fn activation_skipped(&self, state: ModuleState) {
        tracing::debug!(
            target: "gred::health",
            event = "activation_skipped",
            state = %state,
            "module already active"
        );
    }

    fn activation_succeeded(&self, status: &ModuleStatus) {
        tracing::info!(
            target: "gred::health",
            event = "activation_succeeded",
            lock_group = %status.lock_group,
            activations = status.activations,
            "module activated"
        );
    }

    fn activation_failed(&self, error: &LifecycleError) {
        tracing::error!(
            target: "gred::health",
            event = "activation_failed",
            subsystem = ?error.subsystem(),
            error = %error,
            "module activation failed"
        );
    }

    fn deactivation_starting(&self) {
        tracing::info!(
            target: "gred::health",
            event = "deactivation_starting",
            "deactivating module"
        );
    }

    fn deactivation_skipped(&self, state: ModuleState) {
        tracing::debug!(
            target: "gred::health",
            event = "deactivation_skipped",
            state = %state,
            "module already inactive"
        );
    }

    fn deactivation_succeeded(&self, status: &ModuleStatus) {
        tracing::info!(
            target: "gred::health",
            event = "deactivation_succeeded",
            deactivations = status.deactivations,
            "module deactivated"
        );
    }

    fn deactivation_failed(&self, error: &LifecycleError) {
        tracing::error!(
            target: "gred::health",
            event = "deactivation_failed",
            subsystem = ?error.subsystem(),
            error = %error,
            "module deactivation failed"
        );
    }

    fn subsystem_acquired(&self, kind: SubsystemKind) {
        tracing::debug!(
            target: "gred::health",
            event = "subsystem_acquired",
            subsystem = %kind,
            "subsystem up"
        );
    }

    fn subsystem_released(&self, kind: SubsystemKind) {
        tracing::debug!(
            target: "gred::health",
            event = "subsystem_released",
            subsystem = %kind,
            "subsystem down"
        );
    }

    fn subsystem_failed(&self, phase: LifecyclePhase, error: &SubsystemError) {
        tracing::warn!(
            target: "gred::health",
            event = "subsystem_failed",
            phase = %phase,
            subsystem = %error.kind,
            message = %error.message(),
            error = ?error,
            "subsystem call failed"
        );
    }
}
