//! Errors surfaced by module activation and deactivation.

use thiserror::Error;

use crate::state::ModuleState;
use crate::subsystem::{SubsystemError, SubsystemKind};

/// Failure of [`crate::ModuleController::activate`] or
/// [`crate::ModuleController::deactivate`].
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The lock group could not be allocated. Nothing else was touched.
    #[error("failed to allocate lock group '{group}'")]
    ResourceExhausted {
        /// Name of the group that could not be allocated.
        group: String,
    },
    /// A subsystem failed to initialise; everything acquired before it was
    /// rolled back.
    #[error("{subsystem} failed to initialise: {source}")]
    DependencyInitFailed {
        /// Subsystem whose acquisition failed.
        subsystem: SubsystemKind,
        /// Error reported by the subsystem.
        #[source]
        source: SubsystemError,
        /// Releases that failed while rolling back.
        rollback_failures: Vec<SubsystemError>,
    },
    /// A subsystem failed to release; the module is still loaded.
    #[error("{subsystem} failed to dispose: {source}")]
    DependencyDisposeFailed {
        /// First subsystem, in teardown order, whose release failed.
        subsystem: SubsystemKind,
        /// Error reported by that subsystem.
        #[source]
        source: SubsystemError,
        /// Later release failures collected by exhaustive teardown.
        further: Vec<SubsystemError>,
    },
    /// A previous activation or deactivation never completed.
    #[error("module is stuck {state}; a previous transition did not complete")]
    InterruptedTransition {
        /// State left behind by the interrupted call.
        state: ModuleState,
    },
}

impl LifecycleError {
    /// Subsystem named by the error, if any.
    #[must_use]
    pub fn subsystem(&self) -> Option<SubsystemKind> {
        match self {
            Self::ResourceExhausted { .. } => Some(SubsystemKind::LockGroup),
            Self::DependencyInitFailed { subsystem, .. }
            | Self::DependencyDisposeFailed { subsystem, .. } => Some(*subsystem),
            Self::InterruptedTransition { .. } => None,
        }
    }

    /// Every subsystem that reported a failure, in the order they failed.
    #[must_use]
    pub fn failed_subsystems(&self) -> Vec<SubsystemKind> {
        match self {
            Self::DependencyInitFailed {
                subsystem,
                rollback_failures,
                ..
            } => std::iter::once(*subsystem)
                .chain(rollback_failures.iter().map(|error| error.kind))
                .collect(),
            Self::DependencyDisposeFailed {
                subsystem, further, ..
            } => std::iter::once(*subsystem)
                .chain(further.iter().map(|error| error.kind))
                .collect(),
            Self::ResourceExhausted { .. } | Self::InterruptedTransition { .. } => {
                self.subsystem().into_iter().collect()
            }
        }
    }
}
