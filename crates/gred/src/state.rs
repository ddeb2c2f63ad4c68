//! Module state and the shared status snapshot read by diagnostics.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;

use crate::subsystem::SubsystemKind;

/// Lifecycle state of the module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleState {
    /// Nothing is held.
    #[default]
    Unloaded,
    /// An activation is running.
    Activating,
    /// The lock group is held. After a failed deactivation some subsystems
    /// may already be released.
    Loaded,
    /// A deactivation is running.
    Deactivating,
}

impl ModuleState {
    /// Returns `true` while an activation or deactivation is in flight.
    #[must_use]
    pub const fn is_transitional(self) -> bool {
        matches!(self, Self::Activating | Self::Deactivating)
    }
}

impl fmt::Display for ModuleState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unloaded => "unloaded",
            Self::Activating => "activating",
            Self::Loaded => "loaded",
            Self::Deactivating => "deactivating",
        };
        formatter.write_str(label)
    }
}

/// Point-in-time view of the module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModuleStatus {
    /// Current lifecycle state.
    pub state: ModuleState,
    /// Held subsystems in activation order, lock group first.
    pub held: Vec<SubsystemKind>,
    /// Name of the lock group the module allocates.
    pub lock_group: String,
    /// Completed activations since the controller was built.
    pub activations: u64,
    /// Completed deactivations since the controller was built.
    pub deactivations: u64,
}

/// Shared, read-mostly handle to the module status.
///
/// The controller is the only writer.
#[derive(Debug, Clone, Default)]
pub struct StatusHandle {
    inner: Arc<RwLock<ModuleStatus>>,
}

impl StatusHandle {
    /// Builds a handle seeded with an unloaded status for `lock_group`.
    #[must_use]
    pub fn new(lock_group: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ModuleStatus {
                lock_group: lock_group.into(),
                ..ModuleStatus::default()
            })),
        }
    }

    /// Copies the current status.
    #[must_use]
    pub fn snapshot(&self) -> ModuleStatus {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ModuleState {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .state
    }

    pub(crate) fn update(&self, apply: impl FnOnce(&mut ModuleStatus)) {
        let mut status = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        apply(&mut status);
    }
}
