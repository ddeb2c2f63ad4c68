//! Test double for [`LifecycleReporter`] that records events for assertions.

use std::sync::Mutex;

use crate::{
    LifecycleError, LifecyclePhase, LifecycleReporter, ModuleState, ModuleStatus, SubsystemError,
    SubsystemKind,
};

/// Lifecycle events tracked during a test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    ActivationStarting,
    ActivationSkipped(ModuleState),
    ActivationSucceeded,
    ActivationFailed(Option<SubsystemKind>),
    DeactivationStarting,
    DeactivationSkipped(ModuleState),
    DeactivationSucceeded,
    DeactivationFailed(Option<SubsystemKind>),
    Acquired(SubsystemKind),
    Released(SubsystemKind),
    SubsystemFailed {
        phase: LifecyclePhase,
        kind: SubsystemKind,
    },
}

/// Records lifecycle events for assertions.
#[derive(Debug, Default)]
pub struct RecordingLifecycleReporter {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingLifecycleReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events
            .lock()
            .expect("lifecycle reporter mutex poisoned")
            .clone()
    }

    /// Subsystem failures recorded in `phase`.
    #[must_use]
    pub fn failures_in(&self, phase: LifecyclePhase) -> Vec<SubsystemKind> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                LifecycleEvent::SubsystemFailed { phase: seen, kind } if seen == phase => {
                    Some(kind)
                }
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: LifecycleEvent) {
        self.events
            .lock()
            .expect("lifecycle reporter mutex poisoned")
            .push(event);
    }
}

impl LifecycleReporter for RecordingLifecycleReporter {
    fn activation_starting(&self) {
        self.record(LifecycleEvent::ActivationStarting);
    }

    fn activation_skipped(&self, state: ModuleState) {
        self.record(LifecycleEvent::ActivationSkipped(state));
    }

    fn activation_succeeded(&self, _status: &ModuleStatus) {
        self.record(LifecycleEvent::ActivationSucceeded);
    }

    fn activation_failed(&self, error: &LifecycleError) {
        self.record(LifecycleEvent::ActivationFailed(error.subsystem()));
    }

    fn deactivation_starting(&self) {
        self.record(LifecycleEvent::DeactivationStarting);
    }

    fn deactivation_skipped(&self, state: ModuleState) {
        self.record(LifecycleEvent::DeactivationSkipped(state));
    }

    fn deactivation_succeeded(&self, _status: &ModuleStatus) {
        self.record(LifecycleEvent::DeactivationSucceeded);
    }

    fn deactivation_failed(&self, error: &LifecycleError) {
        self.record(LifecycleEvent::DeactivationFailed(error.subsystem()));
    }

    fn subsystem_acquired(&self, kind: SubsystemKind) {
        self.record(LifecycleEvent::Acquired(kind));
    }

    fn subsystem_released(&self, kind: SubsystemKind) {
        self.record(LifecycleEvent::Released(kind));
    }

    fn subsystem_failed(&self, phase: LifecyclePhase, error: &SubsystemError) {
        self.record(LifecycleEvent::SubsystemFailed {
            phase,
            kind: error.kind,
        });
    }
}
