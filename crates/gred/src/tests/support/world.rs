//! BDD test world: recording host, controller and the last transition result.

use std::cell::RefCell;
use std::sync::Arc;

use gre_config::TeardownPolicy;

use crate::{
    ActivationOutcome, ControllerSettings, DeactivationOutcome, LifecycleError, LifecyclePhase,
    ModuleController, SubsystemKind,
};

use super::allocator::RecordingAllocator;
use super::reporter::RecordingLifecycleReporter;
use super::subsystems::RecordingHost;

/// Outcome of the most recent activation or deactivation.
#[derive(Debug)]
pub enum Transition {
    Activated(ActivationOutcome),
    Deactivated(DeactivationOutcome),
    Failed(LifecycleError),
}

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    pub host: RecordingHost,
    pub allocator: RecordingAllocator,
    pub reporter: Arc<RecordingLifecycleReporter>,
    policy: TeardownPolicy,
    controller: Option<ModuleController<RecordingAllocator>>,
    last: Option<Transition>,
}

impl TestWorld {
    #[must_use]
    pub fn new() -> Self {
        let host = RecordingHost::new();
        Self {
            allocator: host.allocator(),
            host,
            reporter: Arc::new(RecordingLifecycleReporter::default()),
            policy: TeardownPolicy::default(),
            controller: None,
            last: None,
        }
    }

    /// Selects the teardown policy for the controller built on first use.
    pub fn use_policy(&mut self, policy: TeardownPolicy) {
        self.policy = policy;
        self.controller = None;
    }

    pub fn fail_on(&self, kind: SubsystemKind, phase: LifecyclePhase) {
        self.host.faults.fail_on(kind, phase, "injected failure");
    }

    pub fn heal(&self, kind: SubsystemKind, phase: LifecyclePhase) {
        self.host.faults.heal(kind, phase);
    }

    pub fn activate(&mut self) {
        let result = self.controller().activate();
        self.last = Some(match result {
            Ok(outcome) => Transition::Activated(outcome),
            Err(error) => Transition::Failed(error),
        });
    }

    pub fn deactivate(&mut self) {
        let result = self.controller().deactivate();
        self.last = Some(match result {
            Ok(outcome) => Transition::Deactivated(outcome),
            Err(error) => Transition::Failed(error),
        });
    }

    #[must_use]
    pub fn last(&self) -> Option<&Transition> {
        self.last.as_ref()
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&LifecycleError> {
        match self.last.as_ref() {
            Some(Transition::Failed(error)) => Some(error),
            _ => None,
        }
    }

    /// Controller, built with the selected policy on first use.
    pub fn controller(&mut self) -> &mut ModuleController<RecordingAllocator> {
        let policy = self.policy;
        let host = &self.host;
        let allocator = &self.allocator;
        let reporter = &self.reporter;
        self.controller.get_or_insert_with(|| {
            ModuleController::new(
                ControllerSettings {
                    teardown_policy: policy,
                    ..ControllerSettings::default()
                },
                allocator.clone(),
                host.subsystems(),
                reporter.clone(),
            )
        })
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Default test world fixture.
#[must_use]
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
